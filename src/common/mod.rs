//! 公共工具模块

/// 安全地截断 UTF-8 字符串，确保不会在多字节字符中间截断
///
/// 返回不超过 `max_bytes` 字节的最长有效 UTF-8 子串
pub fn truncate_str_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// 截断字符串并添加省略号后缀（用于日志和错误记录中的响应体）
pub fn truncate_with_ellipsis(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let truncate_at = if max_bytes > 3 { max_bytes - 3 } else { max_bytes };
    format!("{}...", truncate_str_safe(s, truncate_at))
}

/// 将逗号分隔的字符串拆分为去空白、非空的列表
///
/// `"a, b,,c "` -> `["a", "b", "c"]`
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

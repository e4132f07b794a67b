//! 分页拉取
//!
//! 从第 1 页开始依次请求，直到 `current_page >= total_page`

use serde_json::{Map, Value};

use super::client::ReportSource;
use super::error::ReportError;
use super::query::ReportQuery;
use super::types::ReportItem;

/// 单次查询允许的最大页数，防止上游分页信息异常导致死循环
const MAX_PAGES: u32 = 10_000;

/// 单次查询的拉取结果
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// 按页顺序排列的全部记录
    pub items: Vec<ReportItem>,
    /// 第一个携带汇总的页面返回的汇总对象
    pub totals: Option<Map<String, Value>>,
    /// 实际请求的页数
    pub pages: u32,
}

/// 拉取一个查询的全部分页
///
/// 汇总对象只取第一次出现的那一份，后续页面的汇总会被忽略。
/// 返回页码与请求页码不一致，或页数超过上限时返回分页错误。
pub async fn fetch_all<S>(source: &S, query: &ReportQuery) -> Result<FetchOutcome, ReportError>
where
    S: ReportSource,
{
    fetch_pages(source, query, MAX_PAGES).await
}

async fn fetch_pages<S>(
    source: &S,
    query: &ReportQuery,
    max_pages: u32,
) -> Result<FetchOutcome, ReportError>
where
    S: ReportSource,
{
    query.validate()?;

    let mut outcome = FetchOutcome::default();
    let mut page_no = query.page;
    loop {
        let page = source.fetch_page(&query.with_page(page_no)).await?;
        outcome.pages += 1;
        tracing::debug!(
            "advertiser={} {}~{} 第 {}/{} 页，{} 条记录",
            query.entity_id,
            query.start_date,
            query.end_date,
            page.current_page,
            page.total_pages,
            page.items.len()
        );

        if page.current_page != page_no {
            return Err(ReportError::Pagination {
                page: page_no,
                reason: format!("响应页码为 {}", page.current_page),
            });
        }

        let is_last = page.is_last();
        if outcome.totals.is_none() {
            outcome.totals = page.totals;
        }
        outcome.items.extend(page.items);

        if is_last {
            break;
        }
        if outcome.pages >= max_pages {
            return Err(ReportError::Pagination {
                page: page_no,
                reason: format!("已请求 {} 页，共 {} 页，超过上限", outcome.pages, page.total_pages),
            });
        }
        page_no += 1;
    }

    tracing::info!(
        "advertiser={} store={} {}~{} 拉取完成: {} 页, {} 条记录",
        query.entity_id,
        query.secondary_entity_id.as_deref().unwrap_or("-"),
        query.start_date,
        query.end_date,
        outcome.pages,
        outcome.items.len()
    );
    Ok(outcome)
}

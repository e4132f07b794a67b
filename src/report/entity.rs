//! 实体配对
//!
//! 单个次实体广播到所有主实体，或主/次实体按位置一一配对

use crate::model::ConfigError;

/// (主实体, 次实体) 组合
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPair {
    pub primary: String,
    pub secondary: Option<String>,
}

impl EntityPair {
    pub fn new(primary: impl Into<String>, secondary: Option<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary,
        }
    }
}

/// 根据配置的 ID 列表生成实体组合
///
/// - 次实体列表为空：每个主实体不带次实体
/// - 次实体只有一个：广播到所有主实体
/// - 长度相等：按位置配对
/// - 其他情况：配置错误
pub fn pair_entities(
    primary: &[String],
    secondary: &[String],
) -> Result<Vec<EntityPair>, ConfigError> {
    if primary.is_empty() {
        return Err(ConfigError::Missing("advertiserIds"));
    }

    let pairs = match secondary.len() {
        0 => primary
            .iter()
            .map(|p| EntityPair::new(p.clone(), None))
            .collect(),
        1 => primary
            .iter()
            .map(|p| EntityPair::new(p.clone(), Some(secondary[0].clone())))
            .collect(),
        n if n == primary.len() => primary
            .iter()
            .zip(secondary)
            .map(|(p, s)| EntityPair::new(p.clone(), Some(s.clone())))
            .collect(),
        n => {
            return Err(ConfigError::EntityMismatch {
                primary: primary.len(),
                secondary: n,
            });
        }
    };
    Ok(pairs)
}

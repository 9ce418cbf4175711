use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 社员 (socios)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// 新建社员请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPartner {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewPartner {
    /// 名称去空格并转大写, 空白的可选字段置为 None
    pub fn normalized(&self) -> Self {
        Self {
            name: normalize_partner_name(&self.name),
            phone: blank_to_none(&self.phone),
            email: blank_to_none(&self.email),
            address: blank_to_none(&self.address),
        }
    }
}

/// 社员名称唯一键: 去空格 + 大写
pub fn normalize_partner_name(name: &str) -> String {
    name.trim().to_uppercase()
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

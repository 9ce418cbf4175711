use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// 出栏原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitCause {
    #[serde(alias = "venta", alias = "ventas")]
    Sale,
    #[serde(alias = "muerte")]
    Death,
    #[serde(alias = "robo")]
    Theft,
}

impl ExitCause {
    pub const ALL: [ExitCause; 3] = [ExitCause::Sale, ExitCause::Death, ExitCause::Theft];

    /// 数据库中的取值
    pub fn as_db_str(&self) -> &'static str {
        match self {
            ExitCause::Sale => "venta",
            ExitCause::Death => "muerte",
            ExitCause::Theft => "robo",
        }
    }
}

impl fmt::Display for ExitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExitCause::Sale => "sale",
            ExitCause::Death => "death",
            ExitCause::Theft => "theft",
        };
        f.write_str(label)
    }
}

impl FromStr for ExitCause {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" | "venta" | "ventas" => Ok(ExitCause::Sale),
            "death" | "muerte" => Ok(ExitCause::Death),
            "theft" | "robo" => Ok(ExitCause::Theft),
            other => Err(LedgerError::InvalidInput(format!("unknown exit cause \"{}\"", other))),
        }
    }
}

/// 表单提交的原因分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCauseInput {
    pub cause: ExitCause,
    pub quantity: i32,
}

impl ExitCauseInput {
    pub fn new(cause: ExitCause, quantity: i32) -> Self {
        Self { cause, quantity }
    }
}

/// 出栏明细 (salidas_detalle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitCauseEntry {
    pub id: i64,
    pub record_id: i64,
    pub cause: ExitCause,
    pub quantity: i32,
    pub created_at: Option<DateTime<Utc>>,
}

/// 数据库行, causa 以文本存储
#[derive(Debug, Clone, FromRow)]
pub struct ExitCauseRow {
    pub id: i64,
    pub record_id: i64,
    pub cause: String,
    pub quantity: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<ExitCauseRow> for ExitCauseEntry {
    type Error = LedgerError;

    fn try_from(row: ExitCauseRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            record_id: row.record_id,
            cause: row.cause.parse()?,
            quantity: row.quantity,
            created_at: row.created_at,
        })
    }
}

/// 按原因汇总后的数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CauseTotal {
    pub cause: ExitCause,
    pub quantity: i64,
}

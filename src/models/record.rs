use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::date;
use crate::error::LedgerError;

/// 养殖台账记录 (registros_ganaderos)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub id: i64,
    pub partner_id: i64,
    pub date: NaiveDate,
    pub entries: i32,
    pub exits: i32,
    pub balance: i32,              // 派生: entries - exits
    pub total_weight: BigDecimal,  // 总公斤数
    pub price_per_kilo: BigDecimal,
    pub freight_cost: BigDecimal,  // 同社员同日记录分摊
    pub commission: BigDecimal,    // 仅保存, 不计入 total
    pub per_animal_value: BigDecimal, // 派生
    pub total: BigDecimal,         // 派生
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LedgerRecord {
    pub fn derived(&self) -> DerivedFields {
        DerivedFields {
            balance: self.balance,
            total: self.total.clone(),
            per_animal_value: self.per_animal_value.clone(),
        }
    }

    pub fn with_derived(mut self, derived: DerivedFields) -> Self {
        self.balance = derived.balance;
        self.total = derived.total;
        self.per_animal_value = derived.per_animal_value;
        self
    }
}

/// 派生字段, 每次加载都会重算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub balance: i32,
    pub total: BigDecimal,
    pub per_animal_value: BigDecimal,
}

/// 用户录入的原始字段 (新建与编辑共用)
#[derive(Debug, Clone, Deserialize)]
pub struct NewLedgerRecord {
    pub partner_id: i64,
    #[serde(deserialize_with = "date::deserialize")]
    pub date: NaiveDate,
    #[serde(default)]
    pub entries: i32,
    #[serde(default)]
    pub exits: i32,
    #[serde(default)]
    pub total_weight: BigDecimal,
    #[serde(default)]
    pub price_per_kilo: BigDecimal,
    #[serde(default)]
    pub freight_cost: BigDecimal,
    #[serde(default)]
    pub commission: BigDecimal,
}

/// 数量与金额均不得为负
fn check_non_negative(
    entries: i32,
    exits: i32,
    amounts: &[(&str, &BigDecimal)],
) -> Result<(), LedgerError> {
    if entries < 0 || exits < 0 {
        return Err(LedgerError::InvalidInput(format!(
            "entries ({}) and exits ({}) must be non-negative",
            entries, exits
        )));
    }

    for (field, value) in amounts {
        if *value < &BigDecimal::zero() {
            return Err(LedgerError::InvalidInput(format!(
                "{} must be non-negative, got {}",
                field, value
            )));
        }
    }

    Ok(())
}

impl NewLedgerRecord {
    pub fn validate(&self) -> Result<(), LedgerError> {
        check_non_negative(
            self.entries,
            self.exits,
            &[
                ("total_weight", &self.total_weight),
                ("price_per_kilo", &self.price_per_kilo),
                ("freight_cost", &self.freight_cost),
                ("commission", &self.commission),
            ],
        )
    }

    pub fn to_draft(&self) -> RecordDraft {
        RecordDraft {
            partner_id: Some(self.partner_id),
            date: Some(self.date),
            entries: self.entries,
            exits: self.exits,
            total_weight: self.total_weight.clone(),
            price_per_kilo: self.price_per_kilo.clone(),
            freight_cost: self.freight_cost.clone(),
        }
    }
}

/// 表单草稿: 提交前预览用, 社员与日期可能尚未填写
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordDraft {
    pub partner_id: Option<i64>,
    #[serde(deserialize_with = "date::deserialize_option")]
    pub date: Option<NaiveDate>,
    pub entries: i32,
    pub exits: i32,
    pub total_weight: BigDecimal,
    pub price_per_kilo: BigDecimal,
    pub freight_cost: BigDecimal,
}

impl RecordDraft {
    /// 与正式提交相同的非负校验
    pub fn validate(&self) -> Result<(), LedgerError> {
        check_non_negative(
            self.entries,
            self.exits,
            &[
                ("total_weight", &self.total_weight),
                ("price_per_kilo", &self.price_per_kilo),
                ("freight_cost", &self.freight_cost),
            ],
        )
    }
}

/// 预览结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Preview {
    pub total: BigDecimal,
    pub per_animal_value: BigDecimal,
    pub balance: i32,
    pub divisor: usize, // 运费分摊除数
}

/// 单条派生字段回写结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub record_id: i64,
    pub applied: bool,
    pub error: Option<String>,
}

impl UpdateOutcome {
    pub fn applied(record_id: i64) -> Self {
        Self {
            record_id,
            applied: true,
            error: None,
        }
    }

    pub fn failed(record_id: i64, error: &LedgerError) -> Self {
        Self {
            record_id,
            applied: false,
            error: Some(error.to_string()),
        }
    }
}

/// 旧表记录 (registros): 以社员名称而非 ID 关联
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub id: i64,
    pub partner_name: String,
    pub date: NaiveDate,
    pub entries: i32,
    pub exits: i32,
    pub total_weight: BigDecimal,
    pub price_per_kilo: BigDecimal,
    pub freight_cost: BigDecimal,
    pub commission: BigDecimal,
}

impl LegacyRecord {
    pub fn into_new_record(self, partner_id: i64) -> NewLedgerRecord {
        NewLedgerRecord {
            partner_id,
            date: self.date,
            entries: self.entries,
            exits: self.exits,
            total_weight: self.total_weight,
            price_per_kilo: self.price_per_kilo,
            freight_cost: self.freight_cost,
            commission: self.commission,
        }
    }
}

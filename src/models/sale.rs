use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{date, ExitCause};
use crate::error::LedgerError;

/// 销售/损失登记 (ventas)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: i64,
    pub partner_id: i64,
    pub record_id: Option<i64>,
    pub date: NaiveDate,
    pub quantity: i32,
    pub kind: ExitCause,
    pub price_per_kilo: BigDecimal,
    pub total_kilos: BigDecimal,
    pub total_value: BigDecimal, // price_per_kilo * total_kilos
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SaleRow {
    pub id: i64,
    pub partner_id: i64,
    pub record_id: Option<i64>,
    pub date: NaiveDate,
    pub quantity: i32,
    pub kind: String,
    pub price_per_kilo: BigDecimal,
    pub total_kilos: BigDecimal,
    pub total_value: BigDecimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<SaleRow> for Sale {
    type Error = LedgerError;

    fn try_from(row: SaleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            partner_id: row.partner_id,
            record_id: row.record_id,
            date: row.date,
            quantity: row.quantity,
            kind: row.kind.parse()?,
            price_per_kilo: row.price_per_kilo,
            total_kilos: row.total_kilos,
            total_value: row.total_value,
            created_at: row.created_at,
        })
    }
}

/// 新建销售请求
#[derive(Debug, Clone, Deserialize)]
pub struct NewSale {
    pub partner_id: i64,
    #[serde(default)]
    pub record_id: Option<i64>,
    #[serde(deserialize_with = "date::deserialize")]
    pub date: NaiveDate,
    pub quantity: i32,
    pub kind: ExitCause,
    #[serde(default)]
    pub price_per_kilo: BigDecimal,
    #[serde(default)]
    pub total_kilos: BigDecimal,
}

impl NewSale {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.quantity <= 0 {
            return Err(LedgerError::InvalidInput(format!(
                "sale quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.price_per_kilo < BigDecimal::zero() || self.total_kilos < BigDecimal::zero() {
            return Err(LedgerError::InvalidInput(
                "price per kilo and total kilos must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn total_value(&self) -> BigDecimal {
        &self.price_per_kilo * &self.total_kilos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn total_value_is_price_times_kilos() {
        let sale = NewSale {
            partner_id: 1,
            record_id: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            quantity: 4,
            kind: ExitCause::Sale,
            price_per_kilo: BigDecimal::from_str("7.25").unwrap(),
            total_kilos: BigDecimal::from(1200),
        };

        assert!(sale.validate().is_ok());
        assert_eq!(sale.total_value(), BigDecimal::from(8700));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let sale = NewSale {
            partner_id: 1,
            record_id: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            quantity: 0,
            kind: ExitCause::Death,
            price_per_kilo: BigDecimal::zero(),
            total_kilos: BigDecimal::zero(),
        };

        assert!(matches!(sale.validate(), Err(LedgerError::InvalidInput(_))));
    }
}

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use super::{ExitCauseInput, LedgerRecord, NewLedgerRecord, UpdateOutcome};

/// 仪表盘汇总
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerTotals {
    pub record_count: usize,
    pub total_entries: i64,
    pub total_exits: i64,
    pub herd_balance: i64,
    pub accumulated_total: BigDecimal,
}

impl LedgerTotals {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a LedgerRecord>,
    {
        let mut totals = Self {
            record_count: 0,
            total_entries: 0,
            total_exits: 0,
            herd_balance: 0,
            accumulated_total: BigDecimal::zero(),
        };
        for record in records {
            totals.record_count += 1;
            totals.total_entries += i64::from(record.entries);
            totals.total_exits += i64::from(record.exits);
            totals.herd_balance += i64::from(record.balance);
            totals.accumulated_total += record.total.clone();
        }
        totals
    }
}

/// 仪表盘: 重算后的全部记录 + 回写失败的记录
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub records: Vec<LedgerRecord>,
    pub totals: LedgerTotals,
    pub failed_updates: Vec<UpdateOutcome>,
}

/// 单个社员统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartnerSummary {
    pub partner_id: i64,
    pub partner_name: String,
    #[serde(flatten)]
    pub totals: LedgerTotals,
    pub sales_value: BigDecimal,
}

/// 新建记录请求: 原始字段 + 可选的出栏原因分配
#[derive(Debug, Clone, Deserialize)]
pub struct RecordSubmission {
    #[serde(flatten)]
    pub record: NewLedgerRecord,
    #[serde(default)]
    pub exit_causes: Vec<ExitCauseInput>,
}

/// 新建/编辑后的结果
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedRecord {
    pub record: LedgerRecord,
    pub outcomes: Vec<UpdateOutcome>,
}

/// 旧表导入报告
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub partners_created: Vec<String>,
}

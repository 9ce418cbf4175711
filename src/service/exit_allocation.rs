use indexmap::IndexMap;

use crate::error::LedgerError;
use crate::models::{CauseTotal, ExitCauseEntry, ExitCauseInput};

/// 校验出栏原因分配
///
/// 负数按 0 处理; 各原因数量之和必须等于出栏总数。
/// 成功时返回去掉 0 数量后的条目, 可直接持久化。
pub fn validate_allocation(
    entries: &[ExitCauseInput],
    total_exits: i32,
) -> Result<Vec<ExitCauseInput>, LedgerError> {
    let clamped: Vec<ExitCauseInput> = entries
        .iter()
        .map(|e| ExitCauseInput::new(e.cause, e.quantity.max(0)))
        .collect();

    let assigned: i64 = clamped.iter().map(|e| i64::from(e.quantity)).sum();
    let expected = i64::from(total_exits);
    if assigned != expected {
        return Err(LedgerError::AllocationMismatch { assigned, expected });
    }

    Ok(clamped.into_iter().filter(|e| e.quantity > 0).collect())
}

/// 已保存的出栏明细必须与 (修改后的) 出栏数一致; 没有明细时不做要求
pub fn check_recorded_causes(entries: &[ExitCauseEntry], exits: i32) -> Result<(), LedgerError> {
    if entries.is_empty() {
        return Ok(());
    }

    let assigned: i64 = entries.iter().map(|e| i64::from(e.quantity)).sum();
    let expected = i64::from(exits);
    if assigned != expected {
        return Err(LedgerError::AllocationMismatch { assigned, expected });
    }
    Ok(())
}

/// 按原因汇总出栏明细, 保持原因首次出现的顺序
pub fn group_by_cause(entries: &[ExitCauseEntry]) -> Vec<CauseTotal> {
    let mut grouped: IndexMap<_, i64> = IndexMap::new();
    for entry in entries {
        *grouped.entry(entry.cause).or_insert(0) += i64::from(entry.quantity);
    }

    grouped
        .into_iter()
        .map(|(cause, quantity)| CauseTotal { cause, quantity })
        .collect()
}

//! 运费分摊与派生字段重算
//!
//! 同一社员同一天的记录共同分摊运费:
//! `total = total_weight * price_per_kilo + freight_cost / n`,
//! 其中 n 为该 (社员, 日期) 组内的记录数 (包括自身)。
//! 每次加载、每次新建或编辑后都要对全部记录重算, 因为新记录会改变已有记录的除数。

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::models::{DerivedFields, LedgerRecord, Preview, RecordDraft};

/// 派生金额保留的小数位
pub const DERIVED_SCALE: i64 = 4;

/// 分组键: 社员 ID + 日历日期
type GroupKey = (i64, NaiveDate);

/// 统计快照中每个 (社员, 日期) 组的记录数
fn group_counts(records: &[LedgerRecord]) -> HashMap<GroupKey, usize> {
    let mut counts: HashMap<GroupKey, usize> = HashMap::with_capacity(records.len());
    for record in records {
        *counts.entry((record.partner_id, record.date)).or_insert(0) += 1;
    }
    counts
}

/// 按分摊规则计算派生字段
///
/// 重量或单价为 0 只会让第一项为 0, 运费项始终计入。
pub fn derive_fields(
    total_weight: &BigDecimal,
    price_per_kilo: &BigDecimal,
    freight_cost: &BigDecimal,
    entries: i32,
    exits: i32,
    divisor: usize,
) -> DerivedFields {
    let divisor = BigDecimal::from(divisor.max(1) as u64);
    let total = (total_weight * price_per_kilo + freight_cost / &divisor).round(DERIVED_SCALE);

    let per_animal_value = if entries > 0 {
        (&total / &BigDecimal::from(entries)).round(DERIVED_SCALE)
    } else {
        BigDecimal::zero()
    };

    DerivedFields {
        balance: entries - exits,
        total,
        per_animal_value,
    }
}

/// 对整个快照重算 balance / total / per_animal_value
///
/// 除数总是基于传入的快照计算, 不使用任何缓存值。输出顺序与输入一致, 其余字段原样保留。
pub fn recompute_all(records: &[LedgerRecord]) -> Vec<LedgerRecord> {
    let counts = group_counts(records);

    records
        .iter()
        .map(|record| {
            let n = counts
                .get(&(record.partner_id, record.date))
                .copied()
                .unwrap_or(1);
            let derived = derive_fields(
                &record.total_weight,
                &record.price_per_kilo,
                &record.freight_cost,
                record.entries,
                record.exits,
                n,
            );
            record.clone().with_derived(derived)
        })
        .collect()
}

/// 找出派生字段发生变化的记录, 用于回写
pub fn derived_updates(
    before: &[LedgerRecord],
    after: &[LedgerRecord],
) -> Vec<(i64, DerivedFields)> {
    before
        .iter()
        .zip(after)
        .filter_map(|(old, new)| {
            let derived = new.derived();
            if old.id == new.id && old.derived() == derived {
                None
            } else {
                Some((new.id, derived))
            }
        })
        .collect()
}

/// 提交前预览
///
/// 与 [`recompute_all`] 使用同一分组规则, 除数 = 已有同组记录数 + 1 (即将新建的这条)。
/// 社员或日期未填写时除数为 1。
pub fn preview_total(draft: &RecordDraft, existing: &[LedgerRecord]) -> Preview {
    let divisor = match (draft.partner_id, draft.date) {
        (Some(partner_id), Some(date)) => {
            existing
                .iter()
                .filter(|r| r.partner_id == partner_id && r.date == date)
                .count()
                + 1
        }
        _ => 1,
    };

    let derived = derive_fields(
        &draft.total_weight,
        &draft.price_per_kilo,
        &draft.freight_cost,
        draft.entries,
        draft.exits,
        divisor,
    );

    Preview {
        total: derived.total,
        per_animal_value: derived.per_animal_value,
        balance: derived.balance,
        divisor,
    }
}

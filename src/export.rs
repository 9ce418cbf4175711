use csv::Writer;
use std::collections::HashMap;
use std::io::Write;

use crate::error::LedgerError;
use crate::models::LedgerRecord;

const HEADER: [&str; 12] = [
    "id",
    "partner",
    "date",
    "entries",
    "exits",
    "balance",
    "total_weight",
    "price_per_kilo",
    "freight_cost",
    "commission",
    "per_animal_value",
    "total",
];

/// 导出台账记录到 CSV, 社员列写名称 (找不到时写 ID)
pub fn write_records_csv<W: Write>(
    writer: W,
    records: &[LedgerRecord],
    partner_names: &HashMap<i64, String>,
) -> Result<(), LedgerError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(HEADER)?;

    for record in records {
        let partner = partner_names
            .get(&record.partner_id)
            .cloned()
            .unwrap_or_else(|| record.partner_id.to_string());

        writer.write_record(&[
            record.id.to_string(),
            partner,
            record.date.format("%Y-%m-%d").to_string(),
            record.entries.to_string(),
            record.exits.to_string(),
            record.balance.to_string(),
            record.total_weight.to_string(),
            record.price_per_kilo.to_string(),
            record.freight_cost.to_string(),
            record.commission.to_string(),
            record.per_animal_value.to_string(),
            record.total.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

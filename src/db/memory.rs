use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use super::LedgerStore;
use crate::error::LedgerError;
use crate::models::{
    DerivedFields, ExitCauseEntry, ExitCauseInput, LedgerRecord, LegacyRecord, NewLedgerRecord,
    NewPartner, NewSale, Partner, Sale,
};

/// 内存存储, 供测试与本地运行使用
///
/// 排序与 PostgreSQL 实现保持一致: 记录按日期、ID 倒序, 社员按名称。
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    next_id: AtomicI64,
    records: DashMap<i64, LedgerRecord>,
    partners: DashMap<i64, Partner>,
    exit_causes: DashMap<i64, Vec<ExitCauseEntry>>,
    sales: DashMap<i64, Sale>,
    legacy: DashMap<i64, LegacyRecord>,
    legacy_links: DashMap<i64, i64>, // 旧表行 ID -> 记录 ID
    failing_updates: DashSet<i64>,
    failing_legacy_imports: DashSet<i64>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 预置旧表数据
    pub fn seed_legacy(&self, rows: impl IntoIterator<Item = LegacyRecord>) {
        for row in rows {
            self.legacy.insert(row.id, row);
        }
    }

    /// 令指定记录的派生字段回写失败, 用于模拟后端故障
    pub fn fail_derived_updates_for(&self, id: i64) {
        self.failing_updates.insert(id);
    }

    /// 令指定旧表行的导入写入失败
    pub fn fail_legacy_import_for(&self, legacy_id: i64) {
        self.failing_legacy_imports.insert(legacy_id);
    }

    pub fn clear_failures(&self) {
        self.failing_updates.clear();
        self.failing_legacy_imports.clear();
    }

    /// 停用社员 (保留其记录)
    pub fn deactivate_partner(&self, id: i64) {
        if let Some(mut partner) = self.partners.get_mut(&id) {
            partner.active = false;
        }
    }

    /// 直接读取存储中的记录, 不经过重算
    pub fn stored_record(&self, id: i64) -> Option<LedgerRecord> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    fn sorted_records(&self, filter: impl Fn(&LedgerRecord) -> bool) -> Vec<LedgerRecord> {
        let mut records: Vec<LedgerRecord> = self
            .records
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        records
    }

    fn insert_record(&self, record: &NewLedgerRecord, derived: &DerivedFields) -> LedgerRecord {
        let now = Utc::now();
        let stored = LedgerRecord {
            id: self.issue_id(),
            partner_id: record.partner_id,
            date: record.date,
            entries: record.entries,
            exits: record.exits,
            balance: derived.balance,
            total_weight: record.total_weight.clone(),
            price_per_kilo: record.price_per_kilo.clone(),
            freight_cost: record.freight_cost.clone(),
            commission: record.commission.clone(),
            per_animal_value: derived.per_animal_value.clone(),
            total: derived.total.clone(),
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.records.insert(stored.id, stored.clone());
        stored
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load_all_records(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        Ok(self.sorted_records(|_| true))
    }

    async fn load_records_by_partner(
        &self,
        partner_id: i64,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        Ok(self.sorted_records(|r| r.partner_id == partner_id))
    }

    async fn get_record(&self, id: i64) -> Result<Option<LedgerRecord>, LedgerError> {
        Ok(self.stored_record(id))
    }

    async fn create_record(
        &self,
        record: &NewLedgerRecord,
        derived: &DerivedFields,
    ) -> Result<LedgerRecord, LedgerError> {
        Ok(self.insert_record(record, derived))
    }

    async fn update_record(
        &self,
        id: i64,
        record: &NewLedgerRecord,
    ) -> Result<Option<LedgerRecord>, LedgerError> {
        let Some(mut stored) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        stored.partner_id = record.partner_id;
        stored.date = record.date;
        stored.entries = record.entries;
        stored.exits = record.exits;
        stored.total_weight = record.total_weight.clone();
        stored.price_per_kilo = record.price_per_kilo.clone();
        stored.freight_cost = record.freight_cost.clone();
        stored.commission = record.commission.clone();
        stored.updated_at = Some(Utc::now());
        Ok(Some(stored.clone()))
    }

    async fn update_record_derived_fields(
        &self,
        id: i64,
        derived: &DerivedFields,
    ) -> Result<(), LedgerError> {
        if self.failing_updates.contains(&id) {
            return Err(LedgerError::Store(format!(
                "derived update rejected for record {}",
                id
            )));
        }
        let Some(mut stored) = self.records.get_mut(&id) else {
            return Err(LedgerError::RecordNotFound(id));
        };
        stored.balance = derived.balance;
        stored.total = derived.total.clone();
        stored.per_animal_value = derived.per_animal_value.clone();
        stored.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn create_exit_cause_entries(
        &self,
        record_id: i64,
        entries: &[ExitCauseInput],
    ) -> Result<(), LedgerError> {
        let now = Utc::now();
        let created: Vec<ExitCauseEntry> = entries
            .iter()
            .map(|e| ExitCauseEntry {
                id: self.issue_id(),
                record_id,
                cause: e.cause,
                quantity: e.quantity,
                created_at: Some(now),
            })
            .collect();
        self.exit_causes.entry(record_id).or_default().extend(created);
        Ok(())
    }

    async fn load_exit_causes(&self, record_id: i64) -> Result<Vec<ExitCauseEntry>, LedgerError> {
        Ok(self
            .exit_causes
            .get(&record_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn list_active_partners(&self) -> Result<Vec<Partner>, LedgerError> {
        let mut partners: Vec<Partner> = self
            .partners
            .iter()
            .filter(|p| p.active)
            .map(|p| p.value().clone())
            .collect();
        partners.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(partners)
    }

    async fn get_partner(&self, id: i64) -> Result<Option<Partner>, LedgerError> {
        Ok(self.partners.get(&id).map(|p| p.value().clone()))
    }

    async fn find_partner_by_name(&self, name: &str) -> Result<Option<Partner>, LedgerError> {
        Ok(self
            .partners
            .iter()
            .find(|p| p.active && p.name == name)
            .map(|p| p.value().clone()))
    }

    async fn create_partner(&self, partner: &NewPartner) -> Result<Partner, LedgerError> {
        if self.partners.iter().any(|p| p.name == partner.name) {
            return Err(LedgerError::DuplicatePartner(partner.name.clone()));
        }
        let created = Partner {
            id: self.issue_id(),
            name: partner.name.clone(),
            phone: partner.phone.clone(),
            email: partner.email.clone(),
            address: partner.address.clone(),
            active: true,
            created_at: Some(Utc::now()),
        };
        self.partners.insert(created.id, created.clone());
        Ok(created)
    }

    async fn create_sale(&self, sale: &NewSale) -> Result<Sale, LedgerError> {
        let created = Sale {
            id: self.issue_id(),
            partner_id: sale.partner_id,
            record_id: sale.record_id,
            date: sale.date,
            quantity: sale.quantity,
            kind: sale.kind,
            price_per_kilo: sale.price_per_kilo.clone(),
            total_kilos: sale.total_kilos.clone(),
            total_value: sale.total_value(),
            created_at: Some(Utc::now()),
        };
        self.sales.insert(created.id, created.clone());
        Ok(created)
    }

    async fn load_sales_by_partner(&self, partner_id: i64) -> Result<Vec<Sale>, LedgerError> {
        let mut sales: Vec<Sale> = self
            .sales
            .iter()
            .filter(|s| s.partner_id == partner_id)
            .map(|s| s.value().clone())
            .collect();
        sales.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(sales)
    }

    async fn load_legacy_records(&self) -> Result<Vec<LegacyRecord>, LedgerError> {
        let mut rows: Vec<LegacyRecord> = self.legacy.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn create_legacy_record(
        &self,
        legacy_id: i64,
        record: &NewLedgerRecord,
        derived: &DerivedFields,
    ) -> Result<LedgerRecord, LedgerError> {
        if self.failing_legacy_imports.contains(&legacy_id) {
            return Err(LedgerError::Store(format!(
                "import rejected for legacy record {}",
                legacy_id
            )));
        }
        if self.legacy_links.contains_key(&legacy_id) {
            return Err(LedgerError::Store(format!(
                "legacy record {} already imported",
                legacy_id
            )));
        }

        let stored = self.insert_record(record, derived);
        self.legacy_links.insert(legacy_id, stored.id);
        Ok(stored)
    }

    async fn imported_legacy_ids(&self) -> Result<Vec<i64>, LedgerError> {
        Ok(self.legacy_links.iter().map(|l| *l.key()).collect())
    }
}

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::models::{
    DerivedFields, ExitCauseEntry, ExitCauseInput, LedgerRecord, LegacyRecord, NewLedgerRecord,
    NewPartner, NewSale, Partner, Sale,
};

/// 台账存储契约
///
/// 后端可替换: [`PgLedgerStore`](super::PgLedgerStore) 连接 PostgreSQL,
/// [`MemoryLedgerStore`](super::MemoryLedgerStore) 用于测试和本地运行。
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// 全量快照, 按日期倒序
    async fn load_all_records(&self) -> Result<Vec<LedgerRecord>, LedgerError>;

    async fn load_records_by_partner(
        &self,
        partner_id: i64,
    ) -> Result<Vec<LedgerRecord>, LedgerError>;

    async fn get_record(&self, id: i64) -> Result<Option<LedgerRecord>, LedgerError>;

    /// 新建记录, ID 由存储分配
    async fn create_record(
        &self,
        record: &NewLedgerRecord,
        derived: &DerivedFields,
    ) -> Result<LedgerRecord, LedgerError>;

    /// 覆盖原始字段, 记录不存在时返回 None
    async fn update_record(
        &self,
        id: i64,
        record: &NewLedgerRecord,
    ) -> Result<Option<LedgerRecord>, LedgerError>;

    async fn update_record_derived_fields(
        &self,
        id: i64,
        derived: &DerivedFields,
    ) -> Result<(), LedgerError>;

    async fn create_exit_cause_entries(
        &self,
        record_id: i64,
        entries: &[ExitCauseInput],
    ) -> Result<(), LedgerError>;

    async fn load_exit_causes(&self, record_id: i64) -> Result<Vec<ExitCauseEntry>, LedgerError>;

    /// 在用社员, 按名称排序
    async fn list_active_partners(&self) -> Result<Vec<Partner>, LedgerError>;

    async fn get_partner(&self, id: i64) -> Result<Option<Partner>, LedgerError>;

    /// 按规范化后的名称精确查找在用社员
    async fn find_partner_by_name(&self, name: &str) -> Result<Option<Partner>, LedgerError>;

    async fn create_partner(&self, partner: &NewPartner) -> Result<Partner, LedgerError>;

    async fn create_sale(&self, sale: &NewSale) -> Result<Sale, LedgerError>;

    async fn load_sales_by_partner(&self, partner_id: i64) -> Result<Vec<Sale>, LedgerError>;

    /// 旧表 (按社员名称关联) 的全部记录
    async fn load_legacy_records(&self) -> Result<Vec<LegacyRecord>, LedgerError>;

    /// 写入由旧表行转换而来的记录, 同一旧表行只能导入一次
    async fn create_legacy_record(
        &self,
        legacy_id: i64,
        record: &NewLedgerRecord,
        derived: &DerivedFields,
    ) -> Result<LedgerRecord, LedgerError>;

    /// 已导入的旧表行 ID
    async fn imported_legacy_ids(&self) -> Result<Vec<i64>, LedgerError>;
}

use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;

use super::{queries, LedgerStore};
use crate::error::LedgerError;
use crate::models::{
    DerivedFields, ExitCauseEntry, ExitCauseInput, LedgerRecord, LegacyRecord, NewLedgerRecord,
    NewPartner, NewSale, Partner, Sale,
};

/// PostgreSQL 存储
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// 为每次调用加超时控制
    async fn timed<T, F>(&self, op: &'static str, fut: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let start = std::time::Instant::now();
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => {
                tracing::debug!("{} ok, elapsed {:?}", op, start.elapsed());
                Ok(value)
            }
            Ok(Err(e)) => {
                tracing::error!("{} failed after {:?}: {:?}", op, start.elapsed(), e);
                Err(LedgerError::Database(e))
            }
            Err(_) => {
                tracing::error!("{} timed out (>{:?})", op, self.timeout);
                Err(LedgerError::Timeout(op))
            }
        }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn load_all_records(&self) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.timed("load_all_records", queries::list_records(&self.pool)).await
    }

    async fn load_records_by_partner(
        &self,
        partner_id: i64,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.timed(
            "load_records_by_partner",
            queries::list_records_by_partner(&self.pool, partner_id),
        )
        .await
    }

    async fn get_record(&self, id: i64) -> Result<Option<LedgerRecord>, LedgerError> {
        self.timed("get_record", queries::get_record(&self.pool, id)).await
    }

    async fn create_record(
        &self,
        record: &NewLedgerRecord,
        derived: &DerivedFields,
    ) -> Result<LedgerRecord, LedgerError> {
        self.timed(
            "create_record",
            queries::insert_record(&self.pool, record, derived, None),
        )
        .await
    }

    async fn update_record(
        &self,
        id: i64,
        record: &NewLedgerRecord,
    ) -> Result<Option<LedgerRecord>, LedgerError> {
        self.timed("update_record", queries::update_record(&self.pool, id, record))
            .await
    }

    async fn update_record_derived_fields(
        &self,
        id: i64,
        derived: &DerivedFields,
    ) -> Result<(), LedgerError> {
        let affected = self
            .timed(
                "update_record_derived_fields",
                queries::update_derived_fields(&self.pool, id, derived),
            )
            .await?;
        if affected == 0 {
            return Err(LedgerError::RecordNotFound(id));
        }
        Ok(())
    }

    async fn create_exit_cause_entries(
        &self,
        record_id: i64,
        entries: &[ExitCauseInput],
    ) -> Result<(), LedgerError> {
        self.timed(
            "create_exit_cause_entries",
            queries::insert_exit_causes(&self.pool, record_id, entries),
        )
        .await
    }

    async fn load_exit_causes(&self, record_id: i64) -> Result<Vec<ExitCauseEntry>, LedgerError> {
        let rows = self
            .timed("load_exit_causes", queries::list_exit_causes(&self.pool, record_id))
            .await?;
        rows.into_iter().map(ExitCauseEntry::try_from).collect()
    }

    async fn list_active_partners(&self) -> Result<Vec<Partner>, LedgerError> {
        self.timed("list_active_partners", queries::list_active_partners(&self.pool))
            .await
    }

    async fn get_partner(&self, id: i64) -> Result<Option<Partner>, LedgerError> {
        self.timed("get_partner", queries::get_partner(&self.pool, id)).await
    }

    async fn find_partner_by_name(&self, name: &str) -> Result<Option<Partner>, LedgerError> {
        self.timed("find_partner_by_name", queries::find_partner_by_name(&self.pool, name))
            .await
    }

    async fn create_partner(&self, partner: &NewPartner) -> Result<Partner, LedgerError> {
        match self
            .timed("create_partner", queries::insert_partner(&self.pool, partner))
            .await
        {
            Err(LedgerError::Database(sqlx::Error::Database(ref db_err)))
                if db_err.is_unique_violation() =>
            {
                Err(LedgerError::DuplicatePartner(partner.name.clone()))
            }
            other => other,
        }
    }

    async fn create_sale(&self, sale: &NewSale) -> Result<Sale, LedgerError> {
        let row = self
            .timed("create_sale", queries::insert_sale(&self.pool, sale))
            .await?;
        Sale::try_from(row)
    }

    async fn load_sales_by_partner(&self, partner_id: i64) -> Result<Vec<Sale>, LedgerError> {
        let rows = self
            .timed(
                "load_sales_by_partner",
                queries::list_sales_by_partner(&self.pool, partner_id),
            )
            .await?;
        rows.into_iter().map(Sale::try_from).collect()
    }

    async fn load_legacy_records(&self) -> Result<Vec<LegacyRecord>, LedgerError> {
        self.timed("load_legacy_records", queries::list_legacy_records(&self.pool))
            .await
    }

    async fn create_legacy_record(
        &self,
        legacy_id: i64,
        record: &NewLedgerRecord,
        derived: &DerivedFields,
    ) -> Result<LedgerRecord, LedgerError> {
        self.timed(
            "create_legacy_record",
            queries::insert_record(&self.pool, record, derived, Some(legacy_id)),
        )
        .await
    }

    async fn imported_legacy_ids(&self) -> Result<Vec<i64>, LedgerError> {
        self.timed(
            "imported_legacy_ids",
            queries::list_imported_legacy_ids(&self.pool),
        )
        .await
    }
}

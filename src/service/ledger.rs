use bigdecimal::{BigDecimal, Zero};
use futures::future::join_all;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::exit_allocation::{check_recorded_causes, group_by_cause, validate_allocation};
use super::recompute::{derived_updates, preview_total, recompute_all};
use crate::db::LedgerStore;
use crate::error::LedgerError;
use crate::export::write_records_csv;
use crate::models::{
    normalize_partner_name, CauseTotal, Dashboard, DerivedFields, ExitCause, ExitCauseInput,
    ImportReport,
    LedgerRecord, LedgerTotals, NewLedgerRecord, NewPartner, NewSale, Partner, PartnerSummary,
    Preview, RecordDraft, RecordSubmission, Sale, SubmittedRecord, UpdateOutcome,
};

/// 台账服务: 串联存储与重算引擎
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// 加载全部记录并重算, 变化的派生字段批量回写
    pub async fn load_dashboard(&self) -> Result<Dashboard, LedgerError> {
        let (records, outcomes) = self.recompute_and_apply().await?;
        let totals = LedgerTotals::from_records(&records);
        let failed_updates = outcomes.into_iter().filter(|o| !o.applied).collect();

        Ok(Dashboard {
            records,
            totals,
            failed_updates,
        })
    }

    /// 全量重算 + 回写
    async fn recompute_and_apply(
        &self,
    ) -> Result<(Vec<LedgerRecord>, Vec<UpdateOutcome>), LedgerError> {
        let snapshot = self.store.load_all_records().await?;
        let recomputed = recompute_all(&snapshot);
        let updates = derived_updates(&snapshot, &recomputed);

        tracing::info!(
            "Recomputed {} records, {} derived updates pending",
            recomputed.len(),
            updates.len()
        );

        let outcomes = self.apply_derived_updates(updates).await;
        Ok((recomputed, outcomes))
    }

    /// 批量回写派生字段
    ///
    /// 各条请求相互独立、无顺序保证; 单条失败只记录日志, 不影响其他记录,
    /// 下次全量加载时会再次重算。
    pub async fn apply_derived_updates(
        &self,
        updates: Vec<(i64, DerivedFields)>,
    ) -> Vec<UpdateOutcome> {
        let requests = updates.iter().map(|(id, derived)| async move {
            match self.store.update_record_derived_fields(*id, derived).await {
                Ok(()) => UpdateOutcome::applied(*id),
                Err(e) => {
                    tracing::warn!("Derived update for record {} failed: {}", id, e);
                    UpdateOutcome::failed(*id, &e)
                }
            }
        });

        join_all(requests).await
    }

    /// 提交前预览总额与运费除数
    pub async fn preview(&self, draft: &RecordDraft) -> Result<Preview, LedgerError> {
        draft.validate()?;
        let existing = match draft.partner_id {
            Some(partner_id) => self.store.load_records_by_partner(partner_id).await?,
            None => Vec::new(),
        };
        Ok(preview_total(draft, &existing))
    }

    /// 新建记录
    ///
    /// 出栏原因在任何写入之前校验; 写入后对全部记录重算, 同组旧记录的除数随之变化。
    pub async fn submit_record(
        &self,
        submission: RecordSubmission,
    ) -> Result<SubmittedRecord, LedgerError> {
        let RecordSubmission { record, exit_causes } = submission;
        record.validate()?;
        self.require_partner(record.partner_id).await?;

        // 1. 出栏原因校验 (无存储交互)
        let causes = if exit_causes.is_empty() {
            Vec::new()
        } else {
            validate_allocation(&exit_causes, record.exits)?
        };

        // 2. 以预览值写入
        let group = self.store.load_records_by_partner(record.partner_id).await?;
        let preview = preview_total(&record.to_draft(), &group);
        let derived = DerivedFields {
            balance: preview.balance,
            total: preview.total,
            per_animal_value: preview.per_animal_value,
        };
        let created = self.store.create_record(&record, &derived).await?;
        tracing::info!(
            "Record {} created for partner {} on {} (freight divisor {})",
            created.id,
            created.partner_id,
            created.date,
            preview.divisor
        );

        // 3. 出栏明细
        if !causes.is_empty() {
            self.store.create_exit_cause_entries(created.id, &causes).await?;
        }

        // 4. 全量重算
        self.finish_with_recompute(created).await
    }

    /// 编辑原始字段后全量重算
    ///
    /// 已有出栏明细时, 新的出栏数必须与明细之和一致。
    pub async fn edit_record(
        &self,
        id: i64,
        record: NewLedgerRecord,
    ) -> Result<SubmittedRecord, LedgerError> {
        record.validate()?;
        self.require_partner(record.partner_id).await?;

        let saved_causes = self.store.load_exit_causes(id).await?;
        check_recorded_causes(&saved_causes, record.exits)?;

        let updated = self
            .store
            .update_record(id, &record)
            .await?
            .ok_or(LedgerError::RecordNotFound(id))?;
        tracing::info!("Record {} updated", id);

        self.finish_with_recompute(updated).await
    }

    async fn finish_with_recompute(
        &self,
        record: LedgerRecord,
    ) -> Result<SubmittedRecord, LedgerError> {
        let id = record.id;
        let (records, outcomes) = self.recompute_and_apply().await?;
        let record = records.into_iter().find(|r| r.id == id).unwrap_or(record);

        Ok(SubmittedRecord { record, outcomes })
    }

    async fn require_partner(&self, partner_id: i64) -> Result<Partner, LedgerError> {
        self.store
            .get_partner(partner_id)
            .await?
            .ok_or(LedgerError::PartnerNotFound(partner_id))
    }

    /// 登记社员: 名称去空格转大写, 不允许重名
    pub async fn register_partner(&self, partner: NewPartner) -> Result<Partner, LedgerError> {
        let partner = partner.normalized();
        if partner.name.is_empty() {
            return Err(LedgerError::InvalidInput("partner name is required".to_string()));
        }
        if self.store.find_partner_by_name(&partner.name).await?.is_some() {
            return Err(LedgerError::DuplicatePartner(partner.name));
        }

        let created = self.store.create_partner(&partner).await?;
        tracing::info!("Partner {} registered as {}", created.name, created.id);
        Ok(created)
    }

    pub async fn list_partners(&self) -> Result<Vec<Partner>, LedgerError> {
        self.store.list_active_partners().await
    }

    /// 某社员的记录 (已重算, 不回写)
    ///
    /// 分组键包含社员, 所以只用该社员的记录即可得到与全量重算相同的结果。
    pub async fn partner_records(
        &self,
        partner_id: i64,
    ) -> Result<Vec<LedgerRecord>, LedgerError> {
        self.require_partner(partner_id).await?;
        let records = self.store.load_records_by_partner(partner_id).await?;
        Ok(recompute_all(&records))
    }

    /// 社员统计: 记录数、入栏、出栏、存栏、累计金额、销售额
    pub async fn partner_summary(&self, partner_id: i64) -> Result<PartnerSummary, LedgerError> {
        let partner = self.require_partner(partner_id).await?;
        let records = recompute_all(&self.store.load_records_by_partner(partner_id).await?);
        let sales = self.store.load_sales_by_partner(partner_id).await?;

        let sales_value = sales
            .iter()
            .filter(|s| s.kind == ExitCause::Sale)
            .fold(BigDecimal::zero(), |acc, s| acc + &s.total_value);

        Ok(PartnerSummary {
            partner_id,
            partner_name: partner.name,
            totals: LedgerTotals::from_records(&records),
            sales_value,
        })
    }

    /// 出栏明细, 按原因汇总
    pub async fn exit_details(&self, record_id: i64) -> Result<Vec<CauseTotal>, LedgerError> {
        if self.store.get_record(record_id).await?.is_none() {
            return Err(LedgerError::RecordNotFound(record_id));
        }
        let entries = self.store.load_exit_causes(record_id).await?;
        Ok(group_by_cause(&entries))
    }

    /// 为已保存的记录补登出栏原因
    ///
    /// 每条记录只登记一次; 分配之和必须等于记录的出栏数。
    pub async fn attach_exit_causes(
        &self,
        record_id: i64,
        causes: Vec<ExitCauseInput>,
    ) -> Result<Vec<CauseTotal>, LedgerError> {
        let record = self
            .store
            .get_record(record_id)
            .await?
            .ok_or(LedgerError::RecordNotFound(record_id))?;

        if !self.store.load_exit_causes(record_id).await?.is_empty() {
            return Err(LedgerError::InvalidInput(format!(
                "record {} already has exit causes",
                record_id
            )));
        }

        let kept = validate_allocation(&causes, record.exits)?;
        if !kept.is_empty() {
            self.store.create_exit_cause_entries(record_id, &kept).await?;
        }
        tracing::info!(
            "Attached {} exit causes to record {} ({} exits)",
            kept.len(),
            record_id,
            record.exits
        );

        let entries = self.store.load_exit_causes(record_id).await?;
        Ok(group_by_cause(&entries))
    }

    /// 登记销售/死亡/被盗
    pub async fn record_sale(&self, sale: NewSale) -> Result<Sale, LedgerError> {
        sale.validate()?;
        self.require_partner(sale.partner_id).await?;
        if let Some(record_id) = sale.record_id {
            if self.store.get_record(record_id).await?.is_none() {
                return Err(LedgerError::RecordNotFound(record_id));
            }
        }

        let created = self.store.create_sale(&sale).await?;
        tracing::info!(
            "Sale {} recorded for partner {}: {} x {} = {}",
            created.id,
            created.partner_id,
            created.total_kilos,
            created.price_per_kilo,
            created.total_value
        );
        Ok(created)
    }

    /// 旧表导入
    ///
    /// 已导入的旧表行会被跳过, 中途失败后重新执行即可续导。
    /// 按名称查找或新建社员, 逐条写入后做一次全量重算。
    pub async fn import_legacy(&self) -> Result<ImportReport, LedgerError> {
        let imported_ids: HashSet<i64> =
            self.store.imported_legacy_ids().await?.into_iter().collect();
        let rows: Vec<_> = self
            .store
            .load_legacy_records()
            .await?
            .into_iter()
            .filter(|row| !imported_ids.contains(&row.id))
            .collect();
        tracing::info!(
            "Importing {} legacy records ({} already imported)",
            rows.len(),
            imported_ids.len()
        );

        let mut partner_ids: HashMap<String, i64> = HashMap::new();
        let mut created_partners: IndexSet<String> = IndexSet::new();
        let mut imported = 0;

        for row in rows {
            let name = normalize_partner_name(&row.partner_name);
            if name.is_empty() {
                tracing::warn!("Legacy record {} has no partner name, skipping", row.id);
                continue;
            }

            let partner_id = match partner_ids.get(&name) {
                Some(id) => *id,
                None => {
                    let id = match self.store.find_partner_by_name(&name).await? {
                        Some(existing) => existing.id,
                        None => {
                            let created = self
                                .store
                                .create_partner(&NewPartner {
                                    name: name.clone(),
                                    ..NewPartner::default()
                                })
                                .await?;
                            created_partners.insert(name.clone());
                            created.id
                        }
                    };
                    partner_ids.insert(name, id);
                    id
                }
            };

            let legacy_id = row.id;
            let record = row.into_new_record(partner_id);
            if let Err(e) = record.validate() {
                tracing::warn!("Legacy record {} rejected: {}", legacy_id, e);
                continue;
            }

            // 派生字段由导入后的全量重算填充
            let placeholder = DerivedFields {
                balance: record.entries - record.exits,
                total: BigDecimal::zero(),
                per_animal_value: BigDecimal::zero(),
            };
            self.store
                .create_legacy_record(legacy_id, &record, &placeholder)
                .await?;
            imported += 1;
        }

        let (_, outcomes) = self.recompute_and_apply().await?;
        let failed = outcomes.iter().filter(|o| !o.applied).count();
        tracing::info!(
            "Legacy import done: {} records, {} partners created, {} derived updates failed",
            imported,
            created_partners.len(),
            failed
        );

        Ok(ImportReport {
            imported,
            partners_created: created_partners.into_iter().collect(),
        })
    }

    /// 导出重算后的全部记录为 CSV
    ///
    /// 社员名称按记录逐个解析, 已停用的社员同样导出名称。
    pub async fn export_csv(&self) -> Result<Vec<u8>, LedgerError> {
        let records = recompute_all(&self.store.load_all_records().await?);
        let partner_ids: IndexSet<i64> = records.iter().map(|r| r.partner_id).collect();

        let lookups = partner_ids.iter().map(|id| self.store.get_partner(*id));
        let mut partner_names: HashMap<i64, String> = HashMap::new();
        for partner in join_all(lookups).await {
            if let Some(partner) = partner? {
                partner_names.insert(partner.id, partner.name);
            }
        }

        let mut out = Vec::new();
        write_records_csv(&mut out, &records, &partner_names)?;
        Ok(out)
    }
}

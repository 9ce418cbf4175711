use crate::error::LedgerError;
use crate::models::{
    CauseTotal, Dashboard, ExitCauseInput, ImportReport, LedgerRecord, NewLedgerRecord,
    NewPartner, NewSale, Partner, PartnerSummary, Preview, RecordDraft, RecordSubmission, Sale,
    SubmittedRecord,
};
use crate::service::LedgerService;
use axum::{
    extract::{Json, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

/// 统一响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, LedgerError>;

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = match &self {
            LedgerError::AllocationMismatch { .. } | LedgerError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            LedgerError::PartnerNotFound(_) | LedgerError::RecordNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            LedgerError::DuplicatePartner(_) => StatusCode::CONFLICT,
            LedgerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let response = ApiResponse::<()> {
            success: false,
            message: format!("Error: {}", self),
            data: None,
        };
        (status, Json(response)).into_response()
    }
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 仪表盘: 全量重算后的记录与汇总
pub async fn dashboard(State(service): State<Arc<LedgerService>>) -> ApiResult<Dashboard> {
    let dashboard = service.load_dashboard().await?;
    let message = format!(
        "Loaded {} records, {} derived updates failed",
        dashboard.records.len(),
        dashboard.failed_updates.len()
    );
    Ok(ApiResponse::ok(message, dashboard))
}

/// 提交前预览
pub async fn preview(
    State(service): State<Arc<LedgerService>>,
    Json(draft): Json<RecordDraft>,
) -> ApiResult<Preview> {
    let preview = service.preview(&draft).await?;
    Ok(ApiResponse::ok(
        format!("Freight divided by {}", preview.divisor),
        preview,
    ))
}

/// 新建记录 (可附带出栏原因)
pub async fn submit_record(
    State(service): State<Arc<LedgerService>>,
    Json(submission): Json<RecordSubmission>,
) -> Result<(StatusCode, Json<ApiResponse<SubmittedRecord>>), LedgerError> {
    let submitted = service.submit_record(submission).await?;
    let message = format!("Record {} saved", submitted.record.id);
    Ok((StatusCode::CREATED, ApiResponse::ok(message, submitted)))
}

/// 编辑原始字段
pub async fn edit_record(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<i64>,
    Json(record): Json<NewLedgerRecord>,
) -> ApiResult<SubmittedRecord> {
    let submitted = service.edit_record(id, record).await?;
    Ok(ApiResponse::ok(format!("Record {} updated", id), submitted))
}

/// 出栏明细
pub async fn exit_details(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<CauseTotal>> {
    let details = service.exit_details(id).await?;
    Ok(ApiResponse::ok(format!("{} exit causes", details.len()), details))
}

/// 补登出栏原因
pub async fn attach_exit_causes(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<i64>,
    Json(causes): Json<Vec<ExitCauseInput>>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<CauseTotal>>>), LedgerError> {
    let details = service.attach_exit_causes(id, causes).await?;
    let message = format!("Exit causes saved for record {}", id);
    Ok((StatusCode::CREATED, ApiResponse::ok(message, details)))
}

/// 导出 CSV
pub async fn export_records(
    State(service): State<Arc<LedgerService>>,
) -> Result<Response, LedgerError> {
    let body = service.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"registros.csv\""),
        ],
        body,
    )
        .into_response())
}

pub async fn list_partners(State(service): State<Arc<LedgerService>>) -> ApiResult<Vec<Partner>> {
    let partners = service.list_partners().await?;
    Ok(ApiResponse::ok(format!("{} partners", partners.len()), partners))
}

pub async fn register_partner(
    State(service): State<Arc<LedgerService>>,
    Json(partner): Json<NewPartner>,
) -> Result<(StatusCode, Json<ApiResponse<Partner>>), LedgerError> {
    let partner = service.register_partner(partner).await?;
    let message = format!("Partner {} created", partner.name);
    Ok((StatusCode::CREATED, ApiResponse::ok(message, partner)))
}

pub async fn partner_records(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<LedgerRecord>> {
    let records = service.partner_records(id).await?;
    Ok(ApiResponse::ok(format!("{} records", records.len()), records))
}

pub async fn partner_summary(
    State(service): State<Arc<LedgerService>>,
    Path(id): Path<i64>,
) -> ApiResult<PartnerSummary> {
    let summary = service.partner_summary(id).await?;
    Ok(ApiResponse::ok(format!("Summary for {}", summary.partner_name), summary))
}

pub async fn record_sale(
    State(service): State<Arc<LedgerService>>,
    Json(sale): Json<NewSale>,
) -> Result<(StatusCode, Json<ApiResponse<Sale>>), LedgerError> {
    let sale = service.record_sale(sale).await?;
    let message = format!("Sale {} recorded", sale.id);
    Ok((StatusCode::CREATED, ApiResponse::ok(message, sale)))
}

/// 旧表一次性导入
pub async fn import_legacy(State(service): State<Arc<LedgerService>>) -> ApiResult<ImportReport> {
    let report = service.import_legacy().await?;
    let message = format!(
        "Imported {} legacy records, {} partners created",
        report.imported,
        report.partners_created.len()
    );
    Ok(ApiResponse::ok(message, report))
}

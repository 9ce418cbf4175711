pub mod handlers;

pub use handlers::*;

use crate::service::LedgerService;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// 构建路由
pub fn router(service: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/dashboard", get(dashboard))
        .route("/api/records", post(submit_record))
        .route("/api/records/export", get(export_records))
        .route("/api/records/preview", post(preview))
        .route("/api/records/:id", put(edit_record))
        .route(
            "/api/records/:id/exits",
            get(exit_details).post(attach_exit_causes),
        )
        .route("/api/partners", get(list_partners).post(register_partner))
        .route("/api/partners/:id/records", get(partner_records))
        .route("/api/partners/:id/summary", get(partner_summary))
        .route("/api/sales", post(record_sale))
        .route("/api/legacy/import", post(import_legacy))
        .with_state(service)
}

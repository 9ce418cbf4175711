use thiserror::Error;

/// 账本服务统一错误
#[derive(Debug, Error)]
pub enum LedgerError {
    /// 出栏原因数量之和与出栏数不一致
    #[error("assigned exits ({assigned}) must equal total exits ({expected})")]
    AllocationMismatch { assigned: i64, expected: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Partner {0} not found")]
    PartnerNotFound(i64),

    #[error("Record {0} not found")]
    RecordNotFound(i64),

    #[error("Partner \"{0}\" already exists")]
    DuplicatePartner(String),

    /// 存储调用超时
    #[error("Store operation timed out: {0}")]
    Timeout(&'static str),

    /// 非 SQL 后端的存储失败
    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

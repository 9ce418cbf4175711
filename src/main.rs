use ganado_ledger::{api, create_pool, db, AppConfig, LedgerService, PgLedgerStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    if config.ledger.run_migrations {
        db::run_migrations(&pool).await?;
    }

    let store = PgLedgerStore::new(pool, config.ledger.store_timeout());
    let service = Arc::new(LedgerService::new(Arc::new(store)));

    let app = api::router(service);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/dashboard            - recomputed ledger");
    info!("  POST /api/records/preview      - freight divisor preview");
    info!("  POST /api/records              - submit record");
    info!("  POST /api/records/:id/exits    - attach exit causes");
    info!("  POST /api/legacy/import        - one-time legacy import");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

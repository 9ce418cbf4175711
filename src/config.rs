use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub slow_statement_secs: u64, // 慢查询日志阈值
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// 单次存储调用超时
    pub store_timeout_secs: u64,
    /// 启动时执行迁移
    pub run_migrations: bool,
}

impl LedgerConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/ganado";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
                slow_statement_secs: 5,
            },
            ledger: LedgerConfig {
                store_timeout_secs: 30,
                run_migrations: true,
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> ganado.toml (可选) -> GANADO__* 环境变量 -> DATABASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("ganado")
    }

    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let mut builder = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )?
            .set_default(
                "database.acquire_timeout_secs",
                defaults.database.acquire_timeout_secs as i64,
            )?
            .set_default(
                "database.slow_statement_secs",
                defaults.database.slow_statement_secs as i64,
            )?
            .set_default(
                "ledger.store_timeout_secs",
                defaults.ledger.store_timeout_secs as i64,
            )?
            .set_default("ledger.run_migrations", defaults.ledger.run_migrations)?
            .add_source(File::with_name(file_stem).required(false))
            .add_source(
                Environment::with_prefix("GANADO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        builder.build()?.try_deserialize()
    }
}

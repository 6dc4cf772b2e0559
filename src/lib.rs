pub mod api;
pub mod config;
pub mod error;
pub mod seed;
pub mod state;
pub mod storage;

use tracing_subscriber::{EnvFilter, fmt::time::ChronoLocal};

use config::{Config, LOG_ENV, StorageKind};
use error::Result;
use seed::SeedData;
use state::AppState;
use storage::{ContentRepository, MemoryRepository, PgRepository};

/// 初始化日志输出，级别由 `STACKLOOM_LOG` 控制
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_env_filter(EnvFilter::from_env(LOG_ENV))
        .init();
}

/// 连接 Postgres，按配置执行建表语句
pub async fn connect_postgres(config: &Config) -> Result<PgRepository> {
    let db = storage::new_db_pool(config.database_url()?).await?;
    if config.auto_migrate {
        storage::migrate(&db, storage::SCHEMA).await?;
        tracing::info!("schema ready");
    }
    Ok(PgRepository::new(db))
}

pub async fn run() -> Result<()> {
    init_tracing();

    let config = Config::load()?;
    tracing::info!(storage = ?config.storage, "starting");

    match config.storage {
        StorageKind::Memory => {
            let repo = MemoryRepository::new();
            if let Some(path) = &config.seed_file {
                let report = repo.seed(SeedData::from_file(path)?).await?;
                tracing::info!(?report, "seed loaded");
            }
            serve(repo, &config).await
        }
        StorageKind::Postgres => serve(connect_postgres(&config).await?, &config).await,
    }
}

async fn serve<R: ContentRepository>(repo: R, config: &Config) -> Result<()> {
    let app = AppState::new(repo);
    let result = api::run_server(app.clone(), config).await;
    app.repo().close().await;
    result
}

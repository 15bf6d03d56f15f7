use std::time::Duration;

use inventory_core::{config::DatabaseConfig, InventoryResult};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// 按配置创建PostgreSQL连接池
pub async fn create_pool(config: &DatabaseConfig) -> InventoryResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "PostgreSQL连接池已创建"
    );
    Ok(pool)
}

pub async fn health_check(pool: &PgPool) -> InventoryResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

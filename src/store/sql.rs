//! Relational store backed by a `sqlx` connection pool.
//!
//! The `Any` driver lets the same queries run against MySQL in production
//! and SQLite locally; the scheme of the configured URL picks the driver.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::config::DatabaseConfig;
use crate::store::{GatewayStore, RequestLogEntry, ResponseLogEntry, StoreError};

const INSERT_REQUEST_LOG: &str = "INSERT INTO RequestLogs (\
    RequestId, HttpMethod, RequestPath, QueryString, ClientIp, UserAgent, RequestTime, HttpVersion\
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

const INSERT_RESPONSE_LOG: &str = "INSERT INTO ResponseLogs (\
    RequestId, StatusCode, ResponseHeaders, ResponseTime, DurationMs, ServerIp, ResponseSizeInBytes\
    ) VALUES (?, ?, ?, ?, ?, ?, ?)";

const SELECT_ACTIVE_BLOCKED: &str = "SELECT IpAddress FROM BlacklistedIps WHERE IsActive = 1";

const SELECT_CONFIG_VALUE: &str = "SELECT `Value` FROM Configurations WHERE `Key` = ? LIMIT 1";

/// Store that talks to a relational database through a bounded pool.
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Open a pool against `config.url`.
    ///
    /// Callers that find the pool exhausted wait for a free connection; the
    /// acquire timeout is only a backstop against a wedged database.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "Database pool ready"
        );

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl GatewayStore for SqlStore {
    async fn record_request(&self, entry: &RequestLogEntry) -> Result<(), StoreError> {
        sqlx::query(INSERT_REQUEST_LOG)
            .bind(entry.request_id.to_string())
            .bind(entry.http_method.clone())
            .bind(entry.request_path.clone())
            .bind(entry.query_string_column())
            .bind(entry.client_ip.clone())
            .bind(entry.user_agent.clone())
            .bind(entry.request_time_column())
            .bind(entry.http_version.clone())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_response(&self, entry: &ResponseLogEntry) -> Result<(), StoreError> {
        sqlx::query(INSERT_RESPONSE_LOG)
            .bind(entry.request_id.to_string())
            .bind(i32::from(entry.status_code))
            .bind(entry.response_headers_column())
            .bind(entry.response_time_column())
            .bind(i64::try_from(entry.duration_ms).unwrap_or(i64::MAX))
            .bind(entry.server_ip.clone())
            .bind(i64::try_from(entry.response_size_in_bytes).unwrap_or(i64::MAX))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_active_blocked_addresses(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query_scalar::<_, String>(SELECT_ACTIVE_BLOCKED)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn read_config_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, Option<String>>(SELECT_CONFIG_VALUE)
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.flatten())
    }
}

// データベース接続ファクトリー
//
// 設定からプラットフォームを判定し、sqlxの単一接続を確立して
// Connection として返します。

use std::time::Duration;

use sqlx::AnyConnection;

use crate::adapters::connection::SqlxConnection;
use crate::adapters::connection_string::build_connection_string;
use crate::core::config::Config;
use crate::core::error::DatabaseError;
use crate::core::platform::Platform;

/// 接続タイムアウトの既定値（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// データベース接続ファクトリー
#[derive(Debug, Clone, Default)]
pub struct ConnectionFactory;

impl ConnectionFactory {
    /// 新しいConnectionFactoryを作成
    pub fn new() -> Self {
        Self
    }

    /// `dbtype` の別名を正規化
    pub fn normalize_type(&self, dbtype: &str) -> Option<Platform> {
        Platform::normalize(dbtype)
    }

    /// サポートされている `dbtype` かどうか
    pub fn is_valid_type(&self, dbtype: &str) -> bool {
        self.normalize_type(dbtype).is_some()
    }

    /// 設定から接続を確立
    ///
    /// # Returns
    /// 接続済みの SqlxConnection。Oracleは `DatabaseError::UnsupportedPlatform`
    pub async fn connect(&self, config: &Config) -> Result<SqlxConnection, DatabaseError> {
        let platform = self.normalize_type(&config.dbtype).ok_or_else(|| {
            DatabaseError::UnsupportedPlatform {
                platform: config.dbtype.clone(),
            }
        })?;

        if platform == Platform::Oracle {
            return Err(DatabaseError::UnsupportedPlatform {
                platform: platform.to_string(),
            });
        }

        if platform == Platform::SQLite {
            std::fs::create_dir_all(&config.datadirectory).map_err(|e| {
                DatabaseError::Connection {
                    message: format!(
                        "Failed to create data directory {}",
                        config.datadirectory.display()
                    ),
                    cause: e.to_string(),
                }
            })?;
        }

        sqlx::any::install_default_drivers();

        let url = build_connection_string(platform, config);
        let timeout = Duration::from_secs(config.timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS));
        tracing::debug!(platform = %platform, "Connecting to database");

        let conn = self.open(&url, timeout, platform).await?;
        SqlxConnection::new(platform, &config.dbtableprefix, conn).await
    }

    async fn open(
        &self,
        url: &str,
        timeout: Duration,
        platform: Platform,
    ) -> Result<AnyConnection, DatabaseError> {
        use sqlx::Connection as _;

        match tokio::time::timeout(timeout, AnyConnection::connect(url)).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(DatabaseError::Connection {
                message: format!("Failed to connect to {} database", platform),
                cause: e.to_string(),
            }),
            Err(_) => Err(DatabaseError::Connection {
                message: format!("Failed to connect to {} database", platform),
                cause: format!("timed out after {}s", timeout.as_secs()),
            }),
        }
    }
}

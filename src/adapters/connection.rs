// sqlx接続アダプター
//
// 単一の AnyConnection を Connection トレイトとして公開します。
// トランザクションは BEGIN/COMMIT/ROLLBACK 文で明示的に管理します。

use async_trait::async_trait;
use sqlx::{AnyConnection, Row};

use crate::adapters::database_introspector::{create_introspector, DatabaseIntrospector};
use crate::adapters::type_mapping::TypeMappingService;
use crate::core::error::DatabaseError;
use crate::core::platform::Platform;
use crate::core::schema::Schema;

pub use crate::core::connection::Connection;

/// sqlx による Connection 実装
pub struct SqlxConnection {
    platform: Platform,
    prefix: String,
    conn: AnyConnection,
    introspector: Box<dyn DatabaseIntrospector>,
    type_mapping: TypeMappingService,
}

impl SqlxConnection {
    /// 確立済みの接続をラップ
    ///
    /// SQLiteでは外部キーの強制を無効化します（テーブル再作成の前提）。
    pub async fn new(
        platform: Platform,
        prefix: &str,
        mut conn: AnyConnection,
    ) -> Result<Self, DatabaseError> {
        let introspector =
            create_introspector(platform).ok_or_else(|| DatabaseError::UnsupportedPlatform {
                platform: platform.to_string(),
            })?;

        if platform == Platform::SQLite {
            let sql = "PRAGMA foreign_keys = OFF";
            sqlx::raw_sql(sql)
                .execute(&mut conn)
                .await
                .map_err(|e| DatabaseError::query(e.to_string(), sql))?;
        }

        Ok(Self {
            platform,
            prefix: prefix.to_string(),
            conn,
            introspector,
            type_mapping: TypeMappingService::new(platform),
        })
    }

    /// 接続を閉じる
    pub async fn close(self) -> Result<(), DatabaseError> {
        use sqlx::Connection as _;
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection {
                message: "Failed to close the database connection".to_string(),
                cause: e.to_string(),
            })
    }

    async fn run_raw(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        tracing::debug!(platform = %self.platform, statement = sql, "Executing statement");
        sqlx::Executor::execute(&mut self.conn, sqlx::raw_sql(sql))
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| DatabaseError::query(e.to_string(), sql))
    }
}

impl std::fmt::Debug for SqlxConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxConnection")
            .field("platform", &self.platform)
            .field("prefix", &self.prefix)
            .finish()
    }
}

#[async_trait]
impl Connection for SqlxConnection {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    async fn create_schema(&mut self) -> Result<Schema, DatabaseError> {
        self.introspector
            .introspect(&mut self.conn, &self.type_mapping, &self.prefix)
            .await
            .map_err(|e| DatabaseError::Query {
                message: format!("Failed to introspect the database schema: {:#}", e),
                sql: None,
            })
    }

    async fn execute_statement(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        self.run_raw(sql).await
    }

    async fn execute_with_params(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<u64, DatabaseError> {
        tracing::debug!(platform = %self.platform, statement = sql, "Executing statement");
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }
        query
            .execute(&mut self.conn)
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| DatabaseError::query(e.to_string(), sql))
    }

    async fn fetch_strings(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<String>, DatabaseError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(param.as_str());
        }
        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| DatabaseError::query(e.to_string(), sql))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>(0)
                    .map_err(|e| DatabaseError::query(e.to_string(), sql))
            })
            .collect()
    }

    async fn begin_transaction(&mut self) -> Result<(), DatabaseError> {
        self.run_raw("BEGIN")
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::Transaction {
                message: format!("Failed to begin transaction: {}", e),
            })
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.run_raw("COMMIT")
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::Transaction {
                message: format!("Failed to commit transaction: {}", e),
            })
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.run_raw("ROLLBACK")
            .await
            .map(|_| ())
            .map_err(|e| DatabaseError::Transaction {
                message: format!("Failed to roll back transaction: {}", e),
            })
    }
}

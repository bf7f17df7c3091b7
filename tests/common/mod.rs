// 統合テスト共通ヘルパー

#![allow(dead_code)]

use async_trait::async_trait;
use schemata::adapters::connection::SqlxConnection;
use schemata::adapters::database::ConnectionFactory;
use schemata::adapters::migration_ledger::MigrationLedger;
use schemata::core::config::Config;
use schemata::core::connection::Connection;
use schemata::core::error::DatabaseError;
use schemata::core::platform::Platform;
use schemata::core::schema::Schema;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// 一時ディレクトリ上のSQLiteデータベースに接続
pub async fn sqlite_connection(dir: &TempDir) -> SqlxConnection {
    let mut config: Config = "dbtype: sqlite3\ndbname: cloud\n".parse().unwrap();
    config.datadirectory = dir.path().join("data");
    ConnectionFactory::new().connect(&config).await.unwrap()
}

/// 実行内容を記録するインメモリ接続
///
/// `create_schema` は保持しているスキーマをそのまま返し、SQLは解釈しません。
/// 台帳テーブルは最初から存在するものとして扱います。
pub struct RecordingConnection {
    pub schema: Schema,
    pub statements: Vec<String>,
    pub ledger: BTreeSet<(String, String)>,
    pub log: Arc<Mutex<Vec<String>>>,
    pub fail_on: Option<String>,
}

impl RecordingConnection {
    pub fn new(log: Arc<Mutex<Vec<String>>>) -> Self {
        let mut schema = Schema::new();
        let mut ledger_table = MigrationLedger::logical_table();
        ledger_table.name = format!("oc_{}", ledger_table.name);
        schema.add_table(ledger_table);

        Self {
            schema,
            statements: Vec::new(),
            ledger: BTreeSet::new(),
            log,
            fail_on: None,
        }
    }

    /// 指定した文字列を含むSQLで失敗させる
    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_on = Some(fragment.to_string());
        self
    }

    fn check_failure(&self, sql: &str) -> Result<(), DatabaseError> {
        match &self.fail_on {
            Some(fragment) if sql.contains(fragment.as_str()) => {
                Err(DatabaseError::query("injected failure", sql))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for RecordingConnection {
    fn platform(&self) -> Platform {
        Platform::SQLite
    }

    fn prefix(&self) -> &str {
        "oc_"
    }

    async fn create_schema(&mut self) -> Result<Schema, DatabaseError> {
        Ok(self.schema.clone())
    }

    async fn execute_statement(&mut self, sql: &str) -> Result<u64, DatabaseError> {
        self.check_failure(sql)?;
        self.statements.push(sql.to_string());
        Ok(0)
    }

    async fn execute_with_params(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<u64, DatabaseError> {
        self.check_failure(sql)?;
        self.statements.push(sql.to_string());
        if sql.contains("oc_migrations") && params.len() >= 2 {
            let inserted = self.ledger.insert((params[0].clone(), params[1].clone()));
            return Ok(u64::from(inserted));
        }
        Ok(0)
    }

    async fn fetch_strings(
        &mut self,
        _sql: &str,
        params: &[String],
    ) -> Result<Vec<String>, DatabaseError> {
        let app = params.first().cloned().unwrap_or_default();
        Ok(self
            .ledger
            .iter()
            .filter(|(a, _)| *a == app)
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn begin_transaction(&mut self) -> Result<(), DatabaseError> {
        self.statements.push("BEGIN".to_string());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.statements.push("COMMIT".to_string());
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.statements.push("ROLLBACK".to_string());
        Ok(())
    }
}

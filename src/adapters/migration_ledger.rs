// マイグレーション台帳
//
// `<prefix>migrations` テーブルへの読み書きを担当します。
// 記録は (app, version) 主キーに対する冪等な挿入で行います。

use chrono::Utc;

use crate::adapters::sql_quote::quote_identifier;
use crate::core::connection::Connection;
use crate::core::error::DatabaseError;
use crate::core::naming::{ledger_table_name, LEDGER_TABLE};
use crate::core::platform::Platform;
use crate::core::schema::{Column, ColumnType, Index, Table, DEFAULT_PRIMARY_KEY_NAME};

/// マイグレーション台帳
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    platform: Platform,
    table_name: String,
}

impl MigrationLedger {
    /// 接続のプラットフォームとプレフィックスから台帳を作成
    pub fn new(platform: Platform, prefix: &str) -> Self {
        Self {
            platform,
            table_name: ledger_table_name(prefix),
        }
    }

    /// 台帳テーブルの物理名
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// 台帳テーブルの論理定義
    pub fn logical_table() -> Table {
        let mut table = Table::new(LEDGER_TABLE);
        table.columns = vec![
            Column::new("app", ColumnType::STRING, false).with_length(255),
            Column::new("version", ColumnType::STRING, false).with_length(255),
            Column::new("executed_at", ColumnType::STRING, false).with_length(64),
        ];
        table.primary_key = Some(Index::primary(
            DEFAULT_PRIMARY_KEY_NAME,
            vec!["app".to_string(), "version".to_string()],
        ));
        table
    }

    fn quote(&self, name: &str) -> String {
        quote_identifier(self.platform, name)
    }

    /// n番目（1始まり）のバインドパラメータ
    fn placeholder(&self, n: usize) -> String {
        match self.platform {
            Platform::PostgreSQL => format!("${}", n),
            Platform::Oracle => format!(":{}", n),
            Platform::MySQL | Platform::SQLite => "?".to_string(),
        }
    }

    /// 適用済みバージョン取得SQL
    pub fn select_versions_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = {}",
            self.quote("version"),
            self.quote(&self.table_name),
            self.quote("app"),
            self.placeholder(1)
        )
    }

    /// 存在しない場合のみ挿入するSQL
    pub fn insert_sql(&self) -> String {
        let table = self.quote(&self.table_name);
        let columns = format!(
            "{}, {}, {}",
            self.quote("app"),
            self.quote("version"),
            self.quote("executed_at")
        );
        let values = format!(
            "{}, {}, {}",
            self.placeholder(1),
            self.placeholder(2),
            self.placeholder(3)
        );

        match self.platform {
            Platform::SQLite => format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
                table, columns, values
            ),
            Platform::PostgreSQL => format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
                table, columns, values
            ),
            Platform::MySQL => format!(
                "INSERT IGNORE INTO {} ({}) VALUES ({})",
                table, columns, values
            ),
            Platform::Oracle => format!(
                "MERGE INTO {table} l USING (SELECT {p1} AS {app}, {p2} AS {version}, {p3} AS {executed_at} FROM DUAL) s \
                 ON (l.{app} = s.{app} AND l.{version} = s.{version}) \
                 WHEN NOT MATCHED THEN INSERT ({columns}) VALUES (s.{app}, s.{version}, s.{executed_at})",
                table = table,
                p1 = self.placeholder(1),
                p2 = self.placeholder(2),
                p3 = self.placeholder(3),
                app = self.quote("app"),
                version = self.quote("version"),
                executed_at = self.quote("executed_at"),
                columns = columns,
            ),
        }
    }

    /// アプリの適用済みバージョン（昇順）
    pub async fn migrated_versions(
        &self,
        conn: &mut dyn Connection,
        app: &str,
    ) -> Result<Vec<String>, DatabaseError> {
        let mut versions = conn
            .fetch_strings(&self.select_versions_sql(), &[app.to_string()])
            .await?;
        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    /// バージョンを記録
    ///
    /// # Returns
    /// 新たに挿入された場合は true、既に記録済みの場合は false
    pub async fn record(
        &self,
        conn: &mut dyn Connection,
        app: &str,
        version: &str,
    ) -> Result<bool, DatabaseError> {
        let params = [
            app.to_string(),
            version.to_string(),
            Utc::now().to_rfc3339(),
        ];
        let inserted = conn.execute_with_params(&self.insert_sql(), &params).await?;
        if inserted == 0 {
            tracing::warn!(app, version, "Migration version was already recorded");
        }
        Ok(inserted > 0)
    }
}

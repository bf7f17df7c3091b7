// レガシースキーママネージャー
//
// XMLスキーマファイルから直接データベースを作成・更新・削除します。
// ファイルのテーブルは現在のスキーマの同名テーブルを置き換えます。

use std::path::Path;

use crate::core::connection::Connection;
use crate::core::error::MigrationError;
use crate::core::schema::Schema;
use crate::services::migrator::{MigrationPlan, MigrationSummary, Migrator};
use crate::services::naming_validator::{NamingValidator, ValidationReport};
use crate::services::schema_reader::SchemaReader;

/// レガシースキーママネージャー
pub struct SchemaManager<'a> {
    connection: &'a mut dyn Connection,
    reader: SchemaReader,
    migrator: Migrator,
}

impl<'a> SchemaManager<'a> {
    /// 接続からSchemaManagerを作成
    pub fn new(connection: &'a mut dyn Connection) -> Self {
        let platform = connection.platform();
        let prefix = connection.prefix().to_string();
        Self {
            reader: SchemaReader::new(platform, &prefix),
            migrator: Migrator::new(platform),
            connection,
        }
    }

    /// スキーマファイルからデータベースを作成
    pub async fn create_db_from_structure(
        &mut self,
        path: &Path,
    ) -> Result<MigrationSummary, MigrationError> {
        self.update_db_from_structure(path, false).await
    }

    /// スキーマファイルでデータベースを更新
    ///
    /// # Arguments
    /// * `dry_run` - trueの場合はSQLを生成するのみで適用しない
    pub async fn update_db_from_structure(
        &mut self,
        path: &Path,
        dry_run: bool,
    ) -> Result<MigrationSummary, MigrationError> {
        let target = self.merged_target(path).await?;
        if dry_run {
            let statements = self
                .migrator
                .generate_change_script(&mut *self.connection, &target)
                .await?;
            return Ok(MigrationSummary {
                statements,
                executed: 0,
                applied: false,
            });
        }

        let summary = self.migrator.migrate(&mut *self.connection, &target).await?;
        tracing::info!(
            file = %path.display(),
            statements = summary.executed,
            "Applied schema file"
        );
        Ok(summary)
    }

    /// スキーマファイルを適用するための差分とSQLを計画
    pub async fn plan_structure(&mut self, path: &Path) -> Result<MigrationPlan, MigrationError> {
        let current = self.connection.create_schema().await?;
        let declared = self.reader.read_file(path)?;
        let target = self.validate(&current, &merge(&current, &declared))?.schema;
        self.migrator.plan(&current, &target)
    }

    /// 更新を試験的に実行
    pub async fn simulate_update_db_from_structure(
        &mut self,
        path: &Path,
    ) -> Result<MigrationSummary, MigrationError> {
        let target = self.merged_target(path).await?;
        self.migrator.check_migrate(&mut *self.connection, &target).await
    }

    /// スキーマファイルに含まれるテーブルを削除
    pub async fn remove_db_structure(
        &mut self,
        path: &Path,
    ) -> Result<MigrationSummary, MigrationError> {
        let declared = self.reader.read_file(path)?;
        let mut target = self.connection.create_schema().await?;
        for name in declared.tables.keys() {
            if target.has_table(name) {
                target.drop_table(name)?;
            }
        }
        let summary = self.migrator.migrate(&mut *self.connection, &target).await?;
        tracing::info!(file = %path.display(), statements = summary.executed, "Removed schema file tables");
        Ok(summary)
    }

    /// スキーマファイルを現在のスキーマに対して検証
    pub async fn check_structure(&mut self, path: &Path) -> Result<ValidationReport, MigrationError> {
        let declared = self.reader.read_file(path)?;
        let current = self.connection.create_schema().await?;
        let target = merge(&current, &declared);
        self.validate(&current, &target)
    }

    /// 現在のスキーマにファイルの内容を重ね、検証済みの目標スキーマを返す
    async fn merged_target(&mut self, path: &Path) -> Result<Schema, MigrationError> {
        let declared = self.reader.read_file(path)?;
        let current = self.connection.create_schema().await?;
        let target = merge(&current, &declared);
        let report = self.validate(&current, &target)?;
        Ok(report.schema)
    }

    /// 物理名のまま検証する
    ///
    /// 物理名はプレフィックスを含むため、プレフィックス長は加算しません。
    fn validate(&self, current: &Schema, target: &Schema) -> Result<ValidationReport, MigrationError> {
        let validator = NamingValidator::new(self.migrator.profile());
        Ok(validator.ensure_naming_constraints(current, target, 0)?)
    }
}

/// ファイルのテーブルとシーケンスで現在のスキーマを上書き
fn merge(current: &Schema, declared: &Schema) -> Schema {
    let mut merged = current.clone();
    for table in declared.tables.values() {
        merged.add_table(table.clone());
    }
    for sequence in declared.sequences.values() {
        merged
            .sequences
            .insert(sequence.name.clone(), sequence.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ColumnType, Table};

    #[test]
    fn test_merge_replaces_same_named_tables() {
        let mut current = Schema::new();
        let mut old = Table::new("oc_users");
        old.add_column(Column::new("id", ColumnType::INTEGER, false))
            .unwrap();
        current.add_table(old);
        current.add_table(Table::new("oc_other"));

        let mut declared = Schema::new();
        let mut new = Table::new("oc_users");
        new.add_column(Column::new("uid", ColumnType::STRING, false))
            .unwrap();
        declared.add_table(new);

        let merged = merge(&current, &declared);
        assert!(merged.has_table("oc_other"));
        let users = merged.get_table("oc_users").unwrap();
        assert!(users.has_column("uid"));
        assert!(!users.has_column("id"));
    }
}

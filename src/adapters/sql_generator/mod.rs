// SQL生成アダプター
//
// スキーマ差分から各プラットフォーム用のDDL文を生成するアダプター層。
// 文の全体的な順序（シーケンス、テーブル、変更、外部キー、削除）は
// generate_migration_script が決定します。

pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod sqlite;
pub mod sqlite_table_recreator;

use crate::adapters::sql_quote::{quote_columns, quote_identifier};
use crate::adapters::type_mapping::TypeMappingService;
use crate::core::platform::{Platform, PlatformProfile};
use crate::core::schema::{
    Column, ForeignKey, Index, Schema, Sequence, Table, DEFAULT_PRIMARY_KEY_NAME,
};
use crate::core::schema_diff::{ColumnDiff, PrimaryKeyChange, SchemaDiff, TableDiff};

pub use mysql::MySqlSqlGenerator;
pub use oracle::OracleSqlGenerator;
pub use postgres::PostgresSqlGenerator;
pub use sqlite::SqliteSqlGenerator;

/// カラム定義の共通組み立てヘルパー
pub(crate) fn build_column_definition(
    quoted_name: &str,
    type_str: String,
    column: &Column,
    default_sql: Option<String>,
    extra_parts: &[&str],
) -> String {
    let mut parts = Vec::new();

    parts.push(quoted_name.to_string());
    parts.push(type_str);

    if let Some(default_sql) = default_sql {
        parts.push(format!("DEFAULT {}", default_sql));
    }

    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }

    for part in extra_parts {
        if !part.is_empty() {
            parts.push((*part).to_string());
        }
    }

    parts.join(" ")
}

/// 主キー名が既定名（エンジン任せ）かどうか
pub fn is_default_primary_key_name(profile: PlatformProfile, table: &str, name: &str) -> bool {
    name.eq_ignore_ascii_case(DEFAULT_PRIMARY_KEY_NAME)
        || name.eq_ignore_ascii_case(&profile.default_primary_key_name(table))
}

/// SQLジェネレータートレイト
///
/// 各プラットフォーム用のSQLジェネレーターが実装すべきインターフェース。
/// 識別子は全て物理名で渡されます。
pub trait SqlGenerator {
    /// 対象プラットフォーム
    fn platform(&self) -> Platform;

    /// 型マッピング
    fn type_mapping(&self) -> &TypeMappingService;

    /// 識別子をクォート
    fn quote(&self, name: &str) -> String {
        quote_identifier(self.platform(), name)
    }

    /// カラム名リストをクォート
    fn quote_list(&self, columns: &[String]) -> String {
        quote_columns(self.platform(), columns)
    }

    /// カラム定義を生成
    fn generate_column_definition(&self, column: &Column) -> String {
        let default_sql = column
            .default
            .as_ref()
            .map(|d| self.type_mapping().format_default(d));
        build_column_definition(
            &self.quote(&column.name),
            self.type_mapping().to_sql_type(column),
            column,
            default_sql,
            &[],
        )
    }

    /// CREATE TABLE文を生成
    ///
    /// 外部キーを除くテーブル本体、インデックス、コメントを含みます。
    fn generate_create_table(&self, table: &Table) -> Vec<String>;

    /// 目標スキーマ全体を参照してCREATE TABLE文を生成
    fn generate_create_table_in(&self, table: &Table, _target: &Schema) -> Vec<String> {
        self.generate_create_table(table)
    }

    /// CREATE INDEX文を生成
    fn generate_create_index(&self, table_name: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            self.quote(&index.name),
            self.quote(table_name),
            self.quote_list(&index.columns)
        )
    }

    /// DROP INDEX文を生成
    fn generate_drop_index(&self, _table_name: &str, index: &Index) -> String {
        format!("DROP INDEX {}", self.quote(&index.name))
    }

    /// ALTER TABLE ADD COLUMN文を生成
    fn generate_add_column(&self, table_name: &str, column: &Column) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote(table_name),
            self.generate_column_definition(column)
        )]
    }

    /// ALTER TABLE DROP COLUMN文を生成
    fn generate_drop_column(&self, table_name: &str, column_name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote(table_name),
            self.quote(column_name)
        )
    }

    /// カラム変更文を生成
    fn generate_alter_column(&self, table_name: &str, column_diff: &ColumnDiff) -> Vec<String>;

    /// 主キー変更文を生成
    fn generate_primary_key_change(
        &self,
        table_name: &str,
        change: &PrimaryKeyChange,
    ) -> Vec<String>;

    /// 外部キー追加文を生成
    fn generate_add_foreign_key(&self, table_name: &str, foreign_key: &ForeignKey) -> Vec<String> {
        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote(table_name),
            self.quote(&foreign_key.name),
            self.quote_list(&foreign_key.columns),
            self.quote(&foreign_key.referenced_table),
            self.quote_list(&foreign_key.referenced_columns)
        );
        if let Some(action) = foreign_key.on_delete {
            sql.push_str(&format!(" ON DELETE {}", action.as_sql()));
        }
        if let Some(action) = foreign_key.on_update {
            sql.push_str(&format!(" ON UPDATE {}", action.as_sql()));
        }
        vec![sql]
    }

    /// 外部キー削除文を生成
    fn generate_drop_foreign_key(&self, table_name: &str, foreign_key: &ForeignKey) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote(table_name),
            self.quote(&foreign_key.name)
        )
    }

    /// DROP TABLE文を生成
    fn generate_drop_table(&self, table_name: &str) -> String {
        format!("DROP TABLE {}", self.quote(table_name))
    }

    /// CREATE SEQUENCE文を生成
    fn generate_create_sequence(&self, sequence: &Sequence) -> Vec<String> {
        vec![format!(
            "CREATE SEQUENCE {} START WITH {} INCREMENT BY {}",
            self.quote(&sequence.name),
            sequence.start,
            sequence.increment
        )]
    }

    /// DROP SEQUENCE文を生成
    fn generate_drop_sequence(&self, sequence_name: &str) -> Vec<String> {
        vec![format!("DROP SEQUENCE {}", self.quote(sequence_name))]
    }

    /// 1テーブル分の変更文を生成（外部キーの追加を除く）
    ///
    /// 外部キーとインデックスの削除、カラム追加、カラム変更、主キー変更、
    /// カラム削除、インデックス追加の順に並べます。
    ///
    /// # Arguments
    /// * `old_table` - 変更前のテーブル
    /// * `new_table` - 変更後のテーブル
    /// * `diff` - テーブル差分
    fn generate_table_changes(
        &self,
        _old_table: &Table,
        _new_table: &Table,
        diff: &TableDiff,
    ) -> Vec<String> {
        let table_name = &diff.table_name;
        let mut statements = Vec::new();

        for foreign_key in &diff.removed_foreign_keys {
            statements.push(self.generate_drop_foreign_key(table_name, foreign_key));
        }
        for index in &diff.removed_indexes {
            statements.push(self.generate_drop_index(table_name, index));
        }
        for column in &diff.added_columns {
            statements.extend(self.generate_add_column(table_name, column));
        }
        for column_diff in &diff.modified_columns {
            statements.extend(self.generate_alter_column(table_name, column_diff));
        }
        if let Some(change) = &diff.primary_key_change {
            statements.extend(self.generate_primary_key_change(table_name, change));
        }
        for column in &diff.removed_columns {
            statements.push(self.generate_drop_column(table_name, &column.name));
        }
        for index in &diff.added_indexes {
            statements.push(self.generate_create_index(table_name, index));
        }

        statements
    }

    /// 変更されたテーブルで追加すべき外部キー
    ///
    /// テーブルを再作成する実装では、外部キーは再作成時に含まれるため空を返します。
    fn foreign_keys_to_add<'a>(
        &self,
        _new_table: &'a Table,
        diff: &'a TableDiff,
    ) -> Vec<&'a ForeignKey> {
        diff.added_foreign_keys.iter().collect()
    }
}

/// プラットフォームに応じたSQLジェネレーターを作成
pub fn create_sql_generator(platform: Platform) -> Box<dyn SqlGenerator + Send + Sync> {
    match platform {
        Platform::MySQL => Box::new(MySqlSqlGenerator::new()),
        Platform::PostgreSQL => Box::new(PostgresSqlGenerator::new()),
        Platform::Oracle => Box::new(OracleSqlGenerator::new()),
        Platform::SQLite => Box::new(SqliteSqlGenerator::new()),
    }
}

/// スキーマ差分からマイグレーションスクリプトを生成
///
/// # Arguments
/// * `generator` - プラットフォーム用ジェネレーター
/// * `diff` - 現在のスキーマと目標スキーマの差分
/// * `current` - 現在のスキーマ（物理名）
/// * `target` - 目標スキーマ（物理名）
///
/// # Returns
/// 実行順に並んだSQL文
pub fn generate_migration_script(
    generator: &dyn SqlGenerator,
    diff: &SchemaDiff,
    current: &Schema,
    target: &Schema,
) -> Vec<String> {
    let mut statements = Vec::new();

    // 1. シーケンス作成
    for sequence in &diff.added_sequences {
        statements.extend(generator.generate_create_sequence(sequence));
    }

    // 2. テーブル作成（依存順、外部キーなし）
    let added_tables = diff.sort_added_tables_by_dependency();
    for table in &added_tables {
        statements.extend(generator.generate_create_table_in(table, target));
    }

    // 3. 既存テーブルの変更
    let mut pending_foreign_keys: Vec<(String, ForeignKey)> = Vec::new();
    for table_diff in &diff.modified_tables {
        let (Ok(old_table), Ok(new_table)) = (
            current.get_table(&table_diff.table_name),
            target.get_table(&table_diff.table_name),
        ) else {
            continue;
        };
        statements.extend(generator.generate_table_changes(old_table, new_table, table_diff));
        for foreign_key in generator.foreign_keys_to_add(new_table, table_diff) {
            pending_foreign_keys.push((table_diff.table_name.clone(), foreign_key.clone()));
        }
    }

    // 4. 外部キー追加
    for table in &added_tables {
        for foreign_key in &table.foreign_keys {
            statements.extend(generator.generate_add_foreign_key(&table.name, foreign_key));
        }
    }
    for (table_name, foreign_key) in &pending_foreign_keys {
        statements.extend(generator.generate_add_foreign_key(table_name, foreign_key));
    }

    // 5. テーブル削除（依存される側が後）
    for table_name in diff.sort_removed_tables_by_dependency(&current.tables) {
        statements.push(generator.generate_drop_table(&table_name));
    }

    // 6. シーケンス削除
    for sequence_name in &diff.removed_sequences {
        statements.extend(generator.generate_drop_sequence(sequence_name));
    }

    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnType;

    #[test]
    fn test_build_column_definition() {
        let column = Column::new("name", ColumnType::STRING, false);
        let sql = build_column_definition(
            "\"name\"",
            "VARCHAR(64)".to_string(),
            &column,
            Some("'x'".to_string()),
            &["COMMENT 'c'"],
        );
        assert_eq!(sql, "\"name\" VARCHAR(64) DEFAULT 'x' NOT NULL COMMENT 'c'");
    }

    #[test]
    fn test_is_default_primary_key_name() {
        let pg = Platform::PostgreSQL.profile();
        assert!(is_default_primary_key_name(pg, "oc_users", "primary"));
        assert!(is_default_primary_key_name(pg, "oc_users", "oc_users_pkey"));
        assert!(!is_default_primary_key_name(pg, "oc_users", "users_pk"));
    }

    #[test]
    fn test_create_sql_generator_platform() {
        for platform in Platform::ALL {
            assert_eq!(create_sql_generator(platform).platform(), platform);
        }
    }
}

// SQLite用SQLジェネレーター
//
// スキーマ定義からSQLite用のDDL文を生成します。
// SQLiteはALTER TABLEの機能が制限されているため、外部キーと主キーは
// CREATE TABLE内で定義し、単純でない変更はテーブル再作成で行います。

use crate::adapters::sql_generator::sqlite_table_recreator::SqliteTableRecreator;
use crate::adapters::sql_generator::{build_column_definition, SqlGenerator};
use crate::adapters::type_mapping::TypeMappingService;
use crate::core::platform::Platform;
use crate::core::schema::{Column, ForeignKey, Sequence, Table};
use crate::core::schema_diff::{ColumnDiff, PrimaryKeyChange, TableDiff};

/// SQLite用SQLジェネレーター
#[derive(Debug, Clone)]
pub struct SqliteSqlGenerator {
    type_mapping: TypeMappingService,
}

impl SqliteSqlGenerator {
    /// 新しいSqliteSqlGeneratorを作成
    pub fn new() -> Self {
        Self {
            type_mapping: TypeMappingService::new(Platform::SQLite),
        }
    }

    /// 主キーがカラム定義内の INTEGER PRIMARY KEY AUTOINCREMENT で表現されるか
    fn inline_primary_key<'a>(&self, table: &'a Table) -> Option<&'a Column> {
        let pk = table.primary_key.as_ref()?;
        if pk.columns.len() != 1 {
            return None;
        }
        table
            .columns
            .iter()
            .find(|c| c.name == pk.columns[0] && c.autoincrement)
    }

    fn generate_foreign_key_clause(&self, foreign_key: &ForeignKey) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
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
        sql
    }

    /// 指定した物理名でテーブル本体のCREATE TABLE文を生成
    ///
    /// 外部キーを含み、インデックスは含みません。
    pub fn generate_create_table_named(&self, table: &Table, physical_name: &str) -> String {
        let inline_pk = self.inline_primary_key(table).map(|c| c.name.as_str());

        let mut elements: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                let definition = if inline_pk == Some(column.name.as_str()) {
                    build_column_definition(
                        &self.quote(&column.name),
                        "INTEGER".to_string(),
                        column,
                        None,
                        &["PRIMARY KEY AUTOINCREMENT"],
                    )
                } else {
                    self.generate_column_definition(column)
                };
                format!("    {}", definition)
            })
            .collect();

        if let (Some(pk), None) = (&table.primary_key, inline_pk) {
            elements.push(format!("    PRIMARY KEY ({})", self.quote_list(&pk.columns)));
        }

        for foreign_key in &table.foreign_keys {
            elements.push(format!("    {}", self.generate_foreign_key_clause(foreign_key)));
        }

        format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote(physical_name),
            elements.join(",\n")
        )
    }

    /// ALTER TABLE で表現できない変更を含むかどうか
    pub fn requires_rebuild(&self, diff: &TableDiff) -> bool {
        diff.structural_column_changes().next().is_some()
            || !diff.removed_columns.is_empty()
            || diff.primary_key_change.is_some()
            || !diff.added_foreign_keys.is_empty()
            || !diff.removed_foreign_keys.is_empty()
            || diff
                .added_columns
                .iter()
                .any(|c| c.autoincrement || (!c.nullable && c.default.is_none()))
    }
}

impl Default for SqliteSqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlGenerator for SqliteSqlGenerator {
    fn platform(&self) -> Platform {
        Platform::SQLite
    }

    fn type_mapping(&self) -> &TypeMappingService {
        &self.type_mapping
    }

    // SQLiteはカラムコメントを保持しないため出力しない
    fn generate_create_table(&self, table: &Table) -> Vec<String> {
        let mut statements = vec![self.generate_create_table_named(table, &table.name)];
        for index in &table.indexes {
            statements.push(self.generate_create_index(&table.name, index));
        }
        statements
    }

    // カラム変更は generate_table_changes のテーブル再作成で処理する
    fn generate_alter_column(&self, _table_name: &str, _column_diff: &ColumnDiff) -> Vec<String> {
        Vec::new()
    }

    fn generate_primary_key_change(
        &self,
        _table_name: &str,
        _change: &PrimaryKeyChange,
    ) -> Vec<String> {
        Vec::new()
    }

    // 外部キーはCREATE TABLE内で定義済み
    fn generate_add_foreign_key(&self, _table_name: &str, _foreign_key: &ForeignKey) -> Vec<String> {
        Vec::new()
    }

    fn generate_create_sequence(&self, _sequence: &Sequence) -> Vec<String> {
        Vec::new()
    }

    fn generate_drop_sequence(&self, _sequence_name: &str) -> Vec<String> {
        Vec::new()
    }

    fn generate_table_changes(
        &self,
        old_table: &Table,
        new_table: &Table,
        diff: &TableDiff,
    ) -> Vec<String> {
        if self.requires_rebuild(diff) {
            return SqliteTableRecreator::new(self).generate_table_recreation(old_table, new_table);
        }

        let table_name = &diff.table_name;
        let mut statements = Vec::new();
        for index in &diff.removed_indexes {
            statements.push(self.generate_drop_index(table_name, index));
        }
        for column in &diff.added_columns {
            statements.extend(self.generate_add_column(table_name, column));
        }
        for index in &diff.added_indexes {
            statements.push(self.generate_create_index(table_name, index));
        }
        statements
    }

    fn foreign_keys_to_add<'a>(
        &self,
        _new_table: &'a Table,
        _diff: &'a TableDiff,
    ) -> Vec<&'a ForeignKey> {
        Vec::new()
    }
}

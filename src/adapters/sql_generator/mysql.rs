// MySQL用SQLジェネレーター
//
// スキーマ定義からMySQL用のDDL文を生成します。
// カラム変更は MODIFY による完全な再定義、コメントはカラム定義内に記述します。

use crate::adapters::sql_generator::{build_column_definition, SqlGenerator};
use crate::adapters::type_mapping::common::quote_literal;
use crate::adapters::type_mapping::TypeMappingService;
use crate::core::platform::Platform;
use crate::core::schema::{Column, ForeignKey, Index, Sequence, Table};
use crate::core::schema_diff::{ColumnDiff, PrimaryKeyChange};

/// MySQL用SQLジェネレーター
#[derive(Debug, Clone)]
pub struct MySqlSqlGenerator {
    type_mapping: TypeMappingService,
}

impl MySqlSqlGenerator {
    /// 新しいMySqlSqlGeneratorを作成
    pub fn new() -> Self {
        Self {
            type_mapping: TypeMappingService::new(Platform::MySQL),
        }
    }
}

impl Default for MySqlSqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlGenerator for MySqlSqlGenerator {
    fn platform(&self) -> Platform {
        Platform::MySQL
    }

    fn type_mapping(&self) -> &TypeMappingService {
        &self.type_mapping
    }

    fn generate_column_definition(&self, column: &Column) -> String {
        let auto_increment = if column.autoincrement {
            "AUTO_INCREMENT"
        } else {
            ""
        };
        let comment = column
            .comment
            .as_ref()
            .map(|c| format!("COMMENT {}", quote_literal(c)))
            .unwrap_or_default();
        let default_sql = if column.autoincrement {
            None
        } else {
            column
                .default
                .as_ref()
                .map(|d| self.type_mapping.format_default(d))
        };

        build_column_definition(
            &self.quote(&column.name),
            self.type_mapping.to_sql_type(column),
            column,
            default_sql,
            &[auto_increment, comment.as_str()],
        )
    }

    fn generate_create_table(&self, table: &Table) -> Vec<String> {
        let mut elements: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("    {}", self.generate_column_definition(c)))
            .collect();

        // MySQLの主キー名は常に PRIMARY
        if let Some(pk) = &table.primary_key {
            elements.push(format!("    PRIMARY KEY ({})", self.quote_list(&pk.columns)));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n) DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_bin ENGINE = InnoDB",
            self.quote(&table.name),
            elements.join(",\n")
        )];

        for index in &table.indexes {
            statements.push(self.generate_create_index(&table.name, index));
        }

        statements
    }

    fn generate_drop_index(&self, table_name: &str, index: &Index) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote(&index.name),
            self.quote(table_name)
        )
    }

    fn generate_alter_column(&self, table_name: &str, column_diff: &ColumnDiff) -> Vec<String> {
        if column_diff.is_empty() {
            return Vec::new();
        }
        vec![format!(
            "ALTER TABLE {} MODIFY {}",
            self.quote(table_name),
            self.generate_column_definition(&column_diff.new_column)
        )]
    }

    fn generate_primary_key_change(
        &self,
        table_name: &str,
        change: &PrimaryKeyChange,
    ) -> Vec<String> {
        let quoted_table = self.quote(table_name);
        let mut statements = Vec::new();

        if change.old.is_some() {
            statements.push(format!("ALTER TABLE {} DROP PRIMARY KEY", quoted_table));
        }
        if let Some(new) = &change.new {
            statements.push(format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                quoted_table,
                self.quote_list(&new.columns)
            ));
        }

        statements
    }

    fn generate_drop_foreign_key(&self, table_name: &str, foreign_key: &ForeignKey) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote(table_name),
            self.quote(&foreign_key.name)
        )
    }

    // MySQLにはシーケンスがない（AUTO_INCREMENTで代替）
    fn generate_create_sequence(&self, _sequence: &Sequence) -> Vec<String> {
        Vec::new()
    }

    fn generate_drop_sequence(&self, _sequence_name: &str) -> Vec<String> {
        Vec::new()
    }
}

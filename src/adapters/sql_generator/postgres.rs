// PostgreSQL用SQLジェネレーター
//
// スキーマ定義からPostgreSQL用のDDL文を生成します。
// 新規の自動採番カラムはSERIAL系、既存カラムへの自動採番追加はシーケンスで実現します。

use crate::adapters::sql_generator::{
    build_column_definition, is_default_primary_key_name, SqlGenerator,
};
use crate::adapters::type_mapping::common::quote_literal;
use crate::adapters::type_mapping::TypeMappingService;
use crate::core::platform::Platform;
use crate::core::schema::{Column, ColumnType, Table};
use crate::core::schema_diff::{ColumnChange, ColumnDiff, PrimaryKeyChange};

/// PostgreSQL用SQLジェネレーター
#[derive(Debug, Clone)]
pub struct PostgresSqlGenerator {
    type_mapping: TypeMappingService,
}

impl PostgresSqlGenerator {
    /// 新しいPostgresSqlGeneratorを作成
    pub fn new() -> Self {
        Self {
            type_mapping: TypeMappingService::new(Platform::PostgreSQL),
        }
    }

    /// 自動採番カラムのSERIAL系型名
    fn serial_type(&self, column: &Column) -> String {
        match column.column_type {
            ColumnType::BIGINT => "BIGSERIAL".to_string(),
            ColumnType::SMALLINT => "SMALLSERIAL".to_string(),
            _ => "SERIAL".to_string(),
        }
    }

    /// 既存カラムに自動採番を追加するSQLを生成
    ///
    /// シーケンスを作成して現在の最大値+1から採番し、カラムのデフォルトと所有関係を設定します。
    fn generate_add_auto_increment(&self, table_name: &str, column_name: &str) -> Vec<String> {
        let sequence_name = format!("{}_{}_seq", table_name, column_name);
        let quoted_table = self.quote(table_name);
        let quoted_column = self.quote(column_name);
        let quoted_sequence = self.quote(&sequence_name);

        vec![
            format!("CREATE SEQUENCE {}", quoted_sequence),
            format!(
                "SELECT setval({}, (SELECT COALESCE(MAX({}), 0) + 1 FROM {}), false)",
                quote_literal(&quoted_sequence),
                quoted_column,
                quoted_table
            ),
            format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT nextval({})",
                quoted_table,
                quoted_column,
                quote_literal(&quoted_sequence)
            ),
            format!(
                "ALTER SEQUENCE {} OWNED BY {}.{}",
                quoted_sequence, quoted_table, quoted_column
            ),
        ]
    }

    fn generate_comment(&self, table_name: &str, column: &Column) -> String {
        let comment = match &column.comment {
            Some(comment) => quote_literal(comment),
            None => "NULL".to_string(),
        };
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote(table_name),
            self.quote(&column.name),
            comment
        )
    }

    fn generate_primary_key_clause(&self, table_name: &str, name: &str, columns: &[String]) -> String {
        if is_default_primary_key_name(Platform::PostgreSQL.profile(), table_name, name) {
            format!("PRIMARY KEY ({})", self.quote_list(columns))
        } else {
            format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.quote(name),
                self.quote_list(columns)
            )
        }
    }
}

impl Default for PostgresSqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlGenerator for PostgresSqlGenerator {
    fn platform(&self) -> Platform {
        Platform::PostgreSQL
    }

    fn type_mapping(&self) -> &TypeMappingService {
        &self.type_mapping
    }

    fn generate_column_definition(&self, column: &Column) -> String {
        if column.autoincrement && column.column_type.is_integer() {
            return build_column_definition(
                &self.quote(&column.name),
                self.serial_type(column),
                column,
                None,
                &[],
            );
        }

        let default_sql = column
            .default
            .as_ref()
            .map(|d| self.type_mapping.format_default(d));
        build_column_definition(
            &self.quote(&column.name),
            self.type_mapping.to_sql_type(column),
            column,
            default_sql,
            &[],
        )
    }

    fn generate_create_table(&self, table: &Table) -> Vec<String> {
        let mut elements: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("    {}", self.generate_column_definition(c)))
            .collect();

        if let Some(pk) = &table.primary_key {
            elements.push(format!(
                "    {}",
                self.generate_primary_key_clause(&table.name, &pk.name, &pk.columns)
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote(&table.name),
            elements.join(",\n")
        )];

        for index in &table.indexes {
            statements.push(self.generate_create_index(&table.name, index));
        }

        for column in table.columns.iter().filter(|c| c.comment.is_some()) {
            statements.push(self.generate_comment(&table.name, column));
        }

        statements
    }

    fn generate_alter_column(&self, table_name: &str, column_diff: &ColumnDiff) -> Vec<String> {
        let quoted_table = self.quote(table_name);
        let quoted_column = self.quote(&column_diff.column_name);
        let new_column = &column_diff.new_column;
        let mut statements = Vec::new();

        let type_changed = column_diff.has_change(|c| {
            matches!(
                c,
                ColumnChange::TypeChanged { .. }
                    | ColumnChange::LengthChanged { .. }
                    | ColumnChange::PrecisionChanged { .. }
            )
        });
        if type_changed {
            let type_str = self.type_mapping.to_sql_type(new_column);
            statements.push(format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING {}::{}",
                quoted_table, quoted_column, type_str, quoted_column, type_str
            ));
        }

        for change in &column_diff.changes {
            match change {
                ColumnChange::NullableChanged { new_nullable, .. } => {
                    let action = if *new_nullable {
                        "DROP NOT NULL"
                    } else {
                        "SET NOT NULL"
                    };
                    statements.push(format!(
                        "ALTER TABLE {} ALTER COLUMN {} {}",
                        quoted_table, quoted_column, action
                    ));
                }
                ColumnChange::DefaultValueChanged { new_default, .. } if !new_column.autoincrement => {
                    let sql = match new_default {
                        Some(default) => format!(
                            "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                            quoted_table,
                            quoted_column,
                            self.type_mapping.format_default(default)
                        ),
                        None => format!(
                            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                            quoted_table, quoted_column
                        ),
                    };
                    statements.push(sql);
                }
                ColumnChange::AutoIncrementChanged {
                    new_autoincrement, ..
                } => {
                    if *new_autoincrement {
                        statements.extend(
                            self.generate_add_auto_increment(table_name, &column_diff.column_name),
                        );
                    } else {
                        statements.push(format!(
                            "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                            quoted_table, quoted_column
                        ));
                    }
                }
                ColumnChange::CommentChanged { .. } => {
                    statements.push(self.generate_comment(table_name, new_column));
                }
                _ => {}
            }
        }

        statements
    }

    fn generate_primary_key_change(
        &self,
        table_name: &str,
        change: &PrimaryKeyChange,
    ) -> Vec<String> {
        let quoted_table = self.quote(table_name);
        let mut statements = Vec::new();

        if let Some(old) = &change.old {
            let constraint = if is_default_primary_key_name(
                Platform::PostgreSQL.profile(),
                table_name,
                &old.name,
            ) {
                Platform::PostgreSQL
                    .profile()
                    .default_primary_key_name(table_name)
            } else {
                old.name.clone()
            };
            statements.push(format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                quoted_table,
                self.quote(&constraint)
            ));
        }

        if let Some(new) = &change.new {
            statements.push(format!(
                "ALTER TABLE {} ADD {}",
                quoted_table,
                self.generate_primary_key_clause(table_name, &new.name, &new.columns)
            ));
        }

        statements
    }
}

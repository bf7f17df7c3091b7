// Oracle用SQLジェネレーター
//
// スキーマ定義からOracle用のDDL文を生成します。
// 自動採番はシーケンスと BEFORE INSERT トリガーで実現します。

use crate::adapters::sql_generator::{is_default_primary_key_name, SqlGenerator};
use crate::adapters::type_mapping::common::quote_literal;
use crate::adapters::type_mapping::TypeMappingService;
use crate::core::platform::Platform;
use crate::core::schema::{Column, Schema, Table};
use crate::core::schema_diff::{ColumnChange, ColumnDiff, PrimaryKeyChange};

/// 自動採番用シーケンス名
pub fn auto_increment_sequence_name(table_name: &str) -> String {
    format!("{}_seq", table_name)
}

/// 自動採番用トリガー名
pub fn auto_increment_trigger_name(table_name: &str) -> String {
    format!("{}_ai_pk", table_name)
}

/// Oracle用SQLジェネレーター
#[derive(Debug, Clone)]
pub struct OracleSqlGenerator {
    type_mapping: TypeMappingService,
}

impl OracleSqlGenerator {
    /// 新しいOracleSqlGeneratorを作成
    pub fn new() -> Self {
        Self {
            type_mapping: TypeMappingService::new(Platform::Oracle),
        }
    }

    /// 自動採番用トリガーを生成
    fn generate_auto_increment_trigger(&self, table_name: &str, column_name: &str) -> String {
        format!(
            "CREATE OR REPLACE TRIGGER {} BEFORE INSERT ON {} FOR EACH ROW\n\
             BEGIN\n\
             \x20   IF :NEW.{} IS NULL THEN\n\
             \x20       SELECT {}.NEXTVAL INTO :NEW.{} FROM DUAL;\n\
             \x20   END IF;\n\
             END;",
            self.quote(&auto_increment_trigger_name(table_name)),
            self.quote(table_name),
            self.quote(column_name),
            self.quote(&auto_increment_sequence_name(table_name)),
            self.quote(column_name)
        )
    }

    fn generate_comment(&self, table_name: &str, column: &Column) -> String {
        let comment = quote_literal(column.comment.as_deref().unwrap_or(""));
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.quote(table_name),
            self.quote(&column.name),
            comment
        )
    }

    fn generate_primary_key_clause(&self, table_name: &str, name: &str, columns: &[String]) -> String {
        if is_default_primary_key_name(Platform::Oracle.profile(), table_name, name) {
            format!("PRIMARY KEY ({})", self.quote_list(columns))
        } else {
            format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                self.quote(name),
                self.quote_list(columns)
            )
        }
    }

    /// テーブル本体と自動採番オブジェクトを生成
    fn create_table_statements(&self, table: &Table, create_sequence: bool) -> Vec<String> {
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

        if let Some(column) = table.columns.iter().find(|c| c.autoincrement) {
            if create_sequence {
                statements.push(format!(
                    "CREATE SEQUENCE {} START WITH 1 MINVALUE 1 INCREMENT BY 1",
                    self.quote(&auto_increment_sequence_name(&table.name))
                ));
            }
            statements.push(self.generate_auto_increment_trigger(&table.name, &column.name));
        }

        for index in &table.indexes {
            statements.push(self.generate_create_index(&table.name, index));
        }

        for column in table.columns.iter().filter(|c| c.comment.is_some()) {
            statements.push(self.generate_comment(&table.name, column));
        }

        statements
    }
}

impl Default for OracleSqlGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlGenerator for OracleSqlGenerator {
    fn platform(&self) -> Platform {
        Platform::Oracle
    }

    fn type_mapping(&self) -> &TypeMappingService {
        &self.type_mapping
    }

    fn generate_create_table(&self, table: &Table) -> Vec<String> {
        self.create_table_statements(table, true)
    }

    fn generate_create_table_in(&self, table: &Table, target: &Schema) -> Vec<String> {
        // 同名のシーケンスが明示されていればそちらを使う
        let create_sequence = !target.has_sequence(&auto_increment_sequence_name(&table.name));
        self.create_table_statements(table, create_sequence)
    }

    fn generate_add_column(&self, table_name: &str, column: &Column) -> Vec<String> {
        let mut statements = vec![format!(
            "ALTER TABLE {} ADD ({})",
            self.quote(table_name),
            self.generate_column_definition(column)
        )];
        if column.comment.is_some() {
            statements.push(self.generate_comment(table_name, column));
        }
        statements
    }

    fn generate_alter_column(&self, table_name: &str, column_diff: &ColumnDiff) -> Vec<String> {
        let new_column = &column_diff.new_column;
        let mut parts = vec![self.quote(&new_column.name)];

        if column_diff.has_change(|c| {
            matches!(
                c,
                ColumnChange::TypeChanged { .. }
                    | ColumnChange::LengthChanged { .. }
                    | ColumnChange::PrecisionChanged { .. }
            )
        }) {
            parts.push(self.type_mapping.to_sql_type(new_column));
        }

        if column_diff.has_change(|c| matches!(c, ColumnChange::DefaultValueChanged { .. })) {
            let default_sql = new_column
                .default
                .as_ref()
                .map(|d| self.type_mapping.format_default(d))
                .unwrap_or_else(|| "NULL".to_string());
            parts.push(format!("DEFAULT {}", default_sql));
        }

        // Oracleは同じNULL制約への変更をエラーにするため、変更時のみ指定する
        if column_diff.has_change(|c| matches!(c, ColumnChange::NullableChanged { .. })) {
            parts.push(if new_column.nullable { "NULL" } else { "NOT NULL" }.to_string());
        }

        let mut statements = Vec::new();
        if parts.len() > 1 {
            statements.push(format!(
                "ALTER TABLE {} MODIFY ({})",
                self.quote(table_name),
                parts.join(" ")
            ));
        }

        if column_diff.adds_autoincrement() {
            let sequence = self.quote(&auto_increment_sequence_name(table_name));
            statements.push(format!(
                "DECLARE\n\
                 \x20   start_value NUMBER;\n\
                 BEGIN\n\
                 \x20   SELECT COALESCE(MAX({}), 0) + 1 INTO start_value FROM {};\n\
                 \x20   EXECUTE IMMEDIATE 'CREATE SEQUENCE {} START WITH ' || start_value || ' MINVALUE 1 INCREMENT BY 1';\n\
                 END;",
                self.quote(&new_column.name),
                self.quote(table_name),
                sequence.replace('\'', "''")
            ));
            statements.push(self.generate_auto_increment_trigger(table_name, &new_column.name));
        }

        if column_diff.has_change(|c| matches!(c, ColumnChange::CommentChanged { .. })) {
            statements.push(self.generate_comment(table_name, new_column));
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

        if change.old.is_some() {
            statements.push(format!("ALTER TABLE {} DROP PRIMARY KEY", quoted_table));
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

    fn generate_drop_column(&self, table_name: &str, column_name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP ({})",
            self.quote(table_name),
            self.quote(column_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnDefault, ColumnType};

    #[test]
    fn test_create_table_with_auto_increment_sequence_and_trigger() {
        let generator = OracleSqlGenerator::new();
        let mut table = Table::new("oc_jobs");
        table
            .add_column(Column::new("id", ColumnType::BIGINT, false).with_autoincrement())
            .unwrap();
        table
            .add_column(Column::new("enabled", ColumnType::BOOLEAN, true))
            .unwrap();
        table.set_primary_key(&["id"], None).unwrap();

        let statements = generator.generate_create_table(&table);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains(r#""id" NUMBER(20) NOT NULL"#));
        assert!(statements[0].contains(r#""enabled" NUMBER(1)"#));
        assert!(statements[0].contains(r#"PRIMARY KEY ("id")"#));
        assert!(statements[1].starts_with(r#"CREATE SEQUENCE "oc_jobs_seq""#));
        assert!(statements[2].contains(r#"BEFORE INSERT ON "oc_jobs""#));
        assert!(statements[2].contains(r#""oc_jobs_seq".NEXTVAL"#));
    }

    #[test]
    fn test_explicit_sequence_replaces_implicit_one() {
        use crate::adapters::sql_generator::generate_migration_script;
        use crate::core::schema::Sequence;
        use crate::core::schema_diff::SchemaDiff;

        let mut table = Table::new("oc_jobs");
        table
            .add_column(Column::new("id", ColumnType::BIGINT, false).with_autoincrement())
            .unwrap();
        table.set_primary_key(&["id"], None).unwrap();
        let mut sequence = Sequence::new("oc_jobs_seq").owned_by("oc_jobs", "id");
        sequence.start = 100;

        let mut target = Schema::new();
        target.add_table(table.clone());
        target.create_sequence(sequence.clone()).unwrap();
        let mut diff = SchemaDiff::new();
        diff.added_tables.push(table);
        diff.added_sequences.push(sequence);

        let statements =
            generate_migration_script(&OracleSqlGenerator::new(), &diff, &Schema::new(), &target);
        let sequences: Vec<&String> = statements
            .iter()
            .filter(|s| s.starts_with("CREATE SEQUENCE"))
            .collect();
        assert_eq!(sequences.len(), 1);
        assert!(sequences[0].contains("START WITH 100"));
        assert!(statements.iter().any(|s| s.contains(r#""oc_jobs_seq".NEXTVAL"#)));
    }

    #[test]
    fn test_alter_column_only_changed_parts() {
        let generator = OracleSqlGenerator::new();
        let old = Column::new("name", ColumnType::STRING, false).with_length(64);
        let new = old.clone().with_default(ColumnDefault::Text("x".to_string()));

        let statements = generator.generate_alter_column("oc_users", &ColumnDiff::new(old, new));
        assert_eq!(
            statements,
            vec![r#"ALTER TABLE "oc_users" MODIFY ("name" DEFAULT 'x')"#]
        );
    }

    #[test]
    fn test_alter_column_add_auto_increment() {
        let generator = OracleSqlGenerator::new();
        let old = Column::new("id", ColumnType::INTEGER, false);
        let new = old.clone().with_autoincrement();

        let statements = generator.generate_alter_column("oc_jobs", &ColumnDiff::new(old, new));
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("COALESCE(MAX(\"id\"), 0) + 1"));
        assert!(statements[1].contains("BEFORE INSERT"));
    }

    #[test]
    fn test_drop_column_syntax() {
        let generator = OracleSqlGenerator::new();
        assert_eq!(
            generator.generate_drop_column("oc_users", "legacy"),
            r#"ALTER TABLE "oc_users" DROP ("legacy")"#
        );
    }
}

// SQLiteテーブル再作成
//
// SQLiteは型変更やカラム削除、制約の変更をALTER TABLEで行えないため、
// 新テーブルを作成してデータをコピーし、置き換える手順で実現します。

use std::collections::HashMap;

use crate::adapters::sql_generator::sqlite::SqliteSqlGenerator;
use crate::adapters::sql_generator::SqlGenerator;
use crate::core::schema::{Column, ColumnType, Table};

/// SQLiteテーブル再作成
pub struct SqliteTableRecreator<'a> {
    generator: &'a SqliteSqlGenerator,
}

impl<'a> SqliteTableRecreator<'a> {
    pub fn new(generator: &'a SqliteSqlGenerator) -> Self {
        Self { generator }
    }

    /// テーブル再作成SQLを生成
    ///
    /// # Returns
    /// 以下の順序のSQL文:
    /// 1. PRAGMA defer_foreign_keys = ON
    /// 2. CREATE TABLE "new_<table>"（外部キーを含む新定義）
    /// 3. INSERT INTO "new_<table>" SELECT ... FROM "<table>"（共通カラムのみ）
    /// 4. DROP TABLE "<table>"
    /// 5. ALTER TABLE "new_<table>" RENAME TO "<table>"
    /// 6. インデックス再作成
    ///
    /// トランザクションの開始と終了は呼び出し側が管理します。
    pub fn generate_table_recreation(&self, old_table: &Table, new_table: &Table) -> Vec<String> {
        let table_name = &new_table.name;
        let temporary_name = format!("new_{}", table_name);
        let quoted_table = self.generator.quote(table_name);
        let quoted_temporary = self.generator.quote(&temporary_name);

        let mut statements = vec![
            "PRAGMA defer_foreign_keys = ON".to_string(),
            self.generator
                .generate_create_table_named(new_table, &temporary_name),
        ];

        if let Some(copy_sql) = self.generate_data_copy(old_table, new_table, &quoted_temporary) {
            statements.push(copy_sql);
        }

        statements.push(format!("DROP TABLE {}", quoted_table));
        statements.push(format!(
            "ALTER TABLE {} RENAME TO {}",
            quoted_temporary, quoted_table
        ));

        for index in &new_table.indexes {
            statements.push(self.generator.generate_create_index(table_name, index));
        }

        statements
    }

    /// データコピーSQLを生成
    ///
    /// 新旧両方に存在するカラムをコピーし、NOT NULLになるカラムは
    /// デフォルト値かフォールバック値で埋めます。
    /// 新しく追加されたNOT NULLカラムも同様に埋めます。
    fn generate_data_copy(
        &self,
        old_table: &Table,
        new_table: &Table,
        quoted_temporary: &str,
    ) -> Option<String> {
        let old_columns: HashMap<&str, &Column> = old_table
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();

        let mut insert_columns = Vec::new();
        let mut select_expressions = Vec::new();

        for column in &new_table.columns {
            let quoted = self.generator.quote(&column.name);
            let expression = match old_columns.get(column.name.as_str()) {
                Some(old) if old.nullable && !column.nullable => {
                    format!("COALESCE({}, {})", quoted, self.fill_value(column))
                }
                Some(_) => quoted.clone(),
                None if column.nullable || column.autoincrement => continue,
                None => self.fill_value(column),
            };
            insert_columns.push(quoted);
            select_expressions.push(expression);
        }

        if insert_columns.is_empty() {
            return None;
        }

        Some(format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            quoted_temporary,
            insert_columns.join(", "),
            select_expressions.join(", "),
            self.generator.quote(&old_table.name)
        ))
    }

    /// NOT NULLカラムを埋める値（デフォルト値優先）
    fn fill_value(&self, column: &Column) -> String {
        match &column.default {
            Some(default) => self.generator.type_mapping().format_default(default),
            None => fallback_value(column.column_type).to_string(),
        }
    }
}

/// 型ごとのフォールバック値
fn fallback_value(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::SMALLINT
        | ColumnType::INTEGER
        | ColumnType::BIGINT
        | ColumnType::BOOLEAN
        | ColumnType::DECIMAL
        | ColumnType::FLOAT => "0",
        ColumnType::STRING | ColumnType::TEXT => "''",
        ColumnType::JSON => "'{}'",
        ColumnType::DATE => "'1970-01-01'",
        ColumnType::TIME => "'00:00:00'",
        ColumnType::DATETIME => "'1970-01-01 00:00:00'",
        ColumnType::BLOB => "X''",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::ColumnDefault;

    fn users_table() -> Table {
        let mut table = Table::new("oc_users");
        table
            .add_column(Column::new("uid", ColumnType::STRING, false).with_length(64))
            .unwrap();
        table
            .add_column(Column::new("displayname", ColumnType::STRING, true).with_length(64))
            .unwrap();
        table
            .add_column(Column::new("legacy", ColumnType::INTEGER, true))
            .unwrap();
        table.set_primary_key(&["uid"], None).unwrap();
        table.add_index("user_displayname", &["displayname"]).unwrap();
        table
    }

    #[test]
    fn test_recreation_statement_order() {
        let generator = SqliteSqlGenerator::new();
        let old = users_table();
        let mut new = old.clone();
        new.drop_column("legacy").unwrap();

        let statements = SqliteTableRecreator::new(&generator).generate_table_recreation(&old, &new);
        assert_eq!(statements[0], "PRAGMA defer_foreign_keys = ON");
        assert!(statements[1].starts_with(r#"CREATE TABLE "new_oc_users""#));
        assert_eq!(
            statements[2],
            r#"INSERT INTO "new_oc_users" ("uid", "displayname") SELECT "uid", "displayname" FROM "oc_users""#
        );
        assert_eq!(statements[3], r#"DROP TABLE "oc_users""#);
        assert_eq!(statements[4], r#"ALTER TABLE "new_oc_users" RENAME TO "oc_users""#);
        assert_eq!(
            statements[5],
            r#"CREATE INDEX "user_displayname" ON "oc_users" ("displayname")"#
        );
        assert!(!statements.iter().any(|s| s.contains("BEGIN") || s.contains("COMMIT")));
    }

    #[test]
    fn test_becoming_not_null_is_coalesced() {
        let generator = SqliteSqlGenerator::new();
        let old = users_table();
        let mut new = old.clone();
        new.replace_column(
            Column::new("displayname", ColumnType::STRING, false)
                .with_length(64)
                .with_default(ColumnDefault::Text("anon".to_string())),
        )
        .unwrap();
        new.replace_column(Column::new("legacy", ColumnType::INTEGER, false))
            .unwrap();

        let statements = SqliteTableRecreator::new(&generator).generate_table_recreation(&old, &new);
        assert!(statements[2].contains(r#"COALESCE("displayname", 'anon')"#));
        assert!(statements[2].contains(r#"COALESCE("legacy", 0)"#));
    }

    #[test]
    fn test_new_not_null_column_gets_fallback() {
        let generator = SqliteSqlGenerator::new();
        let old = users_table();
        let mut new = old.clone();
        new.add_column(Column::new("created", ColumnType::DATETIME, false))
            .unwrap();
        new.add_column(Column::new("note", ColumnType::TEXT, true))
            .unwrap();

        let statements = SqliteTableRecreator::new(&generator).generate_table_recreation(&old, &new);
        assert!(statements[2].contains(r#""created") SELECT"#));
        assert!(statements[2].contains("'1970-01-01 00:00:00' FROM"));
        assert!(!statements[2].contains(r#""note""#));
    }
}

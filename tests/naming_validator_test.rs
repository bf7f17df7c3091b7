/// 命名・制約バリデーターのテスト
///
/// 識別子長の境界、既存オブジェクトの除外、プラットフォーム固有の修復を確認します。

#[cfg(test)]
mod naming_validator_tests {
    use proptest::prelude::*;
    use schemata::core::error::{SchemaObjectKind, ValidationError};
    use schemata::core::platform::Platform;
    use schemata::core::schema::{Column, ColumnDefault, ColumnType, Schema, Table};
    use schemata::services::naming_validator::{repair_boolean_columns, NamingValidator};

    fn table_with_column(table: &str, column: &str) -> Table {
        let mut t = Table::new(table);
        t.add_column(Column::new(column, ColumnType::INTEGER, true))
            .unwrap();
        t
    }

    fn schema_of(tables: Vec<Table>) -> Schema {
        let mut schema = Schema::new();
        for table in tables {
            schema.add_table(table);
        }
        schema
    }

    fn platform_strategy() -> impl Strategy<Value = Platform> {
        prop::sample::select(Platform::ALL.to_vec())
    }

    // ==========================================
    // 識別子長の境界
    // ==========================================

    proptest! {
        #[test]
        fn prop_new_table_length_includes_prefix(
            platform in platform_strategy(),
            table in "[a-z]{1,70}",
            prefix_length in 0usize..8,
        ) {
            let validator = NamingValidator::new(platform.profile());
            let target = schema_of(vec![table_with_column(&table, "id")]);
            let result = validator.ensure_naming_constraints(&Schema::new(), &target, prefix_length);

            let max = platform.profile().max_identifier_length();
            if table.len() + prefix_length <= max {
                prop_assert!(result.is_ok());
            } else {
                let is_table_violation = matches!(
                    result,
                    Err(ValidationError::NamingConstraintViolation { kind: SchemaObjectKind::Table, .. })
                );
                prop_assert!(is_table_violation);
            }
        }

        #[test]
        fn prop_column_length_excludes_prefix(
            platform in platform_strategy(),
            column in "[a-z]{1,70}",
        ) {
            let validator = NamingValidator::new(platform.profile());
            let target = schema_of(vec![table_with_column("t", &column)]);
            let result = validator.ensure_naming_constraints(&Schema::new(), &target, 3);

            let max = platform.profile().max_identifier_length();
            prop_assert_eq!(result.is_ok(), column.len() <= max);
        }

        #[test]
        fn prop_existing_objects_are_grandfathered(
            platform in platform_strategy(),
            table in "[a-z]{65,80}",
            column in "[a-z]{65,80}",
        ) {
            let validator = NamingValidator::new(platform.profile());
            let schema = schema_of(vec![table_with_column(&table, &column)]);
            let result = validator.ensure_naming_constraints(&schema, &schema, 3);
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn test_renamed_column_is_a_new_identifier() {
        let validator = NamingValidator::new(Platform::Oracle.profile());
        let source = schema_of(vec![table_with_column("t", "short")]);

        let mut renamed = Table::new("t");
        renamed
            .add_column(Column::new(&"x".repeat(31), ColumnType::INTEGER, true))
            .unwrap();
        let target = schema_of(vec![renamed]);

        let error = validator
            .ensure_naming_constraints(&source, &target, 3)
            .unwrap_err();
        assert!(matches!(
            error,
            ValidationError::NamingConstraintViolation {
                kind: SchemaObjectKind::Column,
                length: 31,
                max: 30,
                ..
            }
        ));
    }

    #[test]
    fn test_default_primary_key_name_counts_prefix_on_postgres() {
        let validator = NamingValidator::new(Platform::PostgreSQL.profile());
        // "<56文字>_pkey" = 61文字、プレフィックス3文字を加えると64文字
        let name = "p".repeat(56);
        let mut table = table_with_column(&name, "id");
        table.set_primary_key(&["id"], None).unwrap();
        let target = schema_of(vec![table]);

        let error = validator
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap_err();
        assert!(matches!(
            error,
            ValidationError::NamingConstraintViolation {
                kind: SchemaObjectKind::PrimaryKey,
                ..
            }
        ));

        // MySQLの既定名 PRIMARY はテーブル名を含まない
        let mysql = NamingValidator::new(Platform::MySQL.profile());
        assert!(mysql
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .is_ok());
    }

    #[test]
    fn test_table_without_primary_key_warns() {
        let validator = NamingValidator::new(Platform::SQLite.profile());
        let target = schema_of(vec![table_with_column("log", "line")]);

        let report = validator
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("log"));
    }

    // ==========================================
    // Oracle固有の制約
    // ==========================================

    #[test]
    fn test_oracle_string_length_limit() {
        let validator = NamingValidator::new(Platform::Oracle.profile());
        let mut table = Table::new("notes");
        table
            .add_column(Column::new("body", ColumnType::STRING, true).with_length(4001))
            .unwrap();
        let target = schema_of(vec![table.clone()]);

        assert!(matches!(
            validator.ensure_naming_constraints(&Schema::new(), &target, 3),
            Err(ValidationError::UnsupportedColumnLength { length: 4001, max: 4000, .. })
        ));

        // 長さが変わらない既存カラムは対象外
        assert!(validator
            .ensure_naming_constraints(&target, &target, 3)
            .is_ok());

        let postgres = NamingValidator::new(Platform::PostgreSQL.profile());
        assert!(postgres
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .is_ok());
    }

    #[test]
    fn test_oracle_auto_increment_trigger_name_counts_prefix() {
        let validator = NamingValidator::new(Platform::Oracle.profile());
        // プレフィックス3文字 + 22文字 + "_ai_pk" = 31文字
        let name = "j".repeat(22);
        let mut table = Table::new(&name);
        table
            .add_column(Column::new("id", ColumnType::BIGINT, false).with_autoincrement())
            .unwrap();
        table.set_primary_key(&["id"], None).unwrap();
        let target = schema_of(vec![table]);

        assert!(matches!(
            validator.ensure_naming_constraints(&Schema::new(), &target, 3),
            Err(ValidationError::NamingConstraintViolation {
                kind: SchemaObjectKind::Trigger,
                length: 31,
                max: 30,
                ..
            })
        ));

        // 既存の自動採番カラムは対象外
        assert!(validator
            .ensure_naming_constraints(&target, &target, 3)
            .is_ok());

        let postgres = NamingValidator::new(Platform::PostgreSQL.profile());
        assert!(postgres
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .is_ok());
    }

    #[test]
    fn test_oracle_empty_string_default_not_null() {
        let validator = NamingValidator::new(Platform::Oracle.profile());
        let mut table = Table::new("tags");
        table
            .add_column(
                Column::new("label", ColumnType::STRING, false)
                    .with_length(64)
                    .with_default(ColumnDefault::Text(String::new())),
            )
            .unwrap();
        let target = schema_of(vec![table]);

        assert!(matches!(
            validator.ensure_naming_constraints(&Schema::new(), &target, 3),
            Err(ValidationError::EmptyStringNotNull { .. })
        ));
    }

    #[test]
    fn test_boolean_repair_on_every_platform() {
        let mut table = Table::new("flags");
        table
            .add_column(Column::new("enabled", ColumnType::BOOLEAN, false))
            .unwrap();
        let target = schema_of(vec![table]);

        for platform in Platform::ALL {
            let (repaired, repairs) = repair_boolean_columns(platform.profile(), &target);
            let column = repaired
                .get_table("flags")
                .unwrap()
                .get_column("enabled")
                .unwrap()
                .clone();

            if platform == Platform::Oracle {
                assert_eq!(repairs.len(), 1, "{platform}");
                assert!(column.nullable, "{platform}");
            } else {
                assert!(repairs.is_empty(), "{platform}");
                assert!(!column.nullable, "{platform}");
            }
        }
    }

    #[test]
    fn test_validation_report_carries_repairs() {
        let validator = NamingValidator::new(Platform::Oracle.profile());
        let mut table = Table::new("flags");
        table
            .add_column(Column::new("enabled", ColumnType::BOOLEAN, false))
            .unwrap();
        table.set_primary_key(&["enabled"], None).unwrap();
        let target = schema_of(vec![table]);

        let report = validator
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap();
        assert!(report.has_repairs());
        assert_eq!(report.repairs[0].to_string(), "\"flags\".\"enabled\": NOT NULL boolean made nullable");
    }
}

// 命名・制約バリデーター
//
// 目標スキーマの識別子長とプラットフォーム固有の型制約を検証します。
// 既存のオブジェクトは以前のスキーマとの比較により除外されます。
// 接続には一切触れません。

use std::fmt;

use crate::adapters::sql_generator::is_default_primary_key_name;
use crate::adapters::sql_generator::oracle::{
    auto_increment_sequence_name, auto_increment_trigger_name,
};
use crate::core::error::{SchemaObjectKind, ValidationError};
use crate::core::platform::PlatformProfile;
use crate::core::schema::{Column, ColumnDefault, ColumnType, Schema, Table};

/// 自動修復の記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    /// テーブル名
    pub table: String,
    /// カラム名
    pub column: String,
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\".\"{}\": NOT NULL boolean made nullable",
            self.table, self.column
        )
    }
}

/// 検証結果
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// 修復済みの目標スキーマ
    pub schema: Schema,
    /// 適用した修復
    pub repairs: Vec<Repair>,
    /// 警告
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// 修復済みスキーマを取り出す
    pub fn into_schema(self) -> Schema {
        self.schema
    }

    /// 修復が行われたかどうか
    pub fn has_repairs(&self) -> bool {
        !self.repairs.is_empty()
    }
}

/// 命名・制約バリデーター
#[derive(Debug, Clone, Copy)]
pub struct NamingValidator {
    profile: PlatformProfile,
}

impl NamingValidator {
    pub fn new(profile: PlatformProfile) -> Self {
        Self { profile }
    }

    /// 目標スキーマを検証し、必要な修復を適用する
    ///
    /// # Arguments
    /// * `source` - 変更前のスキーマ（論理名）
    /// * `target` - 目標スキーマ（論理名）
    /// * `prefix_length` - テーブルプレフィックスのバイト長
    ///
    /// # Returns
    /// 修復済みスキーマと修復・警告の一覧
    pub fn ensure_naming_constraints(
        &self,
        source: &Schema,
        target: &Schema,
        prefix_length: usize,
    ) -> Result<ValidationReport, ValidationError> {
        let mut warnings = Vec::new();

        for table in target.tables.values() {
            // 未検出は新規テーブルを意味する
            let source_table = source.get_table(&table.name).ok();

            if source_table.is_none() {
                self.check_length(
                    SchemaObjectKind::Table,
                    &table.name,
                    table.name.len() + prefix_length,
                )?;
                if !table.has_primary_key() {
                    tracing::warn!(table = %table.name, "Table is created without a primary key");
                    warnings.push(format!("Table \"{}\" has no primary key", table.name));
                }
            }

            self.check_primary_key(table, source_table, prefix_length)?;
            self.check_auto_increment_objects(table, source_table, prefix_length)?;
            self.check_table_objects(table, source_table)?;
            self.check_column_constraints(table, source_table)?;
        }

        for sequence in target.sequences.values() {
            if !source.has_sequence(&sequence.name) {
                self.check_length(
                    SchemaObjectKind::Sequence,
                    &sequence.name,
                    sequence.name.len() + prefix_length,
                )?;
            }
        }

        let (schema, repairs) = repair_boolean_columns(self.profile, target);
        Ok(ValidationReport {
            schema,
            repairs,
            warnings,
        })
    }

    fn check_length(
        &self,
        kind: SchemaObjectKind,
        name: &str,
        length: usize,
    ) -> Result<(), ValidationError> {
        let max = self.profile.max_identifier_length();
        if length > max {
            return Err(ValidationError::NamingConstraintViolation {
                kind,
                name: name.to_string(),
                length,
                max,
            });
        }
        Ok(())
    }

    fn check_primary_key(
        &self,
        table: &Table,
        source_table: Option<&Table>,
        prefix_length: usize,
    ) -> Result<(), ValidationError> {
        let Some(primary_key) = table.primary_key() else {
            return Ok(());
        };
        let source_primary_key = source_table.and_then(|t| t.primary_key());

        if is_default_primary_key_name(self.profile, &table.name, &primary_key.name) {
            if source_primary_key.is_some() {
                return Ok(());
            }
            let synthesized = self.profile.default_primary_key_name(&table.name);
            let mut length = synthesized.len();
            if self.profile.primary_key_name_embeds_table() {
                length += prefix_length;
            }
            return self.check_length(SchemaObjectKind::PrimaryKey, &synthesized, length);
        }

        let existed = source_primary_key.is_some_and(|pk| pk.name == primary_key.name);
        if existed {
            return Ok(());
        }
        self.check_length(
            SchemaObjectKind::PrimaryKey,
            &primary_key.name,
            primary_key.name.len(),
        )
    }

    /// 自動採番用に暗黙的に作られるシーケンスとトリガーの名前を検証
    fn check_auto_increment_objects(
        &self,
        table: &Table,
        source_table: Option<&Table>,
        prefix_length: usize,
    ) -> Result<(), ValidationError> {
        if !self.profile.needs_explicit_sequences() {
            return Ok(());
        }
        let Some(column) = table.columns.iter().find(|c| c.autoincrement) else {
            return Ok(());
        };
        let existed = source_table
            .and_then(|t| t.get_column(&column.name).ok())
            .is_some_and(|c| c.autoincrement);
        if existed {
            return Ok(());
        }

        let sequence = auto_increment_sequence_name(&table.name);
        self.check_length(
            SchemaObjectKind::Sequence,
            &sequence,
            sequence.len() + prefix_length,
        )?;
        let trigger = auto_increment_trigger_name(&table.name);
        self.check_length(
            SchemaObjectKind::Trigger,
            &trigger,
            trigger.len() + prefix_length,
        )
    }

    fn check_table_objects(
        &self,
        table: &Table,
        source_table: Option<&Table>,
    ) -> Result<(), ValidationError> {
        for column in &table.columns {
            if !source_table.is_some_and(|t| t.has_column(&column.name)) {
                self.check_length(SchemaObjectKind::Column, &column.name, column.name.len())?;
            }
        }

        for index in &table.indexes {
            if !source_table.is_some_and(|t| t.has_index(&index.name)) {
                self.check_length(SchemaObjectKind::Index, &index.name, index.name.len())?;
            }
        }

        for foreign_key in &table.foreign_keys {
            if !source_table.is_some_and(|t| t.has_foreign_key(&foreign_key.name)) {
                self.check_length(
                    SchemaObjectKind::ForeignKey,
                    &foreign_key.name,
                    foreign_key.name.len(),
                )?;
            }
        }

        Ok(())
    }

    fn check_column_constraints(
        &self,
        table: &Table,
        source_table: Option<&Table>,
    ) -> Result<(), ValidationError> {
        for column in &table.columns {
            let previous = source_table.and_then(|t| t.get_column(&column.name).ok());

            if let Some(max) = self.profile.max_string_length() {
                let length_changed = previous.map_or(true, |p| p.length != column.length);
                if is_string_like(column.column_type) && length_changed {
                    if let Some(length) = column.length.filter(|l| *l > max) {
                        return Err(ValidationError::UnsupportedColumnLength {
                            table: table.name.clone(),
                            column: column.name.clone(),
                            length,
                            max,
                        });
                    }
                }
            }

            if self.profile.empty_string_is_null()
                && previous.is_none()
                && is_string_like(column.column_type)
                && !column.nullable
                && column.default == Some(ColumnDefault::Text(String::new()))
            {
                return Err(ValidationError::EmptyStringNotNull {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
        Ok(())
    }
}

fn is_string_like(column_type: ColumnType) -> bool {
    matches!(column_type, ColumnType::STRING | ColumnType::TEXT)
}

/// NOT NULL の真偽値カラムを NULL 許可に置き換えたスキーマを返す
///
/// 真偽値の NOT NULL を表現できないプラットフォームでのみ修復します。
pub fn repair_boolean_columns(profile: PlatformProfile, target: &Schema) -> (Schema, Vec<Repair>) {
    let mut schema = target.clone();
    let mut repairs = Vec::new();
    if profile.boolean_not_null_supported() {
        return (schema, repairs);
    }

    for table in schema.tables.values_mut() {
        let repaired: Vec<Column> = table
            .columns
            .iter()
            .map(|column| {
                if column.column_type == ColumnType::BOOLEAN && !column.nullable {
                    repairs.push(Repair {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                    column.clone().with_nullable(true)
                } else {
                    column.clone()
                }
            })
            .collect();
        table.columns = repaired;
    }

    (schema, repairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::Platform;
    use crate::core::schema::Sequence;

    fn validator(platform: Platform) -> NamingValidator {
        NamingValidator::new(platform.profile())
    }

    fn schema_with_table(name: &str) -> Schema {
        let mut schema = Schema::new();
        let table = schema.create_table(name).unwrap();
        table
            .add_column(Column::new("id", ColumnType::INTEGER, false))
            .unwrap();
        table.set_primary_key(&["id"], None).unwrap();
        schema
    }

    // =========================================================================
    // 識別子長
    // =========================================================================

    #[test]
    fn test_table_name_includes_prefix() {
        // Oracle: 最大30
        let target = schema_with_table(&"t".repeat(27));
        let result = validator(Platform::MySQL).ensure_naming_constraints(&Schema::new(), &target, 3);
        assert!(result.is_ok());

        let result = validator(Platform::Oracle).ensure_naming_constraints(&Schema::new(), &target, 4);
        assert!(matches!(
            result,
            Err(ValidationError::NamingConstraintViolation { length: 31, max: 30, .. })
        ));
    }

    #[test]
    fn test_existing_table_is_grandfathered() {
        let name = "t".repeat(40);
        let source = schema_with_table(&name);
        let target = source.clone();
        let result =
            validator(Platform::Oracle).ensure_naming_constraints(&source, &target, 3);
        assert!(result.is_ok());
    }

    #[test]
    fn test_new_long_column_rejected() {
        let mut target = schema_with_table("t");
        target
            .get_table_mut("t")
            .unwrap()
            .add_column(Column::new(&"c".repeat(31), ColumnType::INTEGER, true))
            .unwrap();
        let err = validator(Platform::Oracle)
            .ensure_naming_constraints(&schema_with_table("t"), &target, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NamingConstraintViolation { kind: SchemaObjectKind::Column, .. }
        ));
    }

    #[test]
    fn test_default_primary_key_uses_synthesized_name() {
        // PostgreSQL: "<table>_pkey" + プレフィックス
        let table_name = "t".repeat(56);
        let target = schema_with_table(&table_name);
        let err = validator(Platform::PostgreSQL)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap_err();
        match err {
            ValidationError::NamingConstraintViolation { kind, length, .. } => {
                assert_eq!(kind, SchemaObjectKind::PrimaryKey);
                assert_eq!(length, 56 + 5 + 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        // MySQL の "PRIMARY" はテーブル名を含まない
        assert!(validator(Platform::MySQL)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .is_ok());
    }

    #[test]
    fn test_new_sequence_includes_prefix() {
        let mut target = Schema::new();
        target.create_sequence(Sequence::new(&"s".repeat(28))).unwrap();
        let err = validator(Platform::Oracle)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap_err();
        assert!(err.is_naming_constraint_violation());
    }

    // =========================================================================
    // Oracle固有の制約
    // =========================================================================

    #[test]
    fn test_oracle_boolean_repair_is_pure() {
        let mut target = schema_with_table("t");
        target
            .get_table_mut("t")
            .unwrap()
            .add_column(Column::new("flag", ColumnType::BOOLEAN, false))
            .unwrap();

        let report = validator(Platform::Oracle)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap();
        assert_eq!(report.repairs.len(), 1);
        assert!(report.schema.get_table("t").unwrap().get_column("flag").unwrap().nullable);
        // 入力は変更されない
        assert!(!target.get_table("t").unwrap().get_column("flag").unwrap().nullable);
    }

    #[test]
    fn test_oracle_long_string_rejected_only_when_changed() {
        let mut target = schema_with_table("t");
        target
            .get_table_mut("t")
            .unwrap()
            .add_column(Column::new("body", ColumnType::STRING, true).with_length(4001))
            .unwrap();

        let err = validator(Platform::Oracle)
            .ensure_naming_constraints(&schema_with_table("t"), &target, 3)
            .unwrap_err();
        assert!(err.is_unsupported_column_length());

        // 既に同じ長さで存在する場合は対象外
        let result =
            validator(Platform::Oracle).ensure_naming_constraints(&target, &target, 3);
        assert!(result.is_ok());

        assert!(validator(Platform::PostgreSQL)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .is_ok());
    }

    #[test]
    fn test_oracle_empty_string_not_null() {
        let mut target = schema_with_table("t");
        target
            .get_table_mut("t")
            .unwrap()
            .add_column(
                Column::new("name", ColumnType::STRING, false)
                    .with_length(64)
                    .with_default(ColumnDefault::Text(String::new())),
            )
            .unwrap();

        let err = validator(Platform::Oracle)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyStringNotNull { .. }));
        assert!(validator(Platform::MySQL)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .is_ok());
    }

    #[test]
    fn test_table_without_primary_key_warns() {
        let mut target = Schema::new();
        target
            .create_table("log")
            .unwrap()
            .add_column(Column::new("line", ColumnType::TEXT, true))
            .unwrap();
        let report = validator(Platform::SQLite)
            .ensure_naming_constraints(&Schema::new(), &target, 3)
            .unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(!report.has_repairs());
    }
}

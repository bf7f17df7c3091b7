// スキーマ差分検出サービス
//
// 2つのスキーマ間の差分を検出するサービス。
// イントロスペクション結果と宣言されたスキーマの表現差を吸収するため、
// 比較はプラットフォームプロファイルで正規化した形で行います。

use std::collections::HashSet;

use crate::adapters::type_mapping::common::{
    DEFAULT_DECIMAL_PRECISION, DEFAULT_DECIMAL_SCALE, DEFAULT_STRING_LENGTH,
};
use crate::core::platform::{Platform, PlatformProfile};
use crate::core::schema::{Column, ColumnType, Schema, Table};
use crate::core::schema_diff::{ColumnDiff, PrimaryKeyChange, SchemaDiff, TableDiff};

/// 差分検出のオプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// 目標スキーマに存在しないテーブルとシーケンスを削除対象にする
    pub drop_missing_tables: bool,
}

/// スキーマ差分検出サービス
#[derive(Debug, Clone, Default)]
pub struct SchemaDiffDetector {}

impl SchemaDiffDetector {
    /// 新しいSchemaDiffDetectorを作成
    pub fn new() -> Self {
        Self {}
    }

    /// スキーマ差分を検出
    ///
    /// # Arguments
    ///
    /// * `current` - 現在のスキーマ
    /// * `target` - 目標スキーマ
    /// * `profile` - 正規化に使うプラットフォームプロファイル
    /// * `options` - 削除の扱い
    ///
    /// # Returns
    ///
    /// スキーマ差分
    pub fn detect(
        &self,
        current: &Schema,
        target: &Schema,
        profile: PlatformProfile,
        options: &DiffOptions,
    ) -> SchemaDiff {
        let mut diff = SchemaDiff::new();

        // 追加されたテーブル（依存順）
        let mut added = SchemaDiff::new();
        for table in target.tables.values() {
            if !current.has_table(&table.name) {
                added.added_tables.push(table.clone());
            }
        }
        diff.added_tables = added.sort_added_tables_by_dependency();

        // 削除されたテーブル（明示的に要求されたもののみ）
        for name in current.tables.keys() {
            if target.has_table(name) {
                continue;
            }
            if options.drop_missing_tables || target.dropped_tables.contains(name) {
                diff.removed_tables.push(name.clone());
            }
        }

        // 変更されたテーブル
        for new_table in target.tables.values() {
            if let Ok(old_table) = current.get_table(&new_table.name) {
                let table_diff = self.detect_table_diff(old_table, new_table, profile);
                if !table_diff.is_empty() {
                    diff.modified_tables.push(table_diff);
                }
            }
        }

        if profile.supports_sequences() {
            self.detect_sequence_diff(current, target, options, &mut diff);
        }

        diff
    }

    fn detect_sequence_diff(
        &self,
        current: &Schema,
        target: &Schema,
        options: &DiffOptions,
        diff: &mut SchemaDiff,
    ) {
        for sequence in target.sequences.values() {
            if !current.has_sequence(&sequence.name) {
                diff.added_sequences.push(sequence.clone());
            }
        }

        for name in current.sequences.keys() {
            if target.has_sequence(name) {
                continue;
            }
            if options.drop_missing_tables || target.dropped_sequences.contains(name) {
                diff.removed_sequences.push(name.clone());
            }
        }
    }

    /// テーブル差分を検出
    fn detect_table_diff(
        &self,
        old_table: &Table,
        new_table: &Table,
        profile: PlatformProfile,
    ) -> TableDiff {
        let mut table_diff = TableDiff::new(&new_table.name);

        self.detect_column_diff(old_table, new_table, profile, &mut table_diff);
        self.detect_primary_key_diff(old_table, new_table, &mut table_diff);
        self.detect_index_diff(old_table, new_table, &mut table_diff);
        self.detect_foreign_key_diff(old_table, new_table, &mut table_diff);

        table_diff
    }

    /// カラム差分を検出
    fn detect_column_diff(
        &self,
        old_table: &Table,
        new_table: &Table,
        profile: PlatformProfile,
        table_diff: &mut TableDiff,
    ) {
        for new_column in &new_table.columns {
            match old_table.get_column(&new_column.name) {
                Ok(old_column) => {
                    let column_diff = ColumnDiff::new(
                        normalize_column(
                            profile,
                            old_column,
                            old_table.is_sole_primary_key_column(&old_column.name),
                        ),
                        normalize_column(
                            profile,
                            new_column,
                            new_table.is_sole_primary_key_column(&new_column.name),
                        ),
                    );
                    if !column_diff.is_empty() {
                        table_diff.modified_columns.push(column_diff);
                    }
                }
                Err(_) => table_diff.added_columns.push(new_column.clone()),
            }
        }

        for old_column in &old_table.columns {
            if !new_table.has_column(&old_column.name) {
                table_diff.removed_columns.push(old_column.clone());
            }
        }
    }

    /// 主キー差分を検出（名前は比較しない）
    fn detect_primary_key_diff(
        &self,
        old_table: &Table,
        new_table: &Table,
        table_diff: &mut TableDiff,
    ) {
        let old_columns = old_table.primary_key().map(|pk| &pk.columns);
        let new_columns = new_table.primary_key().map(|pk| &pk.columns);
        if old_columns != new_columns {
            table_diff.primary_key_change = Some(PrimaryKeyChange {
                old: old_table.primary_key.clone(),
                new: new_table.primary_key.clone(),
            });
        }
    }

    /// インデックス差分を検出
    ///
    /// 同名で構造が異なるインデックスは削除と追加の組になります。
    fn detect_index_diff(&self, old_table: &Table, new_table: &Table, table_diff: &mut TableDiff) {
        let matches = |a: &crate::core::schema::Index, b: &crate::core::schema::Index| {
            a.name == b.name && a.same_shape(b)
        };

        for index in &new_table.indexes {
            if !old_table.indexes.iter().any(|old| matches(old, index)) {
                table_diff.added_indexes.push(index.clone());
            }
        }
        for index in &old_table.indexes {
            if !new_table.indexes.iter().any(|new| matches(index, new)) {
                table_diff.removed_indexes.push(index.clone());
            }
        }
    }

    /// 外部キー差分を検出（構造で照合）
    fn detect_foreign_key_diff(
        &self,
        old_table: &Table,
        new_table: &Table,
        table_diff: &mut TableDiff,
    ) {
        let mut matched: HashSet<usize> = HashSet::new();

        for foreign_key in &new_table.foreign_keys {
            let found = old_table
                .foreign_keys
                .iter()
                .enumerate()
                .find(|(i, old)| !matched.contains(i) && old.same_shape(foreign_key));
            match found {
                Some((i, _)) => {
                    matched.insert(i);
                }
                None => table_diff.added_foreign_keys.push(foreign_key.clone()),
            }
        }

        for (i, foreign_key) in old_table.foreign_keys.iter().enumerate() {
            if !matched.contains(&i) {
                table_diff.removed_foreign_keys.push(foreign_key.clone());
            }
        }
    }
}

/// 比較用にカラムを正規化
///
/// プラットフォームが保持しない属性を落とし、省略値を既定値で埋めます。
/// `inline_primary` はカラムが単一カラム主キーそのものである場合に true。
/// SQLiteの自動採番は INTEGER PRIMARY KEY としてのみ表現されます。
pub fn normalize_column(profile: PlatformProfile, column: &Column, inline_primary: bool) -> Column {
    let mut normalized = column.clone();

    if profile.platform() == Platform::SQLite
        && inline_primary
        && normalized.autoincrement
        && normalized.column_type.is_integer()
    {
        normalized.column_type = ColumnType::INTEGER;
    }

    normalized.length = match normalized.column_type {
        ColumnType::STRING => Some(normalized.length.unwrap_or(DEFAULT_STRING_LENGTH)),
        _ => None,
    };

    if normalized.column_type == ColumnType::DECIMAL {
        normalized.precision = Some(normalized.precision.unwrap_or(DEFAULT_DECIMAL_PRECISION));
        normalized.scale = Some(normalized.scale.unwrap_or(DEFAULT_DECIMAL_SCALE));
    } else {
        normalized.precision = None;
        normalized.scale = None;
    }

    if profile.platform() != Platform::MySQL {
        normalized.unsigned = false;
    }

    if !profile.supports_column_comments() {
        normalized.comment = None;
    }
    normalized.comment = normalized.comment.filter(|c| !c.is_empty());

    if normalized.autoincrement {
        normalized.default = None;
        normalized.nullable = false;
    }

    normalized
}

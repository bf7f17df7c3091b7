// 論理名と物理名の変換
//
// マイグレーションステップは論理名（プレフィックスなし）でスキーマを扱い、
// 接続と差分適用は物理名で扱います。

use std::collections::{BTreeMap, BTreeSet};

use crate::adapters::sql_generator::is_default_primary_key_name;
use crate::core::platform::PlatformProfile;
use crate::core::schema::{Schema, Sequence, Table, DEFAULT_PRIMARY_KEY_NAME};

/// スキーマ名前変換
#[derive(Debug, Clone)]
pub struct SchemaWrapper {
    prefix: String,
    profile: PlatformProfile,
}

impl SchemaWrapper {
    pub fn new(prefix: &str, profile: PlatformProfile) -> Self {
        Self {
            prefix: prefix.to_string(),
            profile,
        }
    }

    /// テーブルプレフィックス
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// プレフィックスを持つ（このインストールに属する）物理名か
    pub fn owns(&self, name: &str) -> bool {
        name.starts_with(self.prefix.as_str())
    }

    /// 物理名 -> 論理名
    pub fn logical_name<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.prefix.as_str()).unwrap_or(name)
    }

    /// 論理名 -> 物理名
    pub fn physical_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// 物理名のスキーマを論理名に変換
    ///
    /// プレフィックスを持たないテーブルとシーケンスは含めません。
    /// エンジンが付与した既定の主キー名は `primary` に戻します。
    pub fn to_logical(&self, schema: &Schema) -> Schema {
        let tables = schema
            .tables
            .values()
            .filter(|table| self.owns(&table.name))
            .map(|table| {
                let mut logical = self.rename_table(table, |name| self.logical_name(name).to_string());
                if let Some(pk) = logical.primary_key.as_mut() {
                    if is_default_primary_key_name(self.profile, &table.name, &pk.name) {
                        pk.name = DEFAULT_PRIMARY_KEY_NAME.to_string();
                    }
                }
                (logical.name.clone(), logical)
            })
            .collect();

        Schema {
            tables,
            sequences: self.rename_sequences(
                schema,
                |name| self.owns(name),
                |name| self.logical_name(name).to_string(),
            ),
            dropped_tables: rename_set(&schema.dropped_tables, |name| self.owns(name), |name| {
                self.logical_name(name).to_string()
            }),
            dropped_sequences: rename_set(&schema.dropped_sequences, |name| self.owns(name), |name| {
                self.logical_name(name).to_string()
            }),
        }
    }

    /// 論理名のスキーマを物理名に変換
    pub fn to_physical(&self, schema: &Schema) -> Schema {
        let tables = schema
            .tables
            .values()
            .map(|table| {
                let physical = self.rename_table(table, |name| self.physical_name(name));
                (physical.name.clone(), physical)
            })
            .collect();

        Schema {
            tables,
            sequences: self.rename_sequences(schema, |_| true, |name| self.physical_name(name)),
            dropped_tables: rename_set(&schema.dropped_tables, |_| true, |name| {
                self.physical_name(name)
            }),
            dropped_sequences: rename_set(&schema.dropped_sequences, |_| true, |name| {
                self.physical_name(name)
            }),
        }
    }

    fn rename_table(&self, table: &Table, rename: impl Fn(&str) -> String) -> Table {
        let mut renamed = table.clone();
        renamed.name = rename(&table.name);
        for foreign_key in &mut renamed.foreign_keys {
            foreign_key.referenced_table = rename(&foreign_key.referenced_table);
        }
        renamed
    }

    fn rename_sequences(
        &self,
        schema: &Schema,
        keep: impl Fn(&str) -> bool,
        rename: impl Fn(&str) -> String,
    ) -> BTreeMap<String, Sequence> {
        schema
            .sequences
            .values()
            .filter(|sequence| keep(&sequence.name))
            .map(|sequence| {
                let mut renamed = sequence.clone();
                renamed.name = rename(&sequence.name);
                renamed.table = sequence.table.as_deref().map(&rename);
                (renamed.name.clone(), renamed)
            })
            .collect()
    }
}

fn rename_set(
    names: &BTreeSet<String>,
    keep: impl Fn(&str) -> bool,
    rename: impl Fn(&str) -> String,
) -> BTreeSet<String> {
    names
        .iter()
        .filter(|name| keep(name))
        .map(|name| rename(name))
        .collect()
}

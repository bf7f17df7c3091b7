// スキーマ差分ドメインモデル
//
// スキーマ間の差分を表現する型システム。
// テーブル、カラム、インデックス、外部キー、シーケンスの追加、削除、変更を表現します。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::core::schema::{Column, ColumnDefault, ColumnType, ForeignKey, Index, Sequence, Table};

/// スキーマ差分
///
/// 2つのスキーマ間の差分を表現します。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDiff {
    /// 追加されたテーブル
    pub added_tables: Vec<Table>,

    /// 削除されたテーブル
    pub removed_tables: Vec<String>,

    /// 変更されたテーブル
    pub modified_tables: Vec<TableDiff>,

    /// 追加されたシーケンス
    pub added_sequences: Vec<Sequence>,

    /// 削除されたシーケンス
    pub removed_sequences: Vec<String>,
}

impl SchemaDiff {
    /// 新しいスキーマ差分を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 差分が空かどうか
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty()
            && self.removed_tables.is_empty()
            && self.modified_tables.is_empty()
            && self.added_sequences.is_empty()
            && self.removed_sequences.is_empty()
    }

    /// 差分の項目数を取得
    pub fn count(&self) -> usize {
        self.added_tables.len()
            + self.removed_tables.len()
            + self.modified_tables.len()
            + self.added_sequences.len()
            + self.removed_sequences.len()
    }

    /// 外部キー制約による依存関係を考慮して、追加テーブルをトポロジカルソート
    ///
    /// 被参照テーブルが先に作成されるように並び替えます。
    /// 循環参照に含まれるテーブルは末尾に名前順で配置します
    /// （外部キーはテーブル作成後に追加されるため、順序は保証不要）。
    pub fn sort_added_tables_by_dependency(&self) -> Vec<Table> {
        let names: Vec<String> = self.added_tables.iter().map(|t| t.name.clone()).collect();
        let table_map: HashMap<&str, &Table> = self
            .added_tables
            .iter()
            .map(|t| (t.name.as_str(), t))
            .collect();

        let order = topological_order(&names, |name| {
            table_map
                .get(name)
                .map(|t| t.referenced_tables().iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        });

        order
            .iter()
            .filter_map(|name| table_map.get(name.as_str()).map(|t| (*t).clone()))
            .collect()
    }

    /// 外部キー制約による依存関係を考慮して、削除テーブルを逆順にソート
    ///
    /// 参照元テーブルが先に削除されるように並び替えます。
    ///
    /// # Arguments
    /// * `all_tables` - 削除されるテーブルの定義を含むテーブルマップ
    pub fn sort_removed_tables_by_dependency(
        &self,
        all_tables: &BTreeMap<String, Table>,
    ) -> Vec<String> {
        let mut order = topological_order(&self.removed_tables, |name| {
            all_tables
                .get(name)
                .map(|t| t.referenced_tables().iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        });

        // 削除は逆順（参照元を先に削除）
        order.reverse();
        order
    }
}

/// Kahnのアルゴリズムによるトポロジカルソート
///
/// `dependencies_of` は各ノードが依存する（参照する）ノードを返します。
/// 対象集合外への依存は無視し、循環に含まれるノードは名前順で末尾に追加します。
fn topological_order<F>(names: &[String], dependencies_of: F) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let members: HashSet<&str> = names.iter().map(|s| s.as_str()).collect();

    // テーブル名 -> このテーブルが依存しているテーブル名のリスト
    let dependencies: HashMap<&str, Vec<String>> = names
        .iter()
        .map(|name| {
            let deps = dependencies_of(name)
                .into_iter()
                .filter(|dep| members.contains(dep.as_str()) && dep != name)
                .collect();
            (name.as_str(), deps)
        })
        .collect();

    // 入次数 = このテーブルが依存しているテーブルの数
    let mut in_degree: HashMap<&str, usize> = dependencies
        .iter()
        .map(|(name, deps)| (*name, deps.len()))
        .collect();

    let mut queue: Vec<&str> = in_degree
        .iter()
        .filter(|(_, &degree)| degree == 0)
        .map(|(&name, _)| name)
        .collect();
    // popで名前順に取り出すため降順に並べる
    queue.sort_unstable_by(|a, b| b.cmp(a));

    let mut sorted: Vec<String> = Vec::new();

    while let Some(name) = queue.pop() {
        sorted.push(name.to_string());

        for (other, deps) in &dependencies {
            if deps.iter().any(|d| d == name) {
                if let Some(degree) = in_degree.get_mut(other) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push(*other);
                        queue.sort_unstable_by(|a, b| b.cmp(a));
                    }
                }
            }
        }
    }

    if sorted.len() != names.len() {
        let mut remaining: Vec<String> = names
            .iter()
            .filter(|name| !sorted.contains(name))
            .cloned()
            .collect();
        remaining.sort_unstable();
        sorted.extend(remaining);
    }

    sorted
}

/// 主キーの変更
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryKeyChange {
    /// 変更前の主キー
    pub old: Option<Index>,

    /// 変更後の主キー
    pub new: Option<Index>,
}

/// テーブル差分
///
/// テーブルの変更内容を表現します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDiff {
    /// テーブル名
    pub table_name: String,

    /// 追加されたカラム
    pub added_columns: Vec<Column>,

    /// 削除されたカラム
    pub removed_columns: Vec<Column>,

    /// 変更されたカラム
    pub modified_columns: Vec<ColumnDiff>,

    /// 主キーの変更
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_change: Option<PrimaryKeyChange>,

    /// 追加されたインデックス
    pub added_indexes: Vec<Index>,

    /// 削除されたインデックス
    pub removed_indexes: Vec<Index>,

    /// 追加された外部キー
    pub added_foreign_keys: Vec<ForeignKey>,

    /// 削除された外部キー
    pub removed_foreign_keys: Vec<ForeignKey>,
}

impl TableDiff {
    /// 新しいテーブル差分を作成
    pub fn new(table_name: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            added_columns: Vec::new(),
            removed_columns: Vec::new(),
            modified_columns: Vec::new(),
            primary_key_change: None,
            added_indexes: Vec::new(),
            removed_indexes: Vec::new(),
            added_foreign_keys: Vec::new(),
            removed_foreign_keys: Vec::new(),
        }
    }

    /// 差分が空かどうか
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.primary_key_change.is_none()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.added_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty()
    }

    /// コメント以外の構造変更を含むカラム差分
    pub fn structural_column_changes(&self) -> impl Iterator<Item = &ColumnDiff> {
        self.modified_columns.iter().filter(|c| !c.is_comment_only())
    }
}

/// カラム差分
///
/// カラムの変更内容を表現します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDiff {
    /// カラム名
    pub column_name: String,

    /// 変更前のカラム定義
    pub old_column: Column,

    /// 変更後のカラム定義
    pub new_column: Column,

    /// 変更された属性
    pub changes: Vec<ColumnChange>,
}

impl ColumnDiff {
    /// 新しいカラム差分を作成
    pub fn new(old_column: Column, new_column: Column) -> Self {
        let mut changes = Vec::new();

        // 型の変更を検出
        if old_column.column_type != new_column.column_type {
            changes.push(ColumnChange::TypeChanged {
                old_type: old_column.column_type,
                new_type: new_column.column_type,
            });
        }

        // 長さの変更を検出
        if old_column.length != new_column.length {
            changes.push(ColumnChange::LengthChanged {
                old_length: old_column.length,
                new_length: new_column.length,
            });
        }

        // 精度・スケールの変更を検出
        if old_column.precision != new_column.precision || old_column.scale != new_column.scale {
            changes.push(ColumnChange::PrecisionChanged {
                old_precision: old_column.precision,
                old_scale: old_column.scale,
                new_precision: new_column.precision,
                new_scale: new_column.scale,
            });
        }

        // NULL制約の変更を検出
        if old_column.nullable != new_column.nullable {
            changes.push(ColumnChange::NullableChanged {
                old_nullable: old_column.nullable,
                new_nullable: new_column.nullable,
            });
        }

        // デフォルト値の変更を検出
        if old_column.default != new_column.default {
            changes.push(ColumnChange::DefaultValueChanged {
                old_default: old_column.default.clone(),
                new_default: new_column.default.clone(),
            });
        }

        // AUTO_INCREMENTの変更を検出
        if old_column.autoincrement != new_column.autoincrement {
            changes.push(ColumnChange::AutoIncrementChanged {
                old_autoincrement: old_column.autoincrement,
                new_autoincrement: new_column.autoincrement,
            });
        }

        if old_column.unsigned != new_column.unsigned {
            changes.push(ColumnChange::UnsignedChanged {
                old_unsigned: old_column.unsigned,
                new_unsigned: new_column.unsigned,
            });
        }

        // コメントの変更を検出
        if old_column.comment != new_column.comment {
            changes.push(ColumnChange::CommentChanged {
                old_comment: old_column.comment.clone(),
                new_comment: new_column.comment.clone(),
            });
        }

        Self {
            column_name: new_column.name.clone(),
            old_column,
            new_column,
            changes,
        }
    }

    /// 変更がないかどうか
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// コメントのみの変更かどうか
    pub fn is_comment_only(&self) -> bool {
        !self.changes.is_empty()
            && self
                .changes
                .iter()
                .all(|c| matches!(c, ColumnChange::CommentChanged { .. }))
    }

    /// 自動採番が追加される変更かどうか
    pub fn adds_autoincrement(&self) -> bool {
        self.changes.iter().any(|c| {
            matches!(
                c,
                ColumnChange::AutoIncrementChanged {
                    old_autoincrement: false,
                    new_autoincrement: true
                }
            )
        })
    }

    /// 指定した変更種別を含むかどうか
    pub fn has_change(&self, predicate: impl Fn(&ColumnChange) -> bool) -> bool {
        self.changes.iter().any(predicate)
    }
}

/// カラム変更
///
/// カラムの変更内容の種類を表現します。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnChange {
    /// 型の変更
    TypeChanged {
        old_type: ColumnType,
        new_type: ColumnType,
    },

    /// 長さの変更
    LengthChanged {
        old_length: Option<u32>,
        new_length: Option<u32>,
    },

    /// 精度・スケールの変更
    PrecisionChanged {
        old_precision: Option<u32>,
        old_scale: Option<u32>,
        new_precision: Option<u32>,
        new_scale: Option<u32>,
    },

    /// NULL制約の変更
    NullableChanged {
        old_nullable: bool,
        new_nullable: bool,
    },

    /// デフォルト値の変更
    DefaultValueChanged {
        old_default: Option<ColumnDefault>,
        new_default: Option<ColumnDefault>,
    },

    /// AUTO_INCREMENTの変更
    AutoIncrementChanged {
        old_autoincrement: bool,
        new_autoincrement: bool,
    },

    /// 符号なしフラグの変更
    UnsignedChanged {
        old_unsigned: bool,
        new_unsigned: bool,
    },

    /// コメントの変更
    CommentChanged {
        old_comment: Option<String>,
        new_comment: Option<String>,
    },
}

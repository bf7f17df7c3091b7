// スキーマドメインモデル
//
// データベーススキーマの論理表現。
// Schema, Table, Column, Index, ForeignKey, Sequence を提供します。

use crate::core::error::{SchemaError, SchemaObjectKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 名前のない主キーに付与される名前
pub const DEFAULT_PRIMARY_KEY_NAME: &str = "primary";

/// スキーマ定義
///
/// テーブルとシーケンスの集合を保持します。
/// テーブル名・シーケンス名はそれぞれ一意です。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// テーブル定義のマップ（テーブル名 -> Table）
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,

    /// シーケンス定義のマップ（シーケンス名 -> Sequence）
    #[serde(default)]
    pub sequences: BTreeMap<String, Sequence>,

    /// 明示的に削除が要求されたテーブル名
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dropped_tables: BTreeSet<String>,

    /// 明示的に削除が要求されたシーケンス名
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dropped_sequences: BTreeSet<String>,
}

impl Schema {
    /// 空のスキーマを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// テーブルを取得
    ///
    /// # Returns
    /// テーブル、存在しない場合は `SchemaError::SchemaNotFound`
    pub fn get_table(&self, name: &str) -> Result<&Table, SchemaError> {
        self.tables
            .get(name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Table, name))
    }

    /// テーブルを可変参照で取得
    pub fn get_table_mut(&mut self, name: &str) -> Result<&mut Table, SchemaError> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Table, name))
    }

    /// テーブルが存在するか確認
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// テーブル一覧を名前順で取得
    pub fn tables(&self) -> Vec<&Table> {
        self.tables.values().collect()
    }

    /// テーブル数を取得
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// 新しいテーブルを作成して可変参照を返す
    pub fn create_table(&mut self, name: &str) -> Result<&mut Table, SchemaError> {
        if self.tables.contains_key(name) {
            return Err(SchemaError::DuplicateObject {
                kind: SchemaObjectKind::Table,
                name: name.to_string(),
            });
        }
        self.dropped_tables.remove(name);
        Ok(self
            .tables
            .entry(name.to_string())
            .or_insert_with(|| Table::new(name)))
    }

    /// テーブルを追加（同名のテーブルは置き換え）
    pub fn add_table(&mut self, table: Table) {
        self.dropped_tables.remove(&table.name);
        self.tables.insert(table.name.clone(), table);
    }

    /// テーブルを削除し、明示的な削除要求として記録
    pub fn drop_table(&mut self, name: &str) -> Result<Table, SchemaError> {
        let table = self
            .tables
            .remove(name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Table, name))?;
        self.dropped_tables.insert(name.to_string());
        Ok(table)
    }

    /// シーケンスが存在するか確認
    pub fn has_sequence(&self, name: &str) -> bool {
        self.sequences.contains_key(name)
    }

    /// シーケンスを取得
    pub fn get_sequence(&self, name: &str) -> Result<&Sequence, SchemaError> {
        self.sequences
            .get(name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Sequence, name))
    }

    /// シーケンス一覧を名前順で取得
    pub fn sequences(&self) -> Vec<&Sequence> {
        self.sequences.values().collect()
    }

    /// シーケンスを作成
    pub fn create_sequence(&mut self, sequence: Sequence) -> Result<(), SchemaError> {
        if self.sequences.contains_key(&sequence.name) {
            return Err(SchemaError::DuplicateObject {
                kind: SchemaObjectKind::Sequence,
                name: sequence.name,
            });
        }
        self.dropped_sequences.remove(&sequence.name);
        self.sequences.insert(sequence.name.clone(), sequence);
        Ok(())
    }

    /// シーケンスを削除し、明示的な削除要求として記録
    pub fn drop_sequence(&mut self, name: &str) -> Result<Sequence, SchemaError> {
        let sequence = self
            .sequences
            .remove(name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Sequence, name))?;
        self.dropped_sequences.insert(name.to_string());
        Ok(sequence)
    }
}

/// テーブル定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// テーブル名
    pub name: String,

    /// カラム定義のリスト（宣言順）
    pub columns: Vec<Column>,

    /// 主キー以外のインデックス
    #[serde(default)]
    pub indexes: Vec<Index>,

    /// 外部キー制約
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,

    /// 主キー（primary = true のインデックス）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<Index>,

    /// テーブルコメント
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Table {
    /// 新しいテーブルを作成
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            primary_key: None,
            comment: None,
        }
    }

    /// カラムを追加
    pub fn add_column(&mut self, column: Column) -> Result<&mut Column, SchemaError> {
        if self.has_column(&column.name) {
            return Err(SchemaError::DuplicateObject {
                kind: SchemaObjectKind::Column,
                name: format!("{}.{}", self.name, column.name),
            });
        }
        self.columns.push(column);
        let last = self.columns.len() - 1;
        Ok(&mut self.columns[last])
    }

    /// カラムを取得
    pub fn get_column(&self, name: &str) -> Result<&Column, SchemaError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                SchemaError::not_found(SchemaObjectKind::Column, format!("{}.{}", self.name, name))
            })
    }

    /// カラムを可変参照で取得
    pub fn get_column_mut(&mut self, name: &str) -> Result<&mut Column, SchemaError> {
        let table_name = self.name.clone();
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                SchemaError::not_found(SchemaObjectKind::Column, format!("{}.{}", table_name, name))
            })
    }

    /// カラムが存在するか確認
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// カラムを置き換え（存在しない場合はエラー）
    pub fn replace_column(&mut self, column: Column) -> Result<(), SchemaError> {
        let slot = self.get_column_mut(&column.name)?;
        *slot = column;
        Ok(())
    }

    /// カラムを削除
    pub fn drop_column(&mut self, name: &str) -> Result<Column, SchemaError> {
        let position = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                SchemaError::not_found(SchemaObjectKind::Column, format!("{}.{}", self.name, name))
            })?;
        Ok(self.columns.remove(position))
    }

    /// 主キーを設定
    ///
    /// # Arguments
    /// * `columns` - 主キーを構成するカラム名
    /// * `name` - 主キー名（Noneの場合は `primary`）
    ///
    /// # Returns
    /// 存在しないカラムを含む場合は `SchemaError::PrimaryKeyColumnMissing`
    pub fn set_primary_key(
        &mut self,
        columns: &[&str],
        name: Option<&str>,
    ) -> Result<(), SchemaError> {
        if let Some(missing) = columns.iter().find(|c| !self.has_column(c)) {
            return Err(SchemaError::PrimaryKeyColumnMissing {
                table: self.name.clone(),
                column: missing.to_string(),
            });
        }
        let name = name.unwrap_or(DEFAULT_PRIMARY_KEY_NAME);
        self.primary_key = Some(Index::primary(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        Ok(())
    }

    /// 主キーを取得
    pub fn primary_key(&self) -> Option<&Index> {
        self.primary_key.as_ref()
    }

    /// 主キーが設定されているか確認
    pub fn has_primary_key(&self) -> bool {
        self.primary_key.is_some()
    }

    /// 指定カラムだけで主キーが構成されているか確認
    pub fn is_sole_primary_key_column(&self, column: &str) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(|pk| pk.columns.len() == 1 && pk.columns[0] == column)
    }

    /// 主キーを削除
    pub fn drop_primary_key(&mut self) -> Option<Index> {
        self.primary_key.take()
    }

    /// 通常のインデックスを追加
    pub fn add_index(&mut self, name: &str, columns: &[&str]) -> Result<(), SchemaError> {
        self.push_index(Index::new(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            false,
        ))
    }

    /// ユニークインデックスを追加
    pub fn add_unique_index(&mut self, name: &str, columns: &[&str]) -> Result<(), SchemaError> {
        self.push_index(Index::new(
            name,
            columns.iter().map(|c| c.to_string()).collect(),
            true,
        ))
    }

    /// インデックスを追加（名前の重複を検査）
    pub fn push_index(&mut self, index: Index) -> Result<(), SchemaError> {
        if index.primary {
            self.primary_key = Some(index);
            return Ok(());
        }
        if self.has_index(&index.name) {
            return Err(SchemaError::DuplicateObject {
                kind: SchemaObjectKind::Index,
                name: index.name,
            });
        }
        self.indexes.push(index);
        Ok(())
    }

    /// インデックスを取得（主キーを含む）
    pub fn get_index(&self, name: &str) -> Result<&Index, SchemaError> {
        self.primary_key
            .iter()
            .chain(self.indexes.iter())
            .find(|i| i.name == name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Index, name))
    }

    /// インデックスが存在するか確認（主キーを含む）
    pub fn has_index(&self, name: &str) -> bool {
        self.get_index(name).is_ok()
    }

    /// 全インデックスを取得（主キーが先頭）
    pub fn all_indexes(&self) -> Vec<&Index> {
        self.primary_key.iter().chain(self.indexes.iter()).collect()
    }

    /// インデックスを削除
    pub fn drop_index(&mut self, name: &str) -> Result<Index, SchemaError> {
        if self.primary_key.as_ref().is_some_and(|pk| pk.name == name) {
            return self
                .primary_key
                .take()
                .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Index, name));
        }
        let position = self
            .indexes
            .iter()
            .position(|i| i.name == name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::Index, name))?;
        Ok(self.indexes.remove(position))
    }

    /// 外部キー制約を追加
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> Result<(), SchemaError> {
        if self.has_foreign_key(&foreign_key.name) {
            return Err(SchemaError::DuplicateObject {
                kind: SchemaObjectKind::ForeignKey,
                name: foreign_key.name,
            });
        }
        self.foreign_keys.push(foreign_key);
        Ok(())
    }

    /// 外部キー制約が存在するか確認
    pub fn has_foreign_key(&self, name: &str) -> bool {
        self.foreign_keys.iter().any(|fk| fk.name == name)
    }

    /// 外部キー制約を削除
    pub fn drop_foreign_key(&mut self, name: &str) -> Result<ForeignKey, SchemaError> {
        let position = self
            .foreign_keys
            .iter()
            .position(|fk| fk.name == name)
            .ok_or_else(|| SchemaError::not_found(SchemaObjectKind::ForeignKey, name))?;
        Ok(self.foreign_keys.remove(position))
    }

    /// 参照先テーブル名の一覧（自己参照を除く）
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .filter(|t| *t != self.name)
            .collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }
}

/// カラムの論理型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum ColumnType {
    SMALLINT,
    INTEGER,
    BIGINT,
    STRING,
    TEXT,
    BOOLEAN,
    DECIMAL,
    FLOAT,
    DATE,
    TIME,
    DATETIME,
    JSON,
    BLOB,
}

impl ColumnType {
    /// 整数系の型かどうか
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::SMALLINT | ColumnType::INTEGER | ColumnType::BIGINT
        )
    }

    /// 文字列系の型かどうか
    pub fn is_string(&self) -> bool {
        matches!(self, ColumnType::STRING | ColumnType::TEXT | ColumnType::JSON)
    }

    /// 整数系の型の幅（バイト）
    pub fn integer_width(&self) -> Option<u8> {
        match self {
            ColumnType::SMALLINT => Some(2),
            ColumnType::INTEGER => Some(4),
            ColumnType::BIGINT => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::SMALLINT => "smallint",
            ColumnType::INTEGER => "integer",
            ColumnType::BIGINT => "bigint",
            ColumnType::STRING => "string",
            ColumnType::TEXT => "text",
            ColumnType::BOOLEAN => "boolean",
            ColumnType::DECIMAL => "decimal",
            ColumnType::FLOAT => "float",
            ColumnType::DATE => "date",
            ColumnType::TIME => "time",
            ColumnType::DATETIME => "datetime",
            ColumnType::JSON => "json",
            ColumnType::BLOB => "blob",
        };
        write!(f, "{}", name)
    }
}

/// カラムのデフォルト値（論理型に合わせて変換済み）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnDefault {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl fmt::Display for ColumnDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnDefault::Integer(value) => write!(f, "{}", value),
            ColumnDefault::Boolean(value) => write!(f, "{}", value),
            ColumnDefault::Text(value) => write!(f, "{}", value),
        }
    }
}

/// カラム定義
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// カラム名
    pub name: String,

    /// 論理型
    pub column_type: ColumnType,

    /// 長さ（文字列型では必須、整数型ではバイト幅のヒント）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,

    /// 精度（DECIMAL）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    /// スケール（DECIMAL）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,

    /// NULL許可フラグ
    pub nullable: bool,

    /// デフォルト値
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ColumnDefault>,

    /// 自動採番フラグ
    #[serde(default)]
    pub autoincrement: bool,

    /// 符号なしフラグ
    #[serde(default)]
    pub unsigned: bool,

    /// コメント
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Column {
    /// 新しいカラムを作成
    pub fn new(name: &str, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            length: None,
            precision: None,
            scale: None,
            nullable,
            default: None,
            autoincrement: false,
            unsigned: false,
            comment: None,
        }
    }

    /// 長さを設定した新しいカラムを返す
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// 精度とスケールを設定した新しいカラムを返す
    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// デフォルト値を設定した新しいカラムを返す
    pub fn with_default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    /// NULL許可フラグを変更した新しいカラムを返す
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// 自動採番カラムとして返す（NOT NULLを伴う）
    pub fn with_autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self.nullable = false;
        self
    }

    /// 符号なしフラグを設定した新しいカラムを返す
    pub fn with_unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    /// コメントを設定した新しいカラムを返す
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// NOT NULLかどうか
    pub fn is_not_null(&self) -> bool {
        !self.nullable
    }
}

/// インデックス定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// インデックス名
    pub name: String,

    /// 対象カラム（順序付き）
    pub columns: Vec<String>,

    /// ユニークフラグ
    pub unique: bool,

    /// 主キーフラグ
    #[serde(default)]
    pub primary: bool,
}

impl Index {
    /// 新しいインデックスを作成
    pub fn new(name: &str, columns: Vec<String>, unique: bool) -> Self {
        Self {
            name: name.to_string(),
            columns,
            unique,
            primary: false,
        }
    }

    /// 主キーインデックスを作成（常にユニーク）
    pub fn primary(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            unique: true,
            primary: true,
        }
    }

    /// 構造が同じかどうか（名前は比較しない）
    pub fn same_shape(&self, other: &Index) -> bool {
        self.columns == other.columns && self.unique == other.unique && self.primary == other.primary
    }
}

/// 参照アクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    /// XMLやイントロスペクション結果の文字列から変換
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "CASCADE" => Some(ReferentialAction::Cascade),
            "SET NULL" => Some(ReferentialAction::SetNull),
            "SET DEFAULT" => Some(ReferentialAction::SetDefault),
            "RESTRICT" => Some(ReferentialAction::Restrict),
            "NO ACTION" => Some(ReferentialAction::NoAction),
            _ => None,
        }
    }

    /// SQL表現
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// 外部キー制約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// 制約名
    pub name: String,

    /// 参照元カラム
    pub columns: Vec<String>,

    /// 参照先テーブル
    pub referenced_table: String,

    /// 参照先カラム
    pub referenced_columns: Vec<String>,

    /// 削除時の動作
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ReferentialAction>,

    /// 更新時の動作
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKey {
    /// 新しい外部キー制約を作成
    pub fn new(
        name: &str,
        columns: Vec<String>,
        referenced_table: &str,
        referenced_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            columns,
            referenced_table: referenced_table.to_string(),
            referenced_columns,
            on_delete: None,
            on_update: None,
        }
    }

    /// 構造が同じかどうか（制約名は比較しない）
    pub fn same_shape(&self, other: &ForeignKey) -> bool {
        self.columns == other.columns
            && self.referenced_table == other.referenced_table
            && self.referenced_columns == other.referenced_columns
    }
}

/// シーケンス定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// シーケンス名
    pub name: String,

    /// 関連付けられたテーブル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// 関連付けられたカラム
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// 開始値
    #[serde(default = "default_sequence_start")]
    pub start: i64,

    /// 増分
    #[serde(default = "default_sequence_increment")]
    pub increment: i64,
}

fn default_sequence_start() -> i64 {
    1
}

fn default_sequence_increment() -> i64 {
    1
}

impl Sequence {
    /// 新しいシーケンスを作成
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: None,
            column: None,
            start: default_sequence_start(),
            increment: default_sequence_increment(),
        }
    }

    /// テーブルとカラムに関連付けた新しいシーケンスを返す
    pub fn owned_by(mut self, table: &str, column: &str) -> Self {
        self.table = Some(table.to_string());
        self.column = Some(column.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new("users");
        table
            .add_column(Column::new("id", ColumnType::INTEGER, false).with_autoincrement())
            .unwrap();
        table
            .add_column(Column::new("email", ColumnType::STRING, false).with_length(255))
            .unwrap();
        table
    }

    // ====== Schema テスト ======

    #[test]
    fn test_get_table_not_found() {
        let schema = Schema::new();
        let err = schema.get_table("missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_table_duplicate() {
        let mut schema = Schema::new();
        schema.create_table("users").unwrap();
        let err = schema.create_table("users").unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateObject { .. }));
    }

    #[test]
    fn test_drop_table_records_request() {
        let mut schema = Schema::new();
        schema.add_table(sample_table());

        schema.drop_table("users").unwrap();

        assert!(!schema.has_table("users"));
        assert!(schema.dropped_tables.contains("users"));

        // 再作成すると削除要求は取り消される
        schema.create_table("users").unwrap();
        assert!(schema.dropped_tables.is_empty());
    }

    #[test]
    fn test_sequences() {
        let mut schema = Schema::new();
        schema
            .create_sequence(Sequence::new("users_seq").owned_by("users", "id"))
            .unwrap();

        assert!(schema.has_sequence("users_seq"));
        assert!(!schema.has_sequence("other_seq"));
        assert_eq!(schema.sequences().len(), 1);
        assert!(schema
            .create_sequence(Sequence::new("users_seq"))
            .is_err());
    }

    // ====== Table テスト ======

    #[test]
    fn test_set_primary_key_requires_columns() {
        let mut table = sample_table();
        let err = table.set_primary_key(&["missing"], None).unwrap_err();
        assert!(matches!(err, SchemaError::PrimaryKeyColumnMissing { .. }));

        table.set_primary_key(&["id"], None).unwrap();
        let pk = table.primary_key().unwrap();
        assert_eq!(pk.name, DEFAULT_PRIMARY_KEY_NAME);
        assert!(pk.primary);
        assert!(pk.unique);
    }

    #[test]
    fn test_all_indexes_primary_first() {
        let mut table = sample_table();
        table.add_index("email_index", &["email"]).unwrap();
        table.set_primary_key(&["id"], Some("users_pk")).unwrap();

        let indexes = table.all_indexes();
        assert_eq!(indexes.len(), 2);
        assert!(indexes[0].primary);
        assert_eq!(indexes[1].name, "email_index");
        assert!(table.has_index("users_pk"));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut table = sample_table();
        table.add_index("email_index", &["email"]).unwrap();
        assert!(table.add_unique_index("email_index", &["email"]).is_err());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut table = sample_table();
        let err = table
            .add_column(Column::new("id", ColumnType::BIGINT, false))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateObject { .. }));
    }

    #[test]
    fn test_referenced_tables_excludes_self() {
        let mut table = sample_table();
        table
            .add_foreign_key(ForeignKey::new(
                "fk_parent",
                vec!["id".to_string()],
                "users",
                vec!["id".to_string()],
            ))
            .unwrap();
        table
            .add_foreign_key(ForeignKey::new(
                "fk_group",
                vec!["id".to_string()],
                "groups",
                vec!["id".to_string()],
            ))
            .unwrap();

        assert_eq!(table.referenced_tables(), vec!["groups"]);
    }

    // ====== Column テスト ======

    #[test]
    fn test_with_autoincrement_forces_not_null() {
        let column = Column::new("id", ColumnType::BIGINT, true).with_autoincrement();
        assert!(column.autoincrement);
        assert!(column.is_not_null());
    }

    #[test]
    fn test_with_nullable_is_pure() {
        let original = Column::new("flag", ColumnType::BOOLEAN, false);
        let repaired = original.clone().with_nullable(true);
        assert!(!original.nullable);
        assert!(repaired.nullable);
    }

    #[test]
    fn test_referential_action_parse() {
        assert_eq!(
            ReferentialAction::parse("cascade"),
            Some(ReferentialAction::Cascade)
        );
        assert_eq!(
            ReferentialAction::parse("SET_NULL"),
            Some(ReferentialAction::SetNull)
        );
        assert_eq!(ReferentialAction::parse("bogus"), None);
    }
}

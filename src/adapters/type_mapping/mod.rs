// 型マッピングサービス
//
// プラットフォームに依存しない共通インターフェースで Column <-> SQL型文字列 の
// 双方向変換を一元管理します。デフォルト値リテラルの変換も担当します。

pub mod common;
mod mysql_mapper;
mod oracle_mapper;
mod postgres_mapper;
mod sqlite_mapper;

pub use mysql_mapper::MySqlTypeMapper;
pub use oracle_mapper::OracleTypeMapper;
pub use postgres_mapper::PostgresTypeMapper;
pub use sqlite_mapper::SqliteTypeMapper;

use crate::core::platform::Platform;
use crate::core::schema::{Column, ColumnDefault, ColumnType};

/// 型メタデータ
///
/// データベースから取得した型の追加情報を保持します。
#[derive(Debug, Clone, Default)]
pub struct TypeMetadata {
    /// 文字列型の最大長
    pub char_max_length: Option<u32>,
    /// 数値型の精度
    pub numeric_precision: Option<u32>,
    /// 数値型の小数点以下桁数
    pub numeric_scale: Option<u32>,
}

/// 解釈済みのSQL型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlType {
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: bool,
}

impl SqlType {
    /// 付加情報なしの型
    pub fn plain(column_type: ColumnType) -> Self {
        Self {
            column_type,
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
        }
    }

    /// 長さ付きの型
    pub fn with_length(column_type: ColumnType, length: Option<u32>) -> Self {
        Self {
            length,
            ..Self::plain(column_type)
        }
    }

    /// 精度付きの型
    pub fn decimal(precision: Option<u32>, scale: Option<u32>) -> Self {
        Self {
            precision,
            scale,
            ..Self::plain(ColumnType::DECIMAL)
        }
    }
}

/// プラットフォーム固有の型マッピング
pub trait TypeMapper: Send + Sync {
    /// SQL型文字列からSqlTypeへパース
    ///
    /// # Arguments
    /// * `sql_type` - データベースから取得した型文字列
    /// * `metadata` - 追加メタデータ
    ///
    /// # Returns
    /// 変換されたSqlType、変換できない場合はNone
    fn parse_sql_type(&self, sql_type: &str, metadata: &TypeMetadata) -> Option<SqlType>;

    /// カラム定義からSQL型文字列へ変換（自動採番の表現は含まない）
    fn format_sql_type(&self, column: &Column) -> String;

    /// 真偽値デフォルトのリテラル
    fn format_boolean(&self, value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    /// デフォルト型（パース失敗時のフォールバック）
    fn default_type(&self) -> ColumnType {
        ColumnType::TEXT
    }
}

/// 型マッピングサービス
pub struct TypeMappingService {
    platform: Platform,
    mapper: Box<dyn TypeMapper>,
}

impl Clone for TypeMappingService {
    fn clone(&self) -> Self {
        Self::new(self.platform)
    }
}

impl std::fmt::Debug for TypeMappingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMappingService")
            .field("platform", &self.platform)
            .finish()
    }
}

impl TypeMappingService {
    /// 新しいTypeMappingServiceを作成
    pub fn new(platform: Platform) -> Self {
        let mapper: Box<dyn TypeMapper> = match platform {
            Platform::PostgreSQL => Box::new(PostgresTypeMapper),
            Platform::MySQL => Box::new(MySqlTypeMapper),
            Platform::SQLite => Box::new(SqliteTypeMapper),
            Platform::Oracle => Box::new(OracleTypeMapper),
        };
        Self { platform, mapper }
    }

    /// プラットフォームを取得
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Column -> SQL型文字列
    ///
    /// # Returns
    /// SQL型文字列（例: "VARCHAR(255)", "INTEGER"）
    pub fn to_sql_type(&self, column: &Column) -> String {
        self.mapper.format_sql_type(column)
    }

    /// SQL型文字列 -> SqlType
    ///
    /// # Returns
    /// 解釈結果、パース失敗時はデフォルト型（TEXT）
    pub fn from_sql_type(&self, sql_type: &str, metadata: &TypeMetadata) -> SqlType {
        self.mapper
            .parse_sql_type(sql_type.trim(), metadata)
            .unwrap_or_else(|| SqlType::plain(self.mapper.default_type()))
    }

    /// デフォルト値 -> SQLリテラル
    pub fn format_default(&self, default: &ColumnDefault) -> String {
        match default {
            ColumnDefault::Integer(value) => value.to_string(),
            ColumnDefault::Boolean(value) => self.mapper.format_boolean(*value),
            ColumnDefault::Text(value) => common::quote_literal(value),
        }
    }

    /// イントロスペクションで得たデフォルト式 -> ColumnDefault
    pub fn parse_default(&self, column_type: ColumnType, raw: &str) -> Option<ColumnDefault> {
        common::parse_default_literal(column_type, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_service_platform() {
        for platform in Platform::ALL {
            assert_eq!(TypeMappingService::new(platform).platform(), platform);
        }
    }

    #[test]
    fn test_unknown_type_falls_back_to_text() {
        let service = TypeMappingService::new(Platform::PostgreSQL);
        let parsed = service.from_sql_type("tsvector", &TypeMetadata::default());
        assert_eq!(parsed.column_type, ColumnType::TEXT);
    }

    #[test]
    fn test_format_default_boolean_per_platform() {
        let pg = TypeMappingService::new(Platform::PostgreSQL);
        let mysql = TypeMappingService::new(Platform::MySQL);

        assert_eq!(pg.format_default(&ColumnDefault::Boolean(true)), "true");
        assert_eq!(mysql.format_default(&ColumnDefault::Boolean(true)), "1");
        assert_eq!(
            mysql.format_default(&ColumnDefault::Text("it's".to_string())),
            "'it''s'"
        );
    }
}

// SQLite用型マッパー
//
// 宣言した型名がそのまま PRAGMA table_info に現れるため、
// 論理型ごとに一意な型名を出力し、読み戻しで同じ論理型に戻します。

use super::common::{format_common_sql_type, split_type_args};
use super::{SqlType, TypeMapper, TypeMetadata};
use crate::core::schema::{Column, ColumnType};

/// SQLite用型マッパー
pub struct SqliteTypeMapper;

impl TypeMapper for SqliteTypeMapper {
    fn parse_sql_type(&self, sql_type: &str, _metadata: &TypeMetadata) -> Option<SqlType> {
        let (base, args) = split_type_args(sql_type);

        let parsed = match base.as_str() {
            "integer" | "int" | "mediumint" => SqlType::plain(ColumnType::INTEGER),
            "bigint" => SqlType::plain(ColumnType::BIGINT),
            "smallint" | "tinyint" => SqlType::plain(ColumnType::SMALLINT),
            "varchar" | "character varying" | "char" | "nvarchar" | "character" => {
                SqlType::with_length(ColumnType::STRING, args.first().copied())
            }
            "clob" | "text" => SqlType::plain(ColumnType::TEXT),
            "boolean" | "bool" => SqlType::plain(ColumnType::BOOLEAN),
            "numeric" | "decimal" => {
                SqlType::decimal(args.first().copied(), args.get(1).copied())
            }
            "double precision" | "double" | "real" | "float" => SqlType::plain(ColumnType::FLOAT),
            "date" => SqlType::plain(ColumnType::DATE),
            "time" => SqlType::plain(ColumnType::TIME),
            "datetime" | "timestamp" => SqlType::plain(ColumnType::DATETIME),
            "json" => SqlType::plain(ColumnType::JSON),
            "blob" | "" => SqlType::plain(ColumnType::BLOB),
            _ => return None,
        };
        Some(parsed)
    }

    fn format_sql_type(&self, column: &Column) -> String {
        if let Some(sql) = format_common_sql_type(column) {
            return sql;
        }

        match column.column_type {
            ColumnType::INTEGER => "INTEGER".to_string(),
            ColumnType::TEXT => "CLOB".to_string(),
            ColumnType::BOOLEAN => "BOOLEAN".to_string(),
            ColumnType::FLOAT => "DOUBLE PRECISION".to_string(),
            ColumnType::TIME => "TIME".to_string(),
            ColumnType::DATETIME => "DATETIME".to_string(),
            ColumnType::JSON => "JSON".to_string(),
            ColumnType::BLOB => "BLOB".to_string(),
            // 共通型はformat_common_sql_typeで処理済み
            _ => "CLOB".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(column: Column) -> SqlType {
        let mapper = SqliteTypeMapper;
        let sql = mapper.format_sql_type(&column);
        mapper
            .parse_sql_type(&sql, &TypeMetadata::default())
            .unwrap()
    }

    #[test]
    fn test_sqlite_every_type_reads_back() {
        let types = [
            ColumnType::SMALLINT,
            ColumnType::INTEGER,
            ColumnType::BIGINT,
            ColumnType::STRING,
            ColumnType::TEXT,
            ColumnType::BOOLEAN,
            ColumnType::DECIMAL,
            ColumnType::FLOAT,
            ColumnType::DATE,
            ColumnType::TIME,
            ColumnType::DATETIME,
            ColumnType::JSON,
            ColumnType::BLOB,
        ];
        for column_type in types {
            let parsed = round_trip(Column::new("c", column_type, true));
            assert_eq!(parsed.column_type, column_type, "type {}", column_type);
        }
    }

    #[test]
    fn test_sqlite_string_length() {
        let parsed = round_trip(Column::new("c", ColumnType::STRING, true).with_length(32));
        assert_eq!(parsed.length, Some(32));
    }

    #[test]
    fn test_sqlite_decimal_precision() {
        let parsed =
            round_trip(Column::new("c", ColumnType::DECIMAL, true).with_precision(12, 2));
        assert_eq!(parsed.precision, Some(12));
        assert_eq!(parsed.scale, Some(2));
    }

    #[test]
    fn test_sqlite_format_text_as_clob() {
        let mapper = SqliteTypeMapper;
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::TEXT, true)),
            "CLOB"
        );
    }
}

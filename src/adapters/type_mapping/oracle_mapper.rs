// Oracle用型マッパー

use super::common::{decimal_precision, split_type_args, string_length};
use super::{SqlType, TypeMapper, TypeMetadata};
use crate::core::schema::{Column, ColumnType};

/// Oracle用型マッパー
pub struct OracleTypeMapper;

impl TypeMapper for OracleTypeMapper {
    fn parse_sql_type(&self, sql_type: &str, metadata: &TypeMetadata) -> Option<SqlType> {
        let (base, args) = split_type_args(sql_type);

        let parsed = match (base.as_str(), args.as_slice()) {
            ("number", [1]) => SqlType::plain(ColumnType::BOOLEAN),
            ("number", [5]) => SqlType::plain(ColumnType::SMALLINT),
            ("number", [10]) => SqlType::plain(ColumnType::INTEGER),
            ("number", [20]) => SqlType::plain(ColumnType::BIGINT),
            ("number", [precision, scale]) => SqlType::decimal(Some(*precision), Some(*scale)),
            ("number", _) => SqlType::decimal(metadata.numeric_precision, metadata.numeric_scale),
            ("varchar2" | "nvarchar2" | "char", _) => SqlType::with_length(
                ColumnType::STRING,
                args.first().copied().or(metadata.char_max_length),
            ),
            ("clob" | "nclob", _) => SqlType::plain(ColumnType::TEXT),
            ("binary_double" | "double precision" | "float", _) => {
                SqlType::plain(ColumnType::FLOAT)
            }
            ("date", _) => SqlType::plain(ColumnType::DATE),
            ("timestamp", _) => SqlType::plain(ColumnType::DATETIME),
            ("blob", _) => SqlType::plain(ColumnType::BLOB),
            _ => return None,
        };
        Some(parsed)
    }

    fn format_sql_type(&self, column: &Column) -> String {
        match column.column_type {
            ColumnType::SMALLINT => "NUMBER(5)".to_string(),
            ColumnType::INTEGER => "NUMBER(10)".to_string(),
            ColumnType::BIGINT => "NUMBER(20)".to_string(),
            ColumnType::STRING => format!("VARCHAR2({})", string_length(column)),
            ColumnType::TEXT | ColumnType::JSON => "CLOB".to_string(),
            ColumnType::BOOLEAN => "NUMBER(1)".to_string(),
            ColumnType::DECIMAL => {
                let (precision, scale) = decimal_precision(column);
                format!("NUMBER({}, {})", precision, scale)
            }
            ColumnType::FLOAT => "DOUBLE PRECISION".to_string(),
            ColumnType::DATE | ColumnType::TIME => "DATE".to_string(),
            ColumnType::DATETIME => "TIMESTAMP(0)".to_string(),
            ColumnType::BLOB => "BLOB".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_format_types() {
        let mapper = OracleTypeMapper;
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::BOOLEAN, true)),
            "NUMBER(1)"
        );
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::STRING, true).with_length(64)),
            "VARCHAR2(64)"
        );
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::DATETIME, true)),
            "TIMESTAMP(0)"
        );
    }

    #[test]
    fn test_oracle_parse_number_widths() {
        let mapper = OracleTypeMapper;
        let metadata = TypeMetadata::default();
        assert_eq!(
            mapper.parse_sql_type("NUMBER(20)", &metadata).unwrap().column_type,
            ColumnType::BIGINT
        );
        assert_eq!(
            mapper.parse_sql_type("NUMBER(1)", &metadata).unwrap().column_type,
            ColumnType::BOOLEAN
        );
    }
}

// MySQL用型マッパー
//
// information_schema.columns.COLUMN_TYPE（"int(10) unsigned" など）を解釈します。

use super::common::{format_common_sql_type, is_unsigned, split_type_args};
use super::{SqlType, TypeMapper, TypeMetadata};
use crate::core::schema::{Column, ColumnType};

/// MySQL用型マッパー
pub struct MySqlTypeMapper;

impl TypeMapper for MySqlTypeMapper {
    fn parse_sql_type(&self, sql_type: &str, metadata: &TypeMetadata) -> Option<SqlType> {
        let (base, args) = split_type_args(sql_type);

        let mut parsed = match base.as_str() {
            "tinyint" if args.first() == Some(&1) => SqlType::plain(ColumnType::BOOLEAN),
            "bool" | "boolean" => SqlType::plain(ColumnType::BOOLEAN),
            "tinyint" | "smallint" => SqlType::plain(ColumnType::SMALLINT),
            "mediumint" | "int" | "integer" => SqlType::plain(ColumnType::INTEGER),
            "bigint" => SqlType::plain(ColumnType::BIGINT),
            "varchar" | "char" => SqlType::with_length(
                ColumnType::STRING,
                args.first().copied().or(metadata.char_max_length),
            ),
            "tinytext" | "text" | "mediumtext" | "longtext" => SqlType::plain(ColumnType::TEXT),
            "decimal" | "numeric" => SqlType::decimal(
                args.first().copied().or(metadata.numeric_precision),
                args.get(1).copied().or(metadata.numeric_scale),
            ),
            "double" | "double precision" | "float" | "real" => SqlType::plain(ColumnType::FLOAT),
            "date" => SqlType::plain(ColumnType::DATE),
            "time" => SqlType::plain(ColumnType::TIME),
            "datetime" | "timestamp" => SqlType::plain(ColumnType::DATETIME),
            "json" => SqlType::plain(ColumnType::JSON),
            "tinyblob" | "blob" | "mediumblob" | "longblob" | "varbinary" | "binary" => {
                SqlType::plain(ColumnType::BLOB)
            }
            _ => return None,
        };

        if parsed.column_type.is_integer() {
            parsed.unsigned = is_unsigned(sql_type);
        }
        Some(parsed)
    }

    fn format_sql_type(&self, column: &Column) -> String {
        let base = match column.column_type {
            ColumnType::INTEGER => "INT".to_string(),
            ColumnType::TEXT => "LONGTEXT".to_string(),
            ColumnType::BOOLEAN => "TINYINT(1)".to_string(),
            ColumnType::FLOAT => "DOUBLE PRECISION".to_string(),
            ColumnType::TIME => "TIME".to_string(),
            ColumnType::DATETIME => "DATETIME".to_string(),
            ColumnType::JSON => "JSON".to_string(),
            ColumnType::BLOB => "LONGBLOB".to_string(),
            _ => format_common_sql_type(column).unwrap_or_else(|| "LONGTEXT".to_string()),
        };

        if column.unsigned && column.column_type.is_integer() {
            format!("{} UNSIGNED", base)
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mysql_boolean_is_tinyint_one() {
        let mapper = MySqlTypeMapper;
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::BOOLEAN, true)),
            "TINYINT(1)"
        );
        let parsed = mapper
            .parse_sql_type("tinyint(1)", &TypeMetadata::default())
            .unwrap();
        assert_eq!(parsed.column_type, ColumnType::BOOLEAN);
    }

    #[test]
    fn test_mysql_unsigned_integer() {
        let mapper = MySqlTypeMapper;
        let column = Column::new("c", ColumnType::BIGINT, false).with_unsigned(true);
        assert_eq!(mapper.format_sql_type(&column), "BIGINT UNSIGNED");

        let parsed = mapper
            .parse_sql_type("bigint(20) unsigned", &TypeMetadata::default())
            .unwrap();
        assert_eq!(parsed.column_type, ColumnType::BIGINT);
        assert!(parsed.unsigned);
    }

    #[test]
    fn test_mysql_text_and_decimal() {
        let mapper = MySqlTypeMapper;
        assert_eq!(
            mapper
                .parse_sql_type("longtext", &TypeMetadata::default())
                .unwrap()
                .column_type,
            ColumnType::TEXT
        );
        let parsed = mapper
            .parse_sql_type("decimal(12,2)", &TypeMetadata::default())
            .unwrap();
        assert_eq!(parsed.precision, Some(12));
        assert_eq!(parsed.scale, Some(2));
    }
}

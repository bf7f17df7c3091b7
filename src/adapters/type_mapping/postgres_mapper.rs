// PostgreSQL用型マッパー

use super::common::{format_common_sql_type, split_type_args};
use super::{SqlType, TypeMapper, TypeMetadata};
use crate::core::schema::{Column, ColumnType};

/// PostgreSQL用型マッパー
pub struct PostgresTypeMapper;

impl TypeMapper for PostgresTypeMapper {
    fn parse_sql_type(&self, sql_type: &str, metadata: &TypeMetadata) -> Option<SqlType> {
        let (base, args) = split_type_args(sql_type);

        let parsed = match base.as_str() {
            "integer" | "int4" | "int" => SqlType::plain(ColumnType::INTEGER),
            "smallint" | "int2" => SqlType::plain(ColumnType::SMALLINT),
            "bigint" | "int8" => SqlType::plain(ColumnType::BIGINT),
            "character varying" | "varchar" | "character" | "char" | "bpchar" => {
                SqlType::with_length(
                    ColumnType::STRING,
                    metadata.char_max_length.or(args.first().copied()),
                )
            }
            "text" => SqlType::plain(ColumnType::TEXT),
            "boolean" | "bool" => SqlType::plain(ColumnType::BOOLEAN),
            "numeric" | "decimal" => SqlType::decimal(
                metadata.numeric_precision.or(args.first().copied()),
                metadata.numeric_scale.or(args.get(1).copied()),
            ),
            "double precision" | "float8" | "real" | "float4" => {
                SqlType::plain(ColumnType::FLOAT)
            }
            "date" => SqlType::plain(ColumnType::DATE),
            "time without time zone" | "time with time zone" | "time" | "timetz" => {
                SqlType::plain(ColumnType::TIME)
            }
            "timestamp without time zone" | "timestamp with time zone" | "timestamp"
            | "timestamptz" => SqlType::plain(ColumnType::DATETIME),
            "json" | "jsonb" => SqlType::plain(ColumnType::JSON),
            "bytea" => SqlType::plain(ColumnType::BLOB),
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
            ColumnType::TEXT => "TEXT".to_string(),
            ColumnType::BOOLEAN => "BOOLEAN".to_string(),
            ColumnType::FLOAT => "DOUBLE PRECISION".to_string(),
            ColumnType::TIME => "TIME(0) WITHOUT TIME ZONE".to_string(),
            ColumnType::DATETIME => "TIMESTAMP(0) WITHOUT TIME ZONE".to_string(),
            ColumnType::JSON => "JSON".to_string(),
            ColumnType::BLOB => "BYTEA".to_string(),
            _ => "TEXT".to_string(),
        }
    }

    fn format_boolean(&self, value: bool) -> String {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_format_types() {
        let mapper = PostgresTypeMapper;
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::STRING, true)),
            "VARCHAR(255)"
        );
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::DATETIME, true)),
            "TIMESTAMP(0) WITHOUT TIME ZONE"
        );
        assert_eq!(
            mapper.format_sql_type(&Column::new("c", ColumnType::BLOB, true)),
            "BYTEA"
        );
    }

    #[test]
    fn test_postgres_parse_information_schema_types() {
        let mapper = PostgresTypeMapper;
        let metadata = TypeMetadata {
            char_max_length: Some(64),
            ..Default::default()
        };
        let parsed = mapper
            .parse_sql_type("character varying", &metadata)
            .unwrap();
        assert_eq!(parsed.column_type, ColumnType::STRING);
        assert_eq!(parsed.length, Some(64));

        let parsed = mapper
            .parse_sql_type("timestamp without time zone", &TypeMetadata::default())
            .unwrap();
        assert_eq!(parsed.column_type, ColumnType::DATETIME);
    }
}

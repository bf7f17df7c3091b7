// 共通型フォーマットロジック
//
// 複数のプラットフォームで共通する型文字列の分解、リテラルのクォート、
// デフォルト値式の解釈を提供します。

use crate::core::schema::{Column, ColumnDefault, ColumnType};

/// 長さ指定のないSTRINGの長さ
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// 精度指定のないDECIMALの精度
pub const DEFAULT_DECIMAL_PRECISION: u32 = 10;

/// スケール指定のないDECIMALのスケール
pub const DEFAULT_DECIMAL_SCALE: u32 = 0;

/// 文字列カラムの実効長
pub fn string_length(column: &Column) -> u32 {
    column.length.unwrap_or(DEFAULT_STRING_LENGTH)
}

/// DECIMALカラムの実効精度とスケール
pub fn decimal_precision(column: &Column) -> (u32, u32) {
    (
        column.precision.unwrap_or(DEFAULT_DECIMAL_PRECISION),
        column.scale.unwrap_or(DEFAULT_DECIMAL_SCALE),
    )
}

/// 型文字列を基本名と引数に分解
///
/// "varchar(255)" -> ("varchar", [255])
/// "NUMERIC(12, 2)" -> ("numeric", [12, 2])
/// "int(10) unsigned" -> ("int", [10])
pub fn split_type_args(sql_type: &str) -> (String, Vec<u32>) {
    let lower = sql_type.trim().to_lowercase();
    let Some(open) = lower.find('(') else {
        let base = lower
            .trim_end_matches(" unsigned")
            .trim_end_matches(" zerofill")
            .trim()
            .to_string();
        return (base, Vec::new());
    };

    let base = lower[..open].trim().to_string();
    let args = match lower[open + 1..].find(')') {
        Some(close) => lower[open + 1..open + 1 + close]
            .split(',')
            .filter_map(|arg| arg.trim().parse::<u32>().ok())
            .collect(),
        None => Vec::new(),
    };
    (base, args)
}

/// 型文字列が符号なしかどうか
pub fn is_unsigned(sql_type: &str) -> bool {
    sql_type.to_lowercase().contains("unsigned")
}

/// 文字列リテラルをクォート
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// 共通SQL型のフォーマット
///
/// 複数のプラットフォームで同一の出力となる型変換を行います。
/// プラットフォーム固有の変換が必要な場合は `None` を返します。
pub fn format_common_sql_type(column: &Column) -> Option<String> {
    match column.column_type {
        ColumnType::STRING => Some(format!("VARCHAR({})", string_length(column))),
        ColumnType::DECIMAL => {
            let (precision, scale) = decimal_precision(column);
            Some(format!("NUMERIC({}, {})", precision, scale))
        }
        ColumnType::DATE => Some("DATE".to_string()),
        ColumnType::SMALLINT => Some("SMALLINT".to_string()),
        ColumnType::BIGINT => Some("BIGINT".to_string()),
        _ => None,
    }
}

/// デフォルト値式を論理値に変換
///
/// PostgreSQLの型キャスト（`'foo'::character varying`）や括弧、
/// シングルクォートを取り除いたうえでカラム型に合わせて解釈します。
/// NULLや関数呼び出し（`nextval(...)` など）は None を返します。
pub fn parse_default_literal(column_type: ColumnType, raw: &str) -> Option<ColumnDefault> {
    let mut value = strip_cast(raw.trim()).trim();
    while value.starts_with('(') && value.ends_with(')') && value.len() >= 2 {
        value = value[1..value.len() - 1].trim();
    }

    if value.eq_ignore_ascii_case("null") {
        return None;
    }

    let quoted = value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'');
    if !quoted && value.contains('(') {
        return None;
    }

    let literal = if quoted {
        value[1..value.len() - 1].replace("''", "'")
    } else {
        value.to_string()
    };

    if column_type.is_integer() {
        return match literal.parse::<i64>() {
            Ok(number) => Some(ColumnDefault::Integer(number)),
            Err(_) => Some(ColumnDefault::Text(literal)),
        };
    }

    if column_type == ColumnType::BOOLEAN {
        return match literal.to_lowercase().as_str() {
            "1" | "true" | "t" => Some(ColumnDefault::Boolean(true)),
            "0" | "false" | "f" => Some(ColumnDefault::Boolean(false)),
            _ => Some(ColumnDefault::Text(literal)),
        };
    }

    Some(ColumnDefault::Text(literal))
}

fn strip_cast(value: &str) -> &str {
    // クォートの外側にある最後の "::" 以降を取り除く
    let search_from = if value.starts_with('\'') {
        value.rfind('\'').unwrap_or(0)
    } else {
        0
    };
    match value[search_from..].find("::") {
        Some(pos) => &value[..search_from + pos],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_type_args() {
        assert_eq!(split_type_args("varchar(255)"), ("varchar".to_string(), vec![255]));
        assert_eq!(
            split_type_args("NUMERIC(12, 2)"),
            ("numeric".to_string(), vec![12, 2])
        );
        assert_eq!(split_type_args("int(10) unsigned"), ("int".to_string(), vec![10]));
        assert_eq!(split_type_args("bigint unsigned"), ("bigint".to_string(), vec![]));
        assert_eq!(split_type_args("CLOB"), ("clob".to_string(), vec![]));
    }

    #[test]
    fn test_parse_default_postgres_cast() {
        assert_eq!(
            parse_default_literal(ColumnType::STRING, "'foo'::character varying"),
            Some(ColumnDefault::Text("foo".to_string()))
        );
        assert_eq!(
            parse_default_literal(ColumnType::INTEGER, "'-1'::integer"),
            Some(ColumnDefault::Integer(-1))
        );
        assert_eq!(
            parse_default_literal(ColumnType::BOOLEAN, "false"),
            Some(ColumnDefault::Boolean(false))
        );
    }

    #[test]
    fn test_parse_default_quoted_and_parenthesized() {
        assert_eq!(
            parse_default_literal(ColumnType::STRING, "'it''s'"),
            Some(ColumnDefault::Text("it's".to_string()))
        );
        assert_eq!(
            parse_default_literal(ColumnType::INTEGER, "(0)"),
            Some(ColumnDefault::Integer(0))
        );
        assert_eq!(
            parse_default_literal(ColumnType::BOOLEAN, "1"),
            Some(ColumnDefault::Boolean(true))
        );
        assert_eq!(
            parse_default_literal(ColumnType::STRING, "''"),
            Some(ColumnDefault::Text(String::new()))
        );
    }

    #[test]
    fn test_parse_default_ignores_functions_and_null() {
        assert_eq!(
            parse_default_literal(ColumnType::INTEGER, "nextval('users_id_seq'::regclass)"),
            None
        );
        assert_eq!(parse_default_literal(ColumnType::STRING, "NULL"), None);
    }
}

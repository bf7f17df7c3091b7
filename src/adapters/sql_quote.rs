// SQL識別子クォートユーティリティ
//
// 各プラットフォーム用の識別子クォート関数を提供します。
// sql_generator、イントロスペクター、台帳の全てから使用される共有モジュールです。

use crate::core::platform::Platform;

/// ダブルクォートによる識別子クォート（PostgreSQL, SQLite, Oracle）
///
/// 識別子内のダブルクォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use schemata::adapters::sql_quote::quote_identifier_ansi;
/// assert_eq!(quote_identifier_ansi("users"), r#""users""#);
/// assert_eq!(quote_identifier_ansi(r#"table"name"#), r#""table""name""#);
/// ```
pub fn quote_identifier_ansi(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// MySQL用識別子クォート（バッククォート）
///
/// 識別子内のバッククォートは二重にエスケープします。
///
/// # Examples
/// ```
/// use schemata::adapters::sql_quote::quote_identifier_mysql;
/// assert_eq!(quote_identifier_mysql("users"), "`users`");
/// assert_eq!(quote_identifier_mysql("table`name"), "`table``name`");
/// ```
pub fn quote_identifier_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// プラットフォームに応じた識別子クォート
pub fn quote_identifier(platform: Platform, name: &str) -> String {
    match platform {
        Platform::MySQL => quote_identifier_mysql(name),
        Platform::PostgreSQL | Platform::SQLite | Platform::Oracle => quote_identifier_ansi(name),
    }
}

/// カラム名リストをクォートしてカンマ区切りで結合
pub fn quote_columns(platform: Platform, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(platform, c))
        .collect::<Vec<_>>()
        .join(", ")
}

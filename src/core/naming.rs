// 命名ポリシー
//
// 設定ファイル名、プレースホルダー、台帳テーブル名の単一ソースを提供します。

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".schemata.yaml";

/// レガシーXMLスキーマ内のテーブルプレフィックスのプレースホルダー
pub const PREFIX_PLACEHOLDER: &str = "*dbprefix*";

/// マイグレーション台帳テーブルの論理名
pub const LEDGER_TABLE: &str = "migrations";

/// 台帳テーブルの物理名を組み立てる
pub fn ledger_table_name(prefix: &str) -> String {
    format!("{}{}", prefix, LEDGER_TABLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_table_name() {
        assert_eq!(ledger_table_name("oc_"), "oc_migrations");
        assert_eq!(ledger_table_name(""), "migrations");
    }

    #[test]
    fn test_names() {
        assert_eq!(CONFIG_FILE, ".schemata.yaml");
        assert_eq!(PREFIX_PLACEHOLDER, "*dbprefix*");
    }
}

// 設定ファイル管理
//
// 設定ファイル（YAML形式）の読み込みと検証を行います。
// キー名はサーバー設定（dbtype, dbhost, dbtableprefix など）に合わせています。

use crate::core::platform::Platform;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 接続設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// データベース種別（sqlite3, mysql, pgsql, oci とその別名）
    #[serde(default = "default_dbtype")]
    pub dbtype: String,

    /// ホスト（"host", "host:port", "host:/path/to/socket"）
    #[serde(default = "default_host")]
    pub dbhost: String,

    /// データベース名
    pub dbname: String,

    /// ユーザー名
    #[serde(default)]
    pub dbuser: Option<String>,

    /// パスワード
    #[serde(default)]
    pub dbpassword: Option<String>,

    /// テーブルプレフィックス
    #[serde(default = "default_table_prefix")]
    pub dbtableprefix: String,

    /// データディレクトリ（SQLiteのデータベースファイルの配置先）
    #[serde(default = "default_data_directory")]
    pub datadirectory: PathBuf,

    /// 接続タイムアウト（秒）
    #[serde(default)]
    pub timeout: Option<u64>,

    /// CLIが既定で扱う名前空間
    #[serde(default = "default_app")]
    pub app: String,
}

fn default_dbtype() -> String {
    "sqlite3".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_table_prefix() -> String {
    "oc_".to_string()
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("data")
}

fn default_app() -> String {
    "core".to_string()
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 設定ファイルを読み込む
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = content.parse()?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// プラットフォームを取得（別名を正規化）
    pub fn platform(&self) -> Result<Platform> {
        Platform::normalize(&self.dbtype).ok_or_else(|| {
            anyhow!(
                "Unsupported database type: {}. Please specify one of: sqlite3, mysql, pgsql, oci.",
                self.dbtype
            )
        })
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        if self.dbname.is_empty() {
            return Err(anyhow!("Database name is not specified"));
        }

        self.platform()?;

        let prefix_pattern = Regex::new(r"^[A-Za-z0-9_]*$")?;
        if !prefix_pattern.is_match(&self.dbtableprefix) {
            return Err(anyhow!(
                "Invalid table prefix '{}': only letters, digits and underscores are allowed",
                self.dbtableprefix
            ));
        }

        Ok(())
    }
}

/// std::str::FromStrトレイトの実装
impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = "dbname: cloud\n".parse().unwrap();

        assert_eq!(config.dbtype, "sqlite3");
        assert_eq!(config.dbhost, "localhost");
        assert_eq!(config.dbtableprefix, "oc_");
        assert_eq!(config.app, "core");
        assert_eq!(config.platform().unwrap(), Platform::SQLite);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
dbtype: postgres
dbhost: db.internal:5433
dbname: cloud
dbuser: admin
dbpassword: secret
dbtableprefix: nc_
timeout: 10
"#;
        let config: Config = yaml.parse().unwrap();

        assert_eq!(config.platform().unwrap(), Platform::PostgreSQL);
        assert_eq!(config.dbuser.as_deref(), Some("admin"));
        assert_eq!(config.dbtableprefix, "nc_");
        assert_eq!(config.timeout, Some(10));
    }

    #[test]
    fn test_validate_rejects_unknown_type() {
        let config: Config = "dbtype: mssql\ndbname: cloud\n".parse().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let config: Config = "dbname: cloud\ndbtableprefix: \"oc-\"\n".parse().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        let config: Config = "dbname: \"\"\n".parse().unwrap();
        assert!(config.validate().is_err());
    }
}

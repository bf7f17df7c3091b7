// コマンド共通コンテキスト
//
// 設定ファイル読み込みと接続確立の重複をCLI層で集約する。

use crate::adapters::connection::SqlxConnection;
use crate::adapters::database::ConnectionFactory;
use crate::core::config::Config;
use crate::core::error::DatabaseError;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// 設定ファイルを読み込んでコンテキストを作成
    ///
    /// # Arguments
    /// * `custom_config_path` - 指定がない場合はカレントディレクトリの `.schemata.yaml`
    pub fn load(custom_config_path: Option<&Path>) -> Result<Self> {
        let config_path = custom_config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(Config::DEFAULT_CONFIG_PATH));

        if !config_path.exists() {
            return Err(anyhow!("Config file not found: {:?}", config_path));
        }

        let config = Config::from_file(&config_path)
            .with_context(|| format!("Failed to read config file {:?}", config_path))?;
        config.validate().with_context(|| "Invalid configuration")?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// データベースに接続
    pub async fn connect(&self) -> Result<SqlxConnection> {
        ConnectionFactory::new()
            .connect(&self.config)
            .await
            .with_context(|| "Failed to connect to database")
    }
}

/// 処理結果と切断結果をまとめる
///
/// 処理が失敗していればそのエラーを返し、切断のエラーは処理が成功した場合のみ返します。
pub fn finish_with_close<T>(result: Result<T>, closed: Result<(), DatabaseError>) -> Result<T> {
    let value = result?;
    closed.with_context(|| "Failed to close database connection")?;
    Ok(value)
}

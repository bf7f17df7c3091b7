// statusコマンドハンドラー
//
// 名前空間ごとのマイグレーション台帳を表示します。
// マイグレーションディレクトリが指定された場合は未適用のバージョンも表示します。

use crate::cli::command_context::{finish_with_close, CommandContext};
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::migration::{MigrationAlias, MigrationRegistry};
use crate::services::migration_service::{resolve_alias, MigrationService};
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 名前空間（指定がない場合は設定ファイルの `app`）
    pub app: Option<String>,
    /// マイグレーションディレクトリ
    pub migrations_dir: Option<PathBuf>,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// statusコマンドの出力
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub app: String,
    pub migrated: Vec<String>,
    pub pending: Vec<String>,
    pub current: String,
    pub latest: String,
}

impl CommandOutput for StatusOutput {
    fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "Namespace:".bold(), self.app));
        output.push_str(&format!("Current version: {}\n", self.current.cyan()));
        output.push_str(&format!("Latest version:  {}\n", self.latest.cyan()));

        if self.migrated.is_empty() && self.pending.is_empty() {
            output.push_str(&format!("\n{}", "No migrations recorded.".yellow()));
            return output;
        }

        output.push('\n');
        for version in &self.migrated {
            output.push_str(&format!("  {} {}\n", "Migrated".green(), version));
        }
        for version in &self.pending {
            output.push_str(&format!("  {}  {}\n", "Pending".yellow(), version));
        }
        output.push_str(&format!(
            "\n{} migrated, {} pending",
            self.migrated.len(),
            self.pending.len()
        ));
        output
    }
}

/// statusコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let app = command
            .app
            .clone()
            .unwrap_or_else(|| context.config.app.clone());

        let mut registry = MigrationRegistry::new(&app);
        if let Some(dir) = &command.migrations_dir {
            let found = registry.discover_directory(dir)?;
            tracing::debug!(dir = %dir.display(), found, "Discovered migration versions");
        }

        let connection = context.connect().await?;
        let mut service = MigrationService::new(&app, connection, registry);
        let migrated = service
            .get_migrated_versions()
            .await
            .with_context(|| "Failed to read migration ledger");
        let available = service.get_available_versions();
        let closed = service.into_connection().close().await;
        let migrated = finish_with_close(migrated, closed)?;

        let output = build_status(&app, &available, &migrated)?;
        render_output(&output, &command.format)
    }
}

/// 台帳と利用可能バージョンから表示内容を組み立てる
pub fn build_status(app: &str, available: &[String], migrated: &[String]) -> Result<StatusOutput> {
    let current = resolve_alias(MigrationAlias::Current, available, migrated)?;
    let latest = resolve_alias(MigrationAlias::Latest, available, migrated)?;
    let pending = available
        .iter()
        .filter(|v| !migrated.contains(v))
        .cloned()
        .collect();

    Ok(StatusOutput {
        app: app.to_string(),
        migrated: migrated.to_vec(),
        pending,
        current,
        latest,
    })
}

// applyコマンドハンドラー
//
// XMLスキーマファイルをデータベースに適用します。
// ファイルのテーブルは同名の既存テーブルを置き換え、それ以外のテーブルは変更しません。

use crate::cli::command_context::{finish_with_close, CommandContext};
use crate::services::migrator::MigrationSummary;
use crate::services::schema_manager::SchemaManager;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

/// applyコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct ApplyCommand {
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// XMLスキーマファイル
    pub file: PathBuf,
    /// Dry run - 実行せずにSQLを表示
    pub dry_run: bool,
}

/// applyコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct ApplyCommandHandler {}

impl ApplyCommandHandler {
    /// 新しいApplyCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// applyコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は実行したSQLの概要、失敗時はエラーメッセージ
    pub async fn execute(&self, command: &ApplyCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let mut connection = context.connect().await?;

        let summary = {
            let mut manager = SchemaManager::new(&mut connection);
            manager
                .update_db_from_structure(&command.file, command.dry_run)
                .await
                .with_context(|| format!("Failed to apply {}", command.file.display()))
        };
        let closed = connection.close().await;
        let summary = finish_with_close(summary, closed)?;

        Ok(self.format_summary(&summary, command.dry_run))
    }

    fn format_summary(&self, summary: &MigrationSummary, dry_run: bool) -> String {
        if summary.is_noop() {
            return "Database is up to date.".green().to_string();
        }

        let mut output = String::new();
        if dry_run {
            output.push_str(&format!("{}\n\n", "Dry run - SQL to be executed:".yellow().bold()));
            for statement in &summary.statements {
                output.push_str(statement);
                output.push_str(";\n");
            }
            output.push_str(&format!("\n{} statement(s)", summary.statements.len()));
            return output;
        }

        output.push_str(&format!(
            "{} {} statement(s) executed",
            "✓".green(),
            summary.executed
        ));
        output
    }
}

// diffコマンドハンドラー
//
// XMLスキーマファイルを適用した場合の差分とSQLを表示します（データベースは変更しません）。

use crate::cli::command_context::{finish_with_close, CommandContext};
use crate::cli::commands::{render_output, CommandOutput};
use crate::cli::OutputFormat;
use crate::core::schema_diff::SchemaDiff;
use crate::services::migrator::MigrationPlan;
use crate::services::schema_manager::SchemaManager;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

/// diffコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct DiffCommand {
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// XMLスキーマファイル
    pub file: PathBuf,
    /// 出力フォーマット
    pub format: OutputFormat,
}

/// diffコマンドの出力
#[derive(Debug, Clone, Serialize)]
pub struct DiffOutput {
    pub diff: SchemaDiff,
    pub statements: Vec<String>,
}

impl From<MigrationPlan> for DiffOutput {
    fn from(plan: MigrationPlan) -> Self {
        Self {
            diff: plan.diff,
            statements: plan.statements,
        }
    }
}

impl CommandOutput for DiffOutput {
    fn to_text(&self) -> String {
        if self.diff.is_empty() {
            return "No changes detected.".green().to_string();
        }

        let mut output = String::new();
        for table in &self.diff.added_tables {
            output.push_str(&format!("  {} table {}\n", "+".green(), table.name));
        }
        for table in &self.diff.modified_tables {
            output.push_str(&format!("  {} table {}\n", "~".yellow(), table.table_name));
        }
        for name in &self.diff.removed_tables {
            output.push_str(&format!("  {} table {}\n", "-".red(), name));
        }
        for sequence in &self.diff.added_sequences {
            output.push_str(&format!("  {} sequence {}\n", "+".green(), sequence.name));
        }
        for name in &self.diff.removed_sequences {
            output.push_str(&format!("  {} sequence {}\n", "-".red(), name));
        }

        output.push_str(&format!("\n{}\n", "SQL:".bold()));
        for statement in &self.statements {
            output.push_str(statement);
            output.push_str(";\n");
        }
        output
    }
}

/// diffコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct DiffCommandHandler {}

impl DiffCommandHandler {
    /// 新しいDiffCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// diffコマンドを実行
    pub async fn execute(&self, command: &DiffCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let mut connection = context.connect().await?;

        let plan = {
            let mut manager = SchemaManager::new(&mut connection);
            manager
                .plan_structure(&command.file)
                .await
                .with_context(|| format!("Failed to diff {}", command.file.display()))
        };
        let closed = connection.close().await;
        let plan = finish_with_close(plan, closed)?;

        render_output(&DiffOutput::from(plan), &command.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Table;

    #[test]
    fn test_empty_diff_text() {
        let output = DiffOutput {
            diff: SchemaDiff::new(),
            statements: Vec::new(),
        };
        assert!(output.to_text().contains("No changes detected."));
    }

    #[test]
    fn test_added_table_json() {
        let mut diff = SchemaDiff::new();
        diff.added_tables.push(Table::new("oc_users"));
        let output = DiffOutput {
            diff,
            statements: vec!["CREATE TABLE \"oc_users\" ()".to_string()],
        };

        assert!(output.to_text().contains("table oc_users"));
        let json = render_output(&output, &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["diff"]["added_tables"][0]["name"], "oc_users");
        assert_eq!(value["statements"].as_array().unwrap().len(), 1);
    }
}

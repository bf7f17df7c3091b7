// checkコマンドハンドラー
//
// XMLスキーマファイルを現在のデータベースに対して検証します。
// 識別子長の違反はエラー、自動修復と主キーなしのテーブルは警告として表示します。

use crate::cli::command_context::{finish_with_close, CommandContext};
use crate::services::naming_validator::ValidationReport;
use crate::services::schema_manager::SchemaManager;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

/// checkコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct CheckCommand {
    /// カスタム設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// XMLスキーマファイル
    pub file: PathBuf,
}

/// checkコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct CheckCommandHandler {}

impl CheckCommandHandler {
    /// 新しいCheckCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// checkコマンドを実行
    pub async fn execute(&self, command: &CheckCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.as_deref())?;
        let mut connection = context.connect().await?;

        let report = {
            let mut manager = SchemaManager::new(&mut connection);
            manager
                .check_structure(&command.file)
                .await
                .with_context(|| format!("{} failed validation", command.file.display()))
        };
        let closed = connection.close().await;
        let report = finish_with_close(report, closed)?;

        Ok(self.format_report(&report))
    }

    fn format_report(&self, report: &ValidationReport) -> String {
        let mut output = String::new();
        for repair in &report.repairs {
            output.push_str(&format!("{} {}\n", "Repaired:".yellow(), repair));
        }
        for warning in &report.warnings {
            output.push_str(&format!("{} {}\n", "Warning:".yellow(), warning));
        }

        if report.repairs.is_empty() && report.warnings.is_empty() {
            output.push_str(&format!("{} Schema file is valid", "✓".green()));
        } else {
            output.push_str(&format!(
                "{} Schema file is valid ({} repair(s), {} warning(s))",
                "✓".green(),
                report.repairs.len(),
                report.warnings.len()
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Schema;
    use crate::services::naming_validator::Repair;

    #[test]
    fn test_format_clean_report() {
        let handler = CheckCommandHandler::new();
        let report = ValidationReport {
            schema: Schema::new(),
            repairs: Vec::new(),
            warnings: Vec::new(),
        };
        assert!(handler.format_report(&report).ends_with("Schema file is valid"));
    }

    #[test]
    fn test_format_report_with_repairs() {
        let handler = CheckCommandHandler::new();
        let report = ValidationReport {
            schema: Schema::new(),
            repairs: vec![Repair {
                table: "flags".to_string(),
                column: "enabled".to_string(),
            }],
            warnings: vec!["Table \"log\" has no primary key".to_string()],
        };

        let output = handler.format_report(&report);
        assert!(output.contains("\"flags\".\"enabled\""));
        assert!(output.contains("1 repair(s), 1 warning(s)"));
    }
}

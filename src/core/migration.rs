// マイグレーションドメインモデル
//
// バージョン付きマイグレーションステップの定義、登録、状態を表現する型システム。
// MigrationStep, MigrationRegistry, StepState, MigrationAlias を提供します。

use crate::core::connection::Connection;
use crate::core::error::MigrationError;
use crate::core::schema::Schema;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// どのバージョンも実行されていないことを表すバージョン
pub const NO_VERSION: &str = "0";

/// ステップのフックに渡されるオプション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOptions {
    /// テーブルプレフィックス
    pub table_prefix: String,
}

/// マイグレーションステップ
///
/// 名前空間ごとにアプリケーション作者が実装します。
/// スキーマは論理名（プレフィックスなし）で受け渡されます。
#[async_trait]
pub trait MigrationStep: Send + Sync {
    /// ステップの説明
    fn description(&self) -> String {
        String::new()
    }

    /// スキーマ変更前の処理
    async fn pre_schema_change(
        &self,
        _connection: &mut dyn Connection,
        _options: &StepOptions,
    ) -> Result<()> {
        Ok(())
    }

    /// スキーマ変更
    ///
    /// # Arguments
    /// * `schema` - 現在のスキーマ（論理名）
    ///
    /// # Returns
    /// 目標スキーマ。構造変更がない場合はNone
    async fn change_schema(
        &self,
        _connection: &mut dyn Connection,
        _schema: Schema,
        _options: &StepOptions,
    ) -> Result<Option<Schema>> {
        Ok(None)
    }

    /// スキーマ変更後の処理
    ///
    /// # Arguments
    /// * `schema` - 適用後のスキーマ（論理名）
    async fn post_schema_change(
        &self,
        _connection: &mut dyn Connection,
        _schema: &Schema,
        _options: &StepOptions,
    ) -> Result<()> {
        Ok(())
    }
}

/// ステップを生成するファクトリ
pub type StepFactory = Box<dyn Fn() -> Box<dyn MigrationStep> + Send + Sync>;

/// マイグレーションステップのレジストリ
///
/// バージョン文字列からファクトリへの明示的な対応表です。
/// 利用可能なバージョンはファクトリの登録またはディレクトリ探索で追加されます。
pub struct MigrationRegistry {
    app: String,
    available: BTreeSet<String>,
    factories: BTreeMap<String, StepFactory>,
}

impl MigrationRegistry {
    /// 新しいレジストリを作成
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            available: BTreeSet::new(),
            factories: BTreeMap::new(),
        }
    }

    /// 名前空間
    pub fn app(&self) -> &str {
        &self.app
    }

    /// ステップを登録
    pub fn register<F>(&mut self, version: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn MigrationStep> + Send + Sync + 'static,
    {
        self.available.insert(version.to_string());
        self.factories.insert(version.to_string(), Box::new(factory));
        self
    }

    /// ステップを登録したレジストリを返す
    pub fn with_step<F>(mut self, version: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn MigrationStep> + Send + Sync + 'static,
    {
        self.register(version, factory);
        self
    }

    /// ファクトリなしでバージョンを宣言
    pub fn declare_version(&mut self, version: &str) -> &mut Self {
        self.available.insert(version.to_string());
        self
    }

    /// マイグレーションディレクトリからバージョンを探索
    ///
    /// `Version<番号>Date<YYYYMMDDHHMMSS>.<拡張子>` 形式のファイル名から
    /// `<番号>Date<YYYYMMDDHHMMSS>` をバージョンとして取り出します。
    ///
    /// # Returns
    /// 見つかったバージョン数
    pub fn discover_directory(&mut self, dir: &Path) -> Result<usize> {
        let pattern = Regex::new(r"^Version(\d+Date\d{14})$")?;
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read migration directory: {}", dir.display()))?;

        let mut found = 0;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(captures) = pattern.captures(stem) {
                self.available.insert(captures[1].to_string());
                found += 1;
            }
        }

        Ok(found)
    }

    /// 利用可能なバージョン（昇順）
    pub fn available_versions(&self) -> Vec<String> {
        self.available.iter().cloned().collect()
    }

    /// バージョンが利用可能か確認
    pub fn has_version(&self, version: &str) -> bool {
        self.available.contains(version)
    }

    /// ステップを生成
    ///
    /// # Returns
    /// 未登録の場合は `MigrationError::UnknownStepClass`
    pub fn create_step(&self, version: &str) -> Result<Box<dyn MigrationStep>, MigrationError> {
        self.factories
            .get(version)
            .map(|factory| factory())
            .ok_or_else(|| MigrationError::UnknownStepClass {
                app: self.app.clone(),
                version: version.to_string(),
            })
    }
}

impl fmt::Debug for MigrationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRegistry")
            .field("app", &self.app)
            .field("available", &self.available)
            .field("registered", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// ステップの実行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// 探索済み・未実行
    Discovered,
    /// 変更前フック実行中
    Executing,
    /// スキーマ適用中
    SchemaApplying,
    /// 変更後フック実行中
    PostApplying,
    /// 台帳に記録済み（成功）
    Recorded,
    /// 失敗
    Failed,
}

impl StepState {
    /// 終端状態かどうか
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Recorded | StepState::Failed)
    }
}

/// バージョンのエイリアス
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationAlias {
    Current,
    Prev,
    Next,
    Latest,
}

impl FromStr for MigrationAlias {
    type Err = MigrationError;

    fn from_str(alias: &str) -> Result<Self, Self::Err> {
        match alias {
            "current" => Ok(MigrationAlias::Current),
            "prev" => Ok(MigrationAlias::Prev),
            "next" => Ok(MigrationAlias::Next),
            "latest" => Ok(MigrationAlias::Latest),
            other => Err(MigrationError::UnknownAlias {
                alias: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MigrationAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationAlias::Current => "current",
            MigrationAlias::Prev => "prev",
            MigrationAlias::Next => "next",
            MigrationAlias::Latest => "latest",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopStep;

    #[async_trait]
    impl MigrationStep for NoopStep {}

    #[test]
    fn test_registry_versions_sorted() {
        let registry = MigrationRegistry::new("core")
            .with_step("20240301000000", || Box::new(NoopStep))
            .with_step("20240101000000", || Box::new(NoopStep))
            .with_step("20240201000000", || Box::new(NoopStep));

        assert_eq!(
            registry.available_versions(),
            vec!["20240101000000", "20240201000000", "20240301000000"]
        );
        assert!(registry.has_version("20240201000000"));
    }

    #[test]
    fn test_create_step_unknown_class() {
        let mut registry = MigrationRegistry::new("core");
        registry.declare_version("20240101000000");

        let err = registry.create_step("20240101000000").err().unwrap();
        assert!(matches!(err, MigrationError::UnknownStepClass { .. }));
    }

    #[test]
    fn test_discover_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Version13000Date20170705121758.php"), "").unwrap();
        std::fs::write(dir.path().join("Version14000Date20180101000000.rs"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        let mut registry = MigrationRegistry::new("files");
        let found = registry.discover_directory(dir.path()).unwrap();

        assert_eq!(found, 2);
        assert_eq!(
            registry.available_versions(),
            vec!["13000Date20170705121758", "14000Date20180101000000"]
        );
    }

    #[test]
    fn test_alias_parse() {
        assert_eq!(
            "latest".parse::<MigrationAlias>().unwrap(),
            MigrationAlias::Latest
        );
        let err = "first".parse::<MigrationAlias>().unwrap_err();
        assert!(matches!(err, MigrationError::UnknownAlias { .. }));
    }

    #[test]
    fn test_terminal_states() {
        assert!(StepState::Recorded.is_terminal());
        assert!(StepState::Failed.is_terminal());
        assert!(!StepState::SchemaApplying.is_terminal());
    }
}

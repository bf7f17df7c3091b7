// マイグレーションサービス
//
// 名前空間（app）ごとのバージョン付きステップを実行し、台帳に記録します。
// 各ステップは 変更前フック -> スキーマ適用 -> 変更後フック -> 台帳記録 の順に進みます。

use crate::adapters::migration_ledger::MigrationLedger;
use crate::core::connection::Connection;
use crate::core::error::{MigrationError, StepPhase};
use crate::core::migration::{
    MigrationAlias, MigrationRegistry, StepOptions, StepState, NO_VERSION,
};
use crate::services::migrator::Migrator;
use crate::services::naming_validator::{NamingValidator, Repair};
use crate::services::schema_wrapper::SchemaWrapper;

/// 1ステップの実行結果
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// バージョン
    pub version: String,
    /// 通過した状態
    pub states: Vec<StepState>,
    /// 実行したSQL文の数
    pub statements: usize,
    /// バリデーターによる修復
    pub repairs: Vec<Repair>,
}

/// 失敗したステップ
#[derive(Debug)]
pub struct FailedStep {
    /// バージョン
    pub version: String,
    /// 原因
    pub error: MigrationError,
}

/// 一括実行の結果
///
/// 失敗したステップより前に記録されたバージョンは記録されたまま残ります。
#[derive(Debug, Default)]
pub struct MigrationRun {
    /// 実行済みのステップ
    pub executed: Vec<StepReport>,
    /// 最初に失敗したステップ
    pub failed: Option<FailedStep>,
}

impl MigrationRun {
    /// 実行済みのバージョン
    pub fn executed_versions(&self) -> Vec<String> {
        self.executed.iter().map(|r| r.version.clone()).collect()
    }

    /// 失敗があればエラーとして返す
    pub fn into_result(self) -> Result<Vec<StepReport>, MigrationError> {
        match self.failed {
            Some(failed) => Err(failed.error),
            None => Ok(self.executed),
        }
    }
}

/// マイグレーションサービス
pub struct MigrationService<C: Connection> {
    app: String,
    connection: C,
    registry: MigrationRegistry,
    ledger: MigrationLedger,
    migrator: Migrator,
    wrapper: SchemaWrapper,
}

impl<C: Connection> MigrationService<C> {
    /// 新しいMigrationServiceを作成
    ///
    /// # Arguments
    /// * `app` - 名前空間
    /// * `connection` - 接続
    /// * `registry` - ステップのレジストリ
    pub fn new(app: &str, connection: C, registry: MigrationRegistry) -> Self {
        let platform = connection.platform();
        let prefix = connection.prefix().to_string();
        Self {
            app: app.to_string(),
            ledger: MigrationLedger::new(platform, &prefix),
            migrator: Migrator::new(platform),
            wrapper: SchemaWrapper::new(&prefix, platform.profile()),
            connection,
            registry,
        }
    }

    /// 名前空間
    pub fn app(&self) -> &str {
        &self.app
    }

    /// 接続への参照
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// 接続への可変参照
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// 接続を取り出す
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// 台帳テーブルがなければ作成
    pub async fn ensure_ledger(&mut self) -> Result<(), MigrationError> {
        let current = self.connection.create_schema().await?;
        if current.has_table(self.ledger.table_name()) {
            return Ok(());
        }

        tracing::debug!(table = self.ledger.table_name(), "Creating migration ledger");
        let mut target = current;
        let mut ledger_table = MigrationLedger::logical_table();
        ledger_table.name = self.wrapper.physical_name(&ledger_table.name);
        target.add_table(ledger_table);
        self.migrator.migrate(&mut self.connection, &target).await?;
        Ok(())
    }

    /// 利用可能なバージョン（昇順）
    pub fn get_available_versions(&self) -> Vec<String> {
        self.registry.available_versions()
    }

    /// 適用済みバージョン（昇順）
    pub async fn get_migrated_versions(&mut self) -> Result<Vec<String>, MigrationError> {
        self.ensure_ledger().await?;
        Ok(self
            .ledger
            .migrated_versions(&mut self.connection, &self.app)
            .await?)
    }

    /// エイリアスをバージョンに解決
    ///
    /// `"0"`、利用可能なバージョン、適用済みバージョンの和集合の上で解決します。
    pub async fn get_migration(&mut self, alias: &str) -> Result<String, MigrationError> {
        let alias: MigrationAlias = alias.parse()?;
        let migrated = self.get_migrated_versions().await?;
        let available = self.get_available_versions();
        resolve_alias(alias, &available, &migrated)
    }

    /// 1バージョンを実行
    pub async fn execute_step(&mut self, version: &str) -> Result<StepReport, MigrationError> {
        if !self.registry.has_version(version) {
            return Err(MigrationError::UnknownVersion {
                version: version.to_string(),
            });
        }
        let step = self.registry.create_step(version)?;
        self.ensure_ledger().await?;

        let options = StepOptions {
            table_prefix: self.wrapper.prefix().to_string(),
        };
        let mut states = vec![StepState::Discovered, StepState::Executing];
        tracing::info!(app = %self.app, version, "Executing migration step");

        step.pre_schema_change(&mut self.connection, &options)
            .await
            .map_err(|source| self.step_failed(version, StepPhase::PreSchemaChange, source))?;

        let physical = self.connection.create_schema().await?;
        let logical = self.wrapper.to_logical(&physical);
        let target = step
            .change_schema(&mut self.connection, logical.clone(), &options)
            .await
            .map_err(|source| self.step_failed(version, StepPhase::ChangeSchema, source))?;

        let mut statements = 0;
        let mut repairs = Vec::new();
        let mut applied = logical;
        if let Some(target) = target {
            states.push(StepState::SchemaApplying);
            let report = NamingValidator::new(self.migrator.profile()).ensure_naming_constraints(
                &applied,
                &target,
                self.wrapper.prefix().len(),
            )?;
            let physical_target = self.wrapper.to_physical(&report.schema);
            let summary = self
                .migrator
                .migrate(&mut self.connection, &physical_target)
                .await?;
            statements = summary.executed;
            repairs = report.repairs;
            applied = report.schema;
        }

        states.push(StepState::PostApplying);
        step.post_schema_change(&mut self.connection, &applied, &options)
            .await
            .map_err(|source| self.step_failed(version, StepPhase::PostSchemaChange, source))?;

        self.ledger
            .record(&mut self.connection, &self.app, version)
            .await?;
        states.push(StepState::Recorded);

        tracing::info!(app = %self.app, version, statements, "Migration step recorded");
        Ok(StepReport {
            version: version.to_string(),
            states,
            statements,
            repairs,
        })
    }

    /// 未適用のバージョンをすべて実行
    pub async fn migrate(&mut self) -> Result<MigrationRun, MigrationError> {
        let pending = self.pending_versions(None).await?;
        Ok(self.run(pending).await)
    }

    /// 指定したバージョン（またはエイリアス）までの未適用バージョンを実行
    pub async fn migrate_to(&mut self, to: &str) -> Result<MigrationRun, MigrationError> {
        let target = match to.parse::<MigrationAlias>() {
            Ok(alias) => self.get_migration(&alias.to_string()).await?,
            Err(_) if self.registry.has_version(to) => to.to_string(),
            Err(_) => {
                return Err(MigrationError::UnknownVersion {
                    version: to.to_string(),
                })
            }
        };
        let pending = self.pending_versions(Some(&target)).await?;
        Ok(self.run(pending).await)
    }

    async fn pending_versions(&mut self, up_to: Option<&str>) -> Result<Vec<String>, MigrationError> {
        let migrated = self.get_migrated_versions().await?;
        Ok(self
            .get_available_versions()
            .into_iter()
            .filter(|v| !migrated.contains(v))
            .filter(|v| up_to.map_or(true, |limit| v.as_str() <= limit))
            .collect())
    }

    async fn run(&mut self, versions: Vec<String>) -> MigrationRun {
        let mut run = MigrationRun::default();
        for version in versions {
            match self.execute_step(&version).await {
                Ok(report) => run.executed.push(report),
                Err(error) => {
                    tracing::warn!(app = %self.app, version = %version, error = %error, "Migration stopped");
                    run.failed = Some(FailedStep { version, error });
                    break;
                }
            }
        }
        run
    }

    fn step_failed(&self, version: &str, phase: StepPhase, source: anyhow::Error) -> MigrationError {
        tracing::warn!(app = %self.app, version, phase = %phase, state = ?StepState::Failed, "Migration step failed");
        MigrationError::StepFailed {
            version: version.to_string(),
            phase,
            source,
        }
    }
}

/// エイリアスの解決
///
/// # Arguments
/// * `available` - 利用可能なバージョン（昇順）
/// * `migrated` - 適用済みバージョン（昇順）
pub fn resolve_alias(
    alias: MigrationAlias,
    available: &[String],
    migrated: &[String],
) -> Result<String, MigrationError> {
    let current = migrated
        .last()
        .cloned()
        .unwrap_or_else(|| NO_VERSION.to_string());

    let mut all: Vec<String> = std::iter::once(NO_VERSION.to_string())
        .chain(available.iter().cloned())
        .chain(migrated.iter().cloned())
        .collect();
    all.sort();
    all.dedup();

    let no_such = || MigrationError::NoSuchVersion {
        alias: alias.to_string(),
        from: current.clone(),
    };
    let position = all.iter().position(|v| *v == current).ok_or_else(no_such)?;

    match alias {
        MigrationAlias::Current => Ok(current.clone()),
        MigrationAlias::Prev => position
            .checked_sub(1)
            .and_then(|i| all.get(i))
            .cloned()
            .ok_or_else(no_such),
        MigrationAlias::Next => all.get(position + 1).cloned().ok_or_else(no_such),
        MigrationAlias::Latest => Ok(available.last().cloned().unwrap_or_else(|| current.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_resolve_current_without_migrations() {
        let available = versions(&["001", "002"]);
        assert_eq!(
            resolve_alias(MigrationAlias::Current, &available, &[]).unwrap(),
            "0"
        );
        assert_eq!(
            resolve_alias(MigrationAlias::Next, &available, &[]).unwrap(),
            "001"
        );
        assert!(matches!(
            resolve_alias(MigrationAlias::Prev, &available, &[]),
            Err(MigrationError::NoSuchVersion { .. })
        ));
    }

    #[test]
    fn test_resolve_relative_to_current() {
        let available = versions(&["001", "002", "003"]);
        let migrated = versions(&["001", "002"]);
        assert_eq!(
            resolve_alias(MigrationAlias::Prev, &available, &migrated).unwrap(),
            "001"
        );
        assert_eq!(
            resolve_alias(MigrationAlias::Next, &available, &migrated).unwrap(),
            "003"
        );
        assert_eq!(
            resolve_alias(MigrationAlias::Latest, &available, &migrated).unwrap(),
            "003"
        );
    }

    #[test]
    fn test_resolve_next_past_latest() {
        let available = versions(&["001"]);
        let migrated = versions(&["001"]);
        assert!(matches!(
            resolve_alias(MigrationAlias::Next, &available, &migrated),
            Err(MigrationError::NoSuchVersion { .. })
        ));
    }

    #[test]
    fn test_resolve_includes_migrated_only_versions() {
        // 台帳にのみ存在するバージョンも解決対象
        let available = versions(&["002"]);
        let migrated = versions(&["001"]);
        assert_eq!(
            resolve_alias(MigrationAlias::Prev, &available, &migrated).unwrap(),
            "0"
        );
    }

    #[test]
    fn test_run_into_result() {
        let run = MigrationRun {
            executed: vec![StepReport {
                version: "001".to_string(),
                states: vec![StepState::Recorded],
                statements: 0,
                repairs: Vec::new(),
            }],
            failed: None,
        };
        assert_eq!(run.executed_versions(), versions(&["001"]));
        assert_eq!(run.into_result().unwrap().len(), 1);
    }
}

// スキーマ差分適用サービス
//
// 現在のスキーマと目標スキーマの差分からSQLを生成し、接続に適用します。
// トランザクションDDLをサポートするプラットフォームでは全体を1トランザクションで実行し、
// それ以外では順番に実行して部分適用を致命的エラーとして報告します。

use crate::adapters::sql_generator::{
    create_sql_generator, generate_migration_script, SqlGenerator,
};
use crate::core::connection::Connection;
use crate::core::error::{DatabaseError, MigrationError};
use crate::core::platform::{Platform, PlatformProfile};
use crate::core::schema::{ColumnType, Schema};
use crate::core::schema_diff::{ColumnDiff, SchemaDiff};
use crate::services::schema_diff_detector::{normalize_column, DiffOptions, SchemaDiffDetector};

/// 差分適用の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationSummary {
    /// 生成されたSQL文
    pub statements: Vec<String>,
    /// 実行されたSQL文の数
    pub executed: usize,
    /// 変更が確定したかどうか
    pub applied: bool,
}

impl MigrationSummary {
    /// 変更がなかったかどうか
    pub fn is_noop(&self) -> bool {
        self.statements.is_empty()
    }
}

/// 計画された差分
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    /// スキーマ差分
    pub diff: SchemaDiff,
    /// 実行順のSQL文
    pub statements: Vec<String>,
}

/// スキーマ差分適用サービス
pub struct Migrator {
    profile: PlatformProfile,
    generator: Box<dyn SqlGenerator + Send + Sync>,
    detector: SchemaDiffDetector,
    options: DiffOptions,
}

impl std::fmt::Debug for Migrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("profile", &self.profile)
            .field("options", &self.options)
            .finish()
    }
}

impl Migrator {
    /// 新しいMigratorを作成
    pub fn new(platform: Platform) -> Self {
        Self {
            profile: platform.profile(),
            generator: create_sql_generator(platform),
            detector: SchemaDiffDetector::new(),
            options: DiffOptions::default(),
        }
    }

    /// 差分検出のオプションを指定
    pub fn with_options(mut self, options: DiffOptions) -> Self {
        self.options = options;
        self
    }

    /// プラットフォームプロファイル
    pub fn profile(&self) -> PlatformProfile {
        self.profile
    }

    /// 差分と実行順のSQL文を計画
    ///
    /// # Returns
    /// データを失う変更を含む場合は `MigrationError::UnsafeMigration`
    pub fn plan(&self, current: &Schema, target: &Schema) -> Result<MigrationPlan, MigrationError> {
        let diff = self
            .detector
            .detect(current, target, self.profile, &self.options);
        self.check_safety(&diff)?;
        let statements = generate_migration_script(self.generator.as_ref(), &diff, current, target);
        Ok(MigrationPlan { diff, statements })
    }

    /// 接続中のスキーマから目標スキーマへのSQLを生成（実行しない）
    pub async fn generate_change_script(
        &self,
        conn: &mut dyn Connection,
        target: &Schema,
    ) -> Result<Vec<String>, MigrationError> {
        let current = conn.create_schema().await?;
        Ok(self.plan(&current, target)?.statements)
    }

    /// 取得済みのスキーマから目標スキーマへのSQLを生成
    pub fn diff_offline(&self, start: &Schema, target: &Schema) -> Result<Vec<String>, MigrationError> {
        Ok(self.plan(start, target)?.statements)
    }

    /// 目標スキーマを適用
    pub async fn migrate(
        &self,
        conn: &mut dyn Connection,
        target: &Schema,
    ) -> Result<MigrationSummary, MigrationError> {
        let current = conn.create_schema().await?;
        let plan = self.plan(&current, target)?;
        if plan.statements.is_empty() {
            tracing::debug!(platform = %self.profile.platform(), "Schema is up to date");
            return Ok(MigrationSummary {
                applied: true,
                ..Default::default()
            });
        }

        let executed = if self.profile.transactional_ddl() {
            self.apply_in_transaction(conn, &plan.statements, true).await?
        } else {
            self.apply_sequentially(conn, &plan.statements).await?
        };

        tracing::info!(
            platform = %self.profile.platform(),
            statements = executed,
            "Applied schema changes"
        );
        Ok(MigrationSummary {
            statements: plan.statements,
            executed,
            applied: true,
        })
    }

    /// 目標スキーマを試験的に適用
    ///
    /// トランザクションDDLのプラットフォームでは実行後にロールバックし、
    /// それ以外では計画のみを返します。
    pub async fn check_migrate(
        &self,
        conn: &mut dyn Connection,
        target: &Schema,
    ) -> Result<MigrationSummary, MigrationError> {
        let current = conn.create_schema().await?;
        let plan = self.plan(&current, target)?;
        if plan.statements.is_empty() || !self.profile.transactional_ddl() {
            return Ok(MigrationSummary {
                statements: plan.statements,
                executed: 0,
                applied: false,
            });
        }

        let executed = self
            .apply_in_transaction(conn, &plan.statements, false)
            .await?;
        Ok(MigrationSummary {
            statements: plan.statements,
            executed,
            applied: false,
        })
    }

    async fn apply_in_transaction(
        &self,
        conn: &mut dyn Connection,
        statements: &[String],
        commit: bool,
    ) -> Result<usize, MigrationError> {
        conn.begin_transaction().await?;

        for (executed, sql) in statements.iter().enumerate() {
            if let Err(e) = conn.execute_statement(sql).await {
                tracing::debug!(executed, "Rolling back schema changes");
                if let Err(rollback_error) = conn.rollback().await {
                    tracing::warn!(error = %rollback_error, "Rollback failed");
                }
                return Err(e.into());
            }
        }

        if commit {
            conn.commit().await?;
        } else {
            conn.rollback().await?;
        }
        Ok(statements.len())
    }

    async fn apply_sequentially(
        &self,
        conn: &mut dyn Connection,
        statements: &[String],
    ) -> Result<usize, MigrationError> {
        for (executed, sql) in statements.iter().enumerate() {
            if let Err(source) = conn.execute_statement(sql).await {
                return Err(partial_failure(executed, statements.len(), source));
            }
        }
        Ok(statements.len())
    }

    /// データを失う可能性のある変更を拒否
    fn check_safety(&self, diff: &SchemaDiff) -> Result<(), MigrationError> {
        for table_diff in &diff.modified_tables {
            for column_diff in &table_diff.modified_columns {
                if let Some(reason) = self.unsafe_reason(column_diff) {
                    return Err(MigrationError::UnsafeMigration {
                        table: table_diff.table_name.clone(),
                        column: column_diff.column_name.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(())
    }

    fn unsafe_reason(&self, column_diff: &ColumnDiff) -> Option<String> {
        // 主キーに依存する正規化は検出時に済んでいる
        let old = normalize_column(self.profile, &column_diff.old_column, false);
        let new = normalize_column(self.profile, &column_diff.new_column, false);

        if old.column_type != new.column_type {
            if let Some(reason) = type_change_reason(old.column_type, new.column_type) {
                return Some(reason);
            }
        }

        if old.column_type == ColumnType::STRING && new.column_type == ColumnType::STRING {
            if let (Some(old_length), Some(new_length)) = (old.length, new.length) {
                if new_length < old_length {
                    return Some(format!(
                        "string length decreases from {} to {}",
                        old_length, new_length
                    ));
                }
            }
        }

        if old.column_type == ColumnType::DECIMAL && new.column_type == ColumnType::DECIMAL {
            let shrinks = |old: Option<u32>, new: Option<u32>| matches!((old, new), (Some(o), Some(n)) if n < o);
            if shrinks(old.precision, new.precision) || shrinks(old.scale, new.scale) {
                return Some("decimal precision or scale decreases".to_string());
            }
        }

        if old.nullable && !new.nullable && new.default.is_none() && !new.autoincrement {
            return Some("column becomes NOT NULL without a default".to_string());
        }

        None
    }
}

/// 型の系統
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeFamily {
    Integer,
    Text,
    Json,
    Numeric,
    Boolean,
    Temporal,
    Binary,
}

fn family(column_type: ColumnType) -> TypeFamily {
    match column_type {
        ColumnType::SMALLINT | ColumnType::INTEGER | ColumnType::BIGINT => TypeFamily::Integer,
        ColumnType::STRING | ColumnType::TEXT => TypeFamily::Text,
        ColumnType::JSON => TypeFamily::Json,
        ColumnType::DECIMAL | ColumnType::FLOAT => TypeFamily::Numeric,
        ColumnType::BOOLEAN => TypeFamily::Boolean,
        ColumnType::DATE | ColumnType::TIME | ColumnType::DATETIME => TypeFamily::Temporal,
        ColumnType::BLOB => TypeFamily::Binary,
    }
}

fn type_change_reason(old: ColumnType, new: ColumnType) -> Option<String> {
    if old == ColumnType::TEXT && matches!(new, ColumnType::STRING | ColumnType::JSON | ColumnType::BLOB) {
        return Some(format!("type change from {} to {} may truncate data", old, new));
    }

    if let (Some(old_width), Some(new_width)) = (old.integer_width(), new.integer_width()) {
        if new_width < old_width {
            return Some(format!("integer narrowing from {} to {}", old, new));
        }
        return None;
    }

    let (old_family, new_family) = (family(old), family(new));
    if old_family == new_family {
        return None;
    }
    // 整数から文字列への拡張のみ許可
    if old_family == TypeFamily::Integer && new_family == TypeFamily::Text {
        return None;
    }
    Some(format!("incompatible type change from {} to {}", old, new))
}

fn partial_failure(executed: usize, total: usize, source: DatabaseError) -> MigrationError {
    if executed == 0 {
        return MigrationError::Database(source);
    }
    tracing::warn!(executed, total, "Schema change partially applied");
    MigrationError::PartiallyApplied {
        executed,
        total,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ColumnDefault, Table};

    fn schema_with(column: Column) -> Schema {
        let mut table = Table::new("oc_items");
        table
            .add_column(Column::new("id", ColumnType::INTEGER, false))
            .unwrap();
        table.add_column(column).unwrap();
        table.set_primary_key(&["id"], None).unwrap();
        let mut schema = Schema::new();
        schema.add_table(table);
        schema
    }

    fn plan(platform: Platform, old: Column, new: Column) -> Result<MigrationPlan, MigrationError> {
        Migrator::new(platform).plan(&schema_with(old), &schema_with(new))
    }

    // =========================================================================
    // 安全性チェック
    // =========================================================================

    #[test]
    fn test_string_length_decrease_is_unsafe() {
        let result = plan(
            Platform::MySQL,
            Column::new("name", ColumnType::STRING, true).with_length(64),
            Column::new("name", ColumnType::STRING, true).with_length(32),
        );
        assert!(result.unwrap_err().is_unsafe_migration());
    }

    #[test]
    fn test_string_length_increase_is_safe() {
        let plan = plan(
            Platform::MySQL,
            Column::new("name", ColumnType::STRING, true).with_length(32),
            Column::new("name", ColumnType::STRING, true).with_length(64),
        )
        .unwrap();
        assert_eq!(plan.statements.len(), 1);
    }

    #[test]
    fn test_integer_narrowing_is_unsafe() {
        let result = plan(
            Platform::PostgreSQL,
            Column::new("n", ColumnType::BIGINT, true),
            Column::new("n", ColumnType::SMALLINT, true),
        );
        assert!(result.unwrap_err().is_unsafe_migration());
    }

    #[test]
    fn test_widening_allowed() {
        assert!(plan(
            Platform::PostgreSQL,
            Column::new("n", ColumnType::INTEGER, true),
            Column::new("n", ColumnType::STRING, true).with_length(32),
        )
        .is_ok());
        assert!(plan(
            Platform::PostgreSQL,
            Column::new("n", ColumnType::STRING, true),
            Column::new("n", ColumnType::TEXT, true),
        )
        .is_ok());
    }

    #[test]
    fn test_text_to_string_is_unsafe() {
        let result = plan(
            Platform::MySQL,
            Column::new("body", ColumnType::TEXT, true),
            Column::new("body", ColumnType::STRING, true),
        );
        assert!(result.unwrap_err().is_unsafe_migration());
    }

    #[test]
    fn test_incompatible_family_is_unsafe() {
        let result = plan(
            Platform::MySQL,
            Column::new("when", ColumnType::DATETIME, true),
            Column::new("when", ColumnType::INTEGER, true),
        );
        assert!(result.unwrap_err().is_unsafe_migration());
    }

    #[test]
    fn test_not_null_without_default_is_unsafe() {
        let result = plan(
            Platform::PostgreSQL,
            Column::new("n", ColumnType::INTEGER, true),
            Column::new("n", ColumnType::INTEGER, false),
        );
        assert!(result.unwrap_err().is_unsafe_migration());

        assert!(plan(
            Platform::PostgreSQL,
            Column::new("n", ColumnType::INTEGER, true),
            Column::new("n", ColumnType::INTEGER, false).with_default(ColumnDefault::Integer(0)),
        )
        .is_ok());
    }

    // =========================================================================
    // 計画
    // =========================================================================

    #[test]
    fn test_identical_schemas_produce_no_statements() {
        let column = Column::new("name", ColumnType::STRING, true).with_length(64);
        for platform in Platform::ALL {
            let statements = Migrator::new(platform)
                .diff_offline(&schema_with(column.clone()), &schema_with(column.clone()))
                .unwrap();
            assert!(statements.is_empty(), "platform {}", platform);
        }
    }

    #[test]
    fn test_comment_only_change_emits_nothing_on_sqlite() {
        let statements = Migrator::new(Platform::SQLite)
            .diff_offline(
                &schema_with(Column::new("name", ColumnType::STRING, true)),
                &schema_with(Column::new("name", ColumnType::STRING, true).with_comment("label")),
            )
            .unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_partial_failure_classification() {
        let first = partial_failure(0, 3, DatabaseError::query("boom", "CREATE TABLE x"));
        assert!(matches!(first, MigrationError::Database(_)));

        let later = partial_failure(2, 3, DatabaseError::query("boom", "CREATE TABLE x"));
        assert!(matches!(
            later,
            MigrationError::PartiallyApplied { executed: 2, total: 3, .. }
        ));
    }
}

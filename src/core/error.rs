// エラー型定義
//
// ライブラリ全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、SchemaError, ReaderError, ValidationError,
// DatabaseError, MigrationError を定義します。

use std::fmt;
use thiserror::Error;

/// スキーマオブジェクトの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaObjectKind {
    Table,
    Column,
    Index,
    PrimaryKey,
    ForeignKey,
    Sequence,
    Trigger,
}

impl fmt::Display for SchemaObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaObjectKind::Table => "table",
            SchemaObjectKind::Column => "column",
            SchemaObjectKind::Index => "index",
            SchemaObjectKind::PrimaryKey => "primary key",
            SchemaObjectKind::ForeignKey => "foreign key",
            SchemaObjectKind::Sequence => "sequence",
            SchemaObjectKind::Trigger => "trigger",
        };
        write!(f, "{}", name)
    }
}

/// スキーマモデルのエラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Object not found in the schema
    #[error("There is no {kind} with name \"{name}\" in the schema")]
    SchemaNotFound {
        /// オブジェクトの種類
        kind: SchemaObjectKind,
        /// オブジェクト名
        name: String,
    },

    /// Duplicate object
    #[error("The {kind} \"{name}\" already exists")]
    DuplicateObject {
        /// オブジェクトの種類
        kind: SchemaObjectKind,
        /// オブジェクト名
        name: String,
    },

    /// Primary key references a missing column
    #[error("Primary key on table \"{table}\" references unknown column \"{column}\"")]
    PrimaryKeyColumnMissing {
        /// テーブル名
        table: String,
        /// カラム名
        column: String,
    },
}

impl SchemaError {
    /// 未検出エラーを作成
    pub fn not_found(kind: SchemaObjectKind, name: impl Into<String>) -> Self {
        SchemaError::SchemaNotFound {
            kind,
            name: name.into(),
        }
    }

    /// 未検出エラーかどうか
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchemaError::SchemaNotFound { .. })
    }
}

/// スキーマファイル読み込みエラー
#[derive(Debug, Error)]
pub enum ReaderError {
    /// I/O error while reading the schema file
    #[error("Failed to read schema file '{path}': {source}")]
    Io {
        /// ファイルパス
        path: String,
        /// 原因
        #[source]
        source: std::io::Error,
    },

    /// Malformed input
    #[error("Parse error in <{element}>: {message}")]
    Parse {
        /// 問題のある要素名
        element: String,
        /// エラーメッセージ
        message: String,
    },

    /// Unknown column type
    #[error("Unsupported column type '{type_name}' for field '{field}'")]
    UnsupportedType {
        /// 型名
        type_name: String,
        /// フィールド名
        field: String,
    },

    /// Schema model rejected the declaration
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ReaderError {
    /// パースエラーを作成
    pub fn parse(element: impl Into<String>, message: impl Into<String>) -> Self {
        ReaderError::Parse {
            element: element.into(),
            message: message.into(),
        }
    }

    /// パースエラーかどうか
    pub fn is_parse(&self) -> bool {
        matches!(self, ReaderError::Parse { .. })
    }

    /// 未対応型エラーかどうか
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self, ReaderError::UnsupportedType { .. })
    }
}

/// バリデーションエラー
///
/// DDL発行前に検出される命名制約・型制約の違反を表現します。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Identifier exceeds the platform limit
    #[error("{kind} name \"{name}\" is too long ({length} > {max})")]
    NamingConstraintViolation {
        /// オブジェクトの種類
        kind: SchemaObjectKind,
        /// 識別子
        name: String,
        /// 実効長（プレフィックス込み）
        length: usize,
        /// プラットフォームの最大長
        max: usize,
    },

    /// String column longer than the platform supports
    #[error("Column \"{table}\".\"{column}\" declares length {length}, platform maximum is {max}")]
    UnsupportedColumnLength {
        /// テーブル名
        table: String,
        /// カラム名
        column: String,
        /// 宣言された長さ
        length: u32,
        /// 最大長
        max: u32,
    },

    /// NOT NULL string column defaulting to the empty string on a platform treating '' as NULL
    #[error("Column \"{table}\".\"{column}\" is NOT NULL with an empty string default")]
    EmptyStringNotNull {
        /// テーブル名
        table: String,
        /// カラム名
        column: String,
    },
}

impl ValidationError {
    /// 命名制約違反かどうか
    pub fn is_naming_constraint_violation(&self) -> bool {
        matches!(self, ValidationError::NamingConstraintViolation { .. })
    }

    /// カラム長エラーかどうか
    pub fn is_unsupported_column_length(&self) -> bool {
        matches!(self, ValidationError::UnsupportedColumnLength { .. })
    }
}

/// データベースエラー
///
/// データベース操作時に発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}{}", format_sql_opt(.sql))]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Transaction error
    #[error("Transaction error: {message}")]
    Transaction {
        /// エラーメッセージ
        message: String,
    },

    /// Platform without a live driver
    #[error("No live connection support for platform '{platform}'")]
    UnsupportedPlatform {
        /// プラットフォーム名
        platform: String,
    },
}

impl DatabaseError {
    /// クエリエラーを作成
    pub fn query(message: impl Into<String>, sql: &str) -> Self {
        DatabaseError::Query {
            message: message.into(),
            sql: Some(sql.to_string()),
        }
    }

    /// 接続エラーかどうか
    pub fn is_connection(&self) -> bool {
        matches!(self, DatabaseError::Connection { .. })
    }

    /// クエリエラーかどうか
    pub fn is_query(&self) -> bool {
        matches!(self, DatabaseError::Query { .. })
    }

    /// トランザクションエラーかどうか
    pub fn is_transaction(&self) -> bool {
        matches!(self, DatabaseError::Transaction { .. })
    }

    /// 失敗したSQLを取得
    pub fn sql(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

fn format_sql_opt(sql: &Option<String>) -> String {
    sql.as_ref()
        .map_or(String::new(), |sql| format!(" (statement: {})", sql))
}

/// マイグレーションステップのフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    PreSchemaChange,
    ChangeSchema,
    PostSchemaChange,
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepPhase::PreSchemaChange => "preSchemaChange",
            StepPhase::ChangeSchema => "changeSchema",
            StepPhase::PostSchemaChange => "postSchemaChange",
        };
        write!(f, "{}", name)
    }
}

/// マイグレーションエラー
///
/// マイグレーションサービスと差分適用で発生するエラーを表現します。
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Alias other than current/prev/next/latest
    #[error("Unknown migration alias '{alias}'")]
    UnknownAlias {
        /// エイリアス
        alias: String,
    },

    /// Alias resolves outside the known versions
    #[error("No {alias} version relative to '{from}'")]
    NoSuchVersion {
        /// エイリアス
        alias: String,
        /// 基準バージョン
        from: String,
    },

    /// Version not in the available versions
    #[error("Version {version} is unknown.")]
    UnknownVersion {
        /// バージョン
        version: String,
    },

    /// Version available but no step registered
    #[error("Migration step for version {version} of app '{app}' is unknown")]
    UnknownStepClass {
        /// 名前空間
        app: String,
        /// バージョン
        version: String,
    },

    /// Structural change that risks data loss
    #[error("Unsafe migration of \"{table}\".\"{column}\": {reason}")]
    UnsafeMigration {
        /// テーブル名
        table: String,
        /// カラム名
        column: String,
        /// 理由
        reason: String,
    },

    /// Failure after non-transactional DDL was already executed
    #[error("Migration partially applied ({executed}/{total} statements executed), manual intervention required: {source}")]
    PartiallyApplied {
        /// 実行済みステートメント数
        executed: usize,
        /// 全ステートメント数
        total: usize,
        /// 原因
        #[source]
        source: DatabaseError,
    },

    /// Step hook failed
    #[error("Migration step {version} failed in {phase}: {source}")]
    StepFailed {
        /// バージョン
        version: String,
        /// フェーズ
        phase: StepPhase,
        /// 原因
        #[source]
        source: anyhow::Error,
    },

    /// Validation failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Schema model failure
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Schema file could not be read
    #[error(transparent)]
    Reader(#[from] ReaderError),

    /// Database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl MigrationError {
    /// 呼び出し側・設定のエラーかどうか（再試行不要）
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            MigrationError::UnknownAlias { .. }
                | MigrationError::NoSuchVersion { .. }
                | MigrationError::UnknownVersion { .. }
                | MigrationError::UnknownStepClass { .. }
                | MigrationError::Schema(SchemaError::SchemaNotFound { .. })
        )
    }

    /// バリデーションエラーかどうか
    pub fn is_validation(&self) -> bool {
        matches!(self, MigrationError::Validation(_))
    }

    /// データベースエラーかどうか
    pub fn is_database(&self) -> bool {
        matches!(
            self,
            MigrationError::Database(_) | MigrationError::PartiallyApplied { .. }
        )
    }

    /// 安全でないマイグレーションかどうか
    pub fn is_unsafe_migration(&self) -> bool {
        matches!(self, MigrationError::UnsafeMigration { .. })
    }
}

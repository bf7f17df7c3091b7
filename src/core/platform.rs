// プラットフォームカタログ
//
// データベースエンジンごとの識別子長制限、既定の主キー名、
// 型サポートの差異を静的に提供します。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Oracleで扱える文字列カラムの最大長（バイト）
pub const ORACLE_MAX_STRING_LENGTH: u32 = 4000;

/// サポート対象のデータベースプラットフォーム
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "pgsql")]
    PostgreSQL,
    #[serde(rename = "oci")]
    Oracle,
    #[serde(rename = "sqlite3")]
    SQLite,
}

impl Platform {
    /// 全プラットフォーム
    pub const ALL: [Platform; 4] = [
        Platform::MySQL,
        Platform::PostgreSQL,
        Platform::Oracle,
        Platform::SQLite,
    ];

    /// プラットフォームのプロファイルを取得
    ///
    /// 純粋関数で、副作用もエラーもありません。
    pub fn profile(self) -> PlatformProfile {
        match self {
            Platform::MySQL => PlatformProfile::MySQL,
            Platform::PostgreSQL => PlatformProfile::PostgreSQL,
            Platform::Oracle => PlatformProfile::Oracle,
            Platform::SQLite => PlatformProfile::SQLite,
        }
    }

    /// 設定値の別名を正規化してプラットフォームに変換
    ///
    /// # Arguments
    /// * `value` - `dbtype` の設定値（例: `sqlite`, `postgres`, `oracle`）
    ///
    /// # Returns
    /// 対応するプラットフォーム。未知の値の場合はNone
    pub fn normalize(value: &str) -> Option<Platform> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Platform::MySQL),
            "pgsql" | "postgres" | "postgresql" => Some(Platform::PostgreSQL),
            "oci" | "oracle" => Some(Platform::Oracle),
            "sqlite" | "sqlite3" => Some(Platform::SQLite),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MySQL => write!(f, "mysql"),
            Platform::PostgreSQL => write!(f, "pgsql"),
            Platform::Oracle => write!(f, "oci"),
            Platform::SQLite => write!(f, "sqlite3"),
        }
    }
}

/// プラットフォームプロファイル
///
/// バリデーターと差分検出器の双方に渡され、プラットフォーム固有の判断は
/// すべてこの型のメソッドを経由します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformProfile {
    MySQL,
    PostgreSQL,
    Oracle,
    SQLite,
}

impl PlatformProfile {
    /// 対応するプラットフォーム
    pub fn platform(&self) -> Platform {
        match self {
            PlatformProfile::MySQL => Platform::MySQL,
            PlatformProfile::PostgreSQL => Platform::PostgreSQL,
            PlatformProfile::Oracle => Platform::Oracle,
            PlatformProfile::SQLite => Platform::SQLite,
        }
    }

    /// 識別子の最大長
    pub fn max_identifier_length(&self) -> usize {
        match self {
            PlatformProfile::MySQL => 64,
            PlatformProfile::PostgreSQL => 63,
            PlatformProfile::Oracle => 30,
            PlatformProfile::SQLite => 64,
        }
    }

    /// 名前のない主キーに対してエンジンが生成する既定名
    ///
    /// # Arguments
    /// * `table` - テーブル名（物理名）
    pub fn default_primary_key_name(&self, table: &str) -> String {
        match self {
            PlatformProfile::MySQL | PlatformProfile::SQLite => "PRIMARY".to_string(),
            PlatformProfile::PostgreSQL => format!("{}_pkey", table),
            PlatformProfile::Oracle => format!("{}_seq", table),
        }
    }

    /// 既定の主キー名がテーブル名を含むかどうか
    ///
    /// trueの場合、テーブルプレフィックスの長さも主キー名の長さに加算されます。
    pub fn primary_key_name_embeds_table(&self) -> bool {
        matches!(self, PlatformProfile::PostgreSQL | PlatformProfile::Oracle)
    }

    /// 4000バイトを超える文字列カラムをサポートするか
    pub fn supports_long_strings(&self) -> bool {
        !matches!(self, PlatformProfile::Oracle)
    }

    /// DDLをトランザクション内で実行できるか
    pub fn transactional_ddl(&self) -> bool {
        matches!(self, PlatformProfile::PostgreSQL | PlatformProfile::SQLite)
    }

    /// ALTER TABLEでカラム定義を直接変更できるか
    pub fn supports_alter_column(&self) -> bool {
        !matches!(self, PlatformProfile::SQLite)
    }

    /// 自動採番に明示的なシーケンスが必要か
    pub fn needs_explicit_sequences(&self) -> bool {
        matches!(self, PlatformProfile::Oracle)
    }

    /// 独立したシーケンスオブジェクトを持つか
    pub fn supports_sequences(&self) -> bool {
        matches!(self, PlatformProfile::PostgreSQL | PlatformProfile::Oracle)
    }

    /// BOOLEANカラムのNOT NULLを表現できるか
    pub fn boolean_not_null_supported(&self) -> bool {
        !matches!(self, PlatformProfile::Oracle)
    }

    /// 空文字列がNULLとして扱われるか
    pub fn empty_string_is_null(&self) -> bool {
        matches!(self, PlatformProfile::Oracle)
    }

    /// カラムコメントを保持できるか
    pub fn supports_column_comments(&self) -> bool {
        !matches!(self, PlatformProfile::SQLite)
    }

    /// 文字列カラムの最大長（制限がない場合はNone）
    pub fn max_string_length(&self) -> Option<u32> {
        if self.supports_long_strings() {
            None
        } else {
            Some(ORACLE_MAX_STRING_LENGTH)
        }
    }
}

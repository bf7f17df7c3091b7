// 接続コラボレーター
//
// マイグレーションエンジンが利用する接続の能力セット。
// 実装はアダプター層（sqlx）またはテスト用のダブルが提供します。

use crate::core::error::DatabaseError;
use crate::core::platform::Platform;
use crate::core::schema::Schema;
use async_trait::async_trait;

/// データベース接続インターフェース
///
/// エンジンは単一の接続を順番に使用します。
/// 接続プールやワイヤープロトコルはこのトレイトの外側の責務です。
#[async_trait]
pub trait Connection: Send {
    /// 接続先のプラットフォーム
    fn platform(&self) -> Platform;

    /// テーブルプレフィックス
    fn prefix(&self) -> &str;

    /// 現在のスキーマを取得
    ///
    /// プレフィックスで始まるテーブルのみを物理名のまま返します。
    async fn create_schema(&mut self) -> Result<Schema, DatabaseError>;

    /// パラメータなしのSQLを実行
    ///
    /// # Returns
    /// 影響を受けた行数
    async fn execute_statement(&mut self, sql: &str) -> Result<u64, DatabaseError>;

    /// パラメータ付きのSQLを実行
    async fn execute_with_params(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<u64, DatabaseError>;

    /// 先頭カラムを文字列として取得するクエリを実行
    async fn fetch_strings(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<String>, DatabaseError>;

    /// トランザクションを開始
    async fn begin_transaction(&mut self) -> Result<(), DatabaseError>;

    /// トランザクションをコミット
    async fn commit(&mut self) -> Result<(), DatabaseError>;

    /// トランザクションをロールバック
    async fn rollback(&mut self) -> Result<(), DatabaseError>;
}

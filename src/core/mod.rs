// Core Domain
// プラットフォーム、スキーマモデル、差分、マイグレーション定義の純粋なドメインロジック

pub mod config;
pub mod connection;
pub mod error;
pub mod migration;
pub mod naming;
pub mod platform;
pub mod schema;
pub mod schema_diff;

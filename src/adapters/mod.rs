// Adapters
// データベースへのアクセスとプラットフォーム固有SQLの生成を抽象化

pub mod connection;
pub mod connection_string;
pub mod database;
pub mod database_introspector;
pub mod migration_ledger;
pub mod sql_generator;
pub mod sql_quote;
pub mod type_mapping;

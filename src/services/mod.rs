// Services Layer
// スキーマの読み込み、検証、差分適用、マイグレーション実行を担うサービス層

pub mod migration_service;
pub mod migrator;
pub mod naming_validator;
pub mod schema_diff_detector;
pub mod schema_manager;
pub mod schema_reader;
pub mod schema_wrapper;

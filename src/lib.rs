// Schemataライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメインモデル（プラットフォーム、スキーマ、差分、マイグレーション、設定、エラー）
// - adapters: データベース接続とプラットフォーム固有SQLの生成
// - services: スキーマの読み込み、検証、差分適用、マイグレーション実行

pub mod cli;
pub mod core;
pub mod adapters;
pub mod services;

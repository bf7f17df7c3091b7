// データベースイントロスペクター
//
// 稼働中のデータベースから現在のスキーマを取得する抽象化レイヤー。
// 各プラットフォーム固有のINFORMATION_SCHEMA/PRAGMAクエリを実装します。
// 取得結果は物理名のままで、テーブルプレフィックスで始まるものだけを返します。

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{AnyConnection, Row};

use crate::adapters::sql_quote::quote_identifier_ansi;
use crate::adapters::type_mapping::{TypeMappingService, TypeMetadata};
use crate::core::platform::Platform;
use crate::core::schema::{
    Column, ForeignKey, Index, ReferentialAction, Schema, Sequence, Table,
    DEFAULT_PRIMARY_KEY_NAME,
};

/// 生のカラム情報（DB固有フォーマット）
///
/// TypeMappingService で Column に変換されます。
#[derive(Debug, Clone, Default)]
pub struct RawColumnInfo {
    /// カラム名
    pub name: String,
    /// データ型（DB固有の型文字列）
    pub data_type: String,
    /// NULL許可フラグ
    pub is_nullable: bool,
    /// デフォルト値式
    pub default_value: Option<String>,
    /// 文字型の最大長
    pub char_max_length: Option<i64>,
    /// 数値型の精度
    pub numeric_precision: Option<i64>,
    /// 数値型のスケール
    pub numeric_scale: Option<i64>,
    /// 自動採番
    pub autoincrement: bool,
    /// コメント
    pub comment: Option<String>,
}

impl RawColumnInfo {
    /// 論理カラムへ変換
    pub fn into_column(self, type_mapping: &TypeMappingService) -> Column {
        let metadata = TypeMetadata {
            char_max_length: to_u32(self.char_max_length),
            numeric_precision: to_u32(self.numeric_precision),
            numeric_scale: to_u32(self.numeric_scale),
        };
        let sql_type = type_mapping.from_sql_type(&self.data_type, &metadata);

        let mut column = Column::new(&self.name, sql_type.column_type, self.is_nullable);
        column.length = sql_type.length;
        column.precision = sql_type.precision;
        column.scale = sql_type.scale;
        column.unsigned = sql_type.unsigned;
        column.comment = self.comment.filter(|c| !c.is_empty());

        if self.autoincrement {
            column.autoincrement = true;
        } else {
            column.default = self
                .default_value
                .as_deref()
                .and_then(|raw| type_mapping.parse_default(sql_type.column_type, raw));
        }

        column
    }
}

fn to_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

/// 外部キー行をグループ化するための一時構造
#[derive(Debug, Default)]
struct ForeignKeyBuilder {
    referenced_table: String,
    columns: Vec<String>,
    referenced_columns: Vec<String>,
    on_delete: Option<ReferentialAction>,
    on_update: Option<ReferentialAction>,
}

impl ForeignKeyBuilder {
    fn build(self, name: &str) -> ForeignKey {
        let mut foreign_key = ForeignKey::new(
            name,
            self.columns,
            &self.referenced_table,
            self.referenced_columns,
        );
        foreign_key.on_delete = self.on_delete;
        foreign_key.on_update = self.on_update;
        foreign_key
    }
}

/// 参照アクション文字列を変換（NO ACTION は既定値として扱う）
fn referential_action(value: &str) -> Option<ReferentialAction> {
    ReferentialAction::parse(value).filter(|a| *a != ReferentialAction::NoAction)
}

/// データベーススキーマ取得インターフェース
///
/// 各プラットフォーム固有のイントロスペクション処理を抽象化します。
#[async_trait]
pub trait DatabaseIntrospector: Send + Sync {
    /// テーブル名一覧を取得
    async fn get_table_names(&self, conn: &mut AnyConnection) -> Result<Vec<String>>;

    /// カラム情報を取得
    async fn get_columns(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<RawColumnInfo>>;

    /// 主キーを取得
    async fn get_primary_key(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Option<Index>>;

    /// 主キー以外のインデックスを取得
    async fn get_indexes(&self, conn: &mut AnyConnection, table_name: &str) -> Result<Vec<Index>>;

    /// 外部キーを取得
    async fn get_foreign_keys(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<ForeignKey>>;

    /// カラムに所有されていないシーケンスを取得
    async fn get_sequences(&self, _conn: &mut AnyConnection) -> Result<Vec<Sequence>> {
        Ok(Vec::new())
    }

    /// プレフィックスで始まるオブジェクトからスキーマを構築
    async fn introspect(
        &self,
        conn: &mut AnyConnection,
        type_mapping: &TypeMappingService,
        prefix: &str,
    ) -> Result<Schema> {
        let mut schema = Schema::new();

        for table_name in self.get_table_names(conn).await? {
            if !table_name.starts_with(prefix) {
                continue;
            }

            let mut table = Table::new(&table_name);
            for raw in self.get_columns(conn, &table_name).await? {
                table.columns.push(raw.into_column(type_mapping));
            }
            table.primary_key = self.get_primary_key(conn, &table_name).await?;
            table.foreign_keys = self.get_foreign_keys(conn, &table_name).await?;

            // 外部キー用に暗黙作成されたインデックスは除外
            table.indexes = self
                .get_indexes(conn, &table_name)
                .await?
                .into_iter()
                .filter(|index| !table.has_foreign_key(&index.name))
                .collect();

            schema.add_table(table);
        }

        for sequence in self.get_sequences(conn).await? {
            if sequence.name.starts_with(prefix) {
                schema.sequences.insert(sequence.name.clone(), sequence);
            }
        }

        tracing::debug!(
            tables = schema.table_count(),
            sequences = schema.sequences.len(),
            "Introspected database schema"
        );

        Ok(schema)
    }
}

/// PostgreSQL用イントロスペクター
pub struct PostgresIntrospector;

/// MySQL用イントロスペクター
pub struct MySqlIntrospector;

/// SQLite用イントロスペクター
pub struct SqliteIntrospector;

/// プラットフォームに応じたイントロスペクターを作成
///
/// Oracleはライブ接続をサポートしないため None を返します。
pub fn create_introspector(platform: Platform) -> Option<Box<dyn DatabaseIntrospector>> {
    match platform {
        Platform::PostgreSQL => Some(Box::new(PostgresIntrospector)),
        Platform::MySQL => Some(Box::new(MySqlIntrospector)),
        Platform::SQLite => Some(Box::new(SqliteIntrospector)),
        Platform::Oracle => None,
    }
}

// =============================================================================
// PostgreSQL イントロスペクター実装
// =============================================================================

// Anyドライバーが扱える型に揃えるため、全てtext/bigintにキャストする
#[async_trait]
impl DatabaseIntrospector for PostgresIntrospector {
    async fn get_table_names(&self, conn: &mut AnyConnection) -> Result<Vec<String>> {
        let sql = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = current_schema()
                AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>(0)?))
            .collect()
    }

    async fn get_columns(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<RawColumnInfo>> {
        let sql = r#"
            SELECT
                c.column_name::text,
                c.data_type::text,
                c.is_nullable::text,
                c.column_default::text,
                c.character_maximum_length::bigint,
                c.numeric_precision::bigint,
                c.numeric_scale::bigint,
                col_description(
                    format('%I.%I', c.table_schema, c.table_name)::regclass,
                    c.ordinal_position::int
                )::text
            FROM information_schema.columns c
            WHERE c.table_schema = current_schema() AND c.table_name = $1
            ORDER BY c.ordinal_position
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let default_value: Option<String> = row.try_get(3)?;
            let autoincrement = default_value
                .as_deref()
                .is_some_and(|d| d.starts_with("nextval("));
            columns.push(RawColumnInfo {
                name: row.try_get(0)?,
                data_type: row.try_get(1)?,
                is_nullable: row.try_get::<String, _>(2)? == "YES",
                default_value,
                char_max_length: row.try_get(4)?,
                numeric_precision: row.try_get(5)?,
                numeric_scale: row.try_get(6)?,
                autoincrement,
                comment: row.try_get(7)?,
            });
        }

        Ok(columns)
    }

    async fn get_primary_key(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Option<Index>> {
        let sql = r#"
            SELECT con.conname::text, a.attname::text
            FROM pg_constraint con
            JOIN pg_class c ON c.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
            WHERE con.contype = 'p'
                AND c.relname = $1
                AND n.nspname = current_schema()
            ORDER BY k.ord
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let mut name = None;
        let mut columns = Vec::new();
        for row in &rows {
            name.get_or_insert(row.try_get::<String, _>(0)?);
            columns.push(row.try_get::<String, _>(1)?);
        }

        Ok(name.map(|name| Index::primary(&name, columns)))
    }

    async fn get_indexes(&self, conn: &mut AnyConnection, table_name: &str) -> Result<Vec<Index>> {
        let sql = r#"
            SELECT
                i.relname::text AS index_name,
                a.attname::text AS column_name,
                (CASE WHEN ix.indisunique THEN 1 ELSE 0 END)::bigint AS is_unique
            FROM pg_class t
            JOIN pg_index ix ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE t.relkind = 'r'
                AND t.relname = $1
                AND n.nspname = current_schema()
                AND NOT ix.indisprimary
            ORDER BY i.relname, k.ord
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        // インデックス名でグループ化
        let mut index_map: BTreeMap<String, (Vec<String>, bool)> = BTreeMap::new();
        for row in &rows {
            let index_name: String = row.try_get(0)?;
            let column_name: String = row.try_get(1)?;
            let is_unique: i64 = row.try_get(2)?;

            index_map
                .entry(index_name)
                .or_insert_with(|| (Vec::new(), is_unique == 1))
                .0
                .push(column_name);
        }

        Ok(index_map
            .into_iter()
            .map(|(name, (columns, unique))| Index::new(&name, columns, unique))
            .collect())
    }

    async fn get_foreign_keys(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                kcu.constraint_name::text,
                kcu.column_name::text,
                rku.table_name::text,
                rku.column_name::text,
                rc.delete_rule::text,
                rc.update_rule::text
            FROM information_schema.referential_constraints rc
            JOIN information_schema.key_column_usage kcu
                ON kcu.constraint_schema = rc.constraint_schema
                AND kcu.constraint_name = rc.constraint_name
            JOIN information_schema.key_column_usage rku
                ON rku.constraint_schema = rc.unique_constraint_schema
                AND rku.constraint_name = rc.unique_constraint_name
                AND rku.ordinal_position = kcu.position_in_unique_constraint
            WHERE kcu.table_schema = current_schema() AND kcu.table_name = $1
            ORDER BY kcu.constraint_name, kcu.ordinal_position
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        group_foreign_key_rows(&rows)
    }

    async fn get_sequences(&self, conn: &mut AnyConnection) -> Result<Vec<Sequence>> {
        // SERIALなどカラムに所有されるシーケンスは除外
        let sql = r#"
            SELECT s.sequencename::text, s.start_value::bigint, s.increment_by::bigint
            FROM pg_sequences s
            JOIN pg_namespace n ON n.nspname = s.schemaname
            JOIN pg_class c ON c.relname = s.sequencename AND c.relnamespace = n.oid
            WHERE s.schemaname = current_schema()
                AND NOT EXISTS (
                    SELECT 1 FROM pg_depend d
                    WHERE d.objid = c.oid AND d.deptype IN ('a', 'i')
                )
            ORDER BY s.sequencename
        "#;

        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        let mut sequences = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut sequence = Sequence::new(&row.try_get::<String, _>(0)?);
            sequence.start = row.try_get(1)?;
            sequence.increment = row.try_get(2)?;
            sequences.push(sequence);
        }
        Ok(sequences)
    }
}

// =============================================================================
// MySQL イントロスペクター実装
// =============================================================================

// information_schemaのカラムはバイナリ照合順序で返ることがあるため CHAR/SIGNED にキャストする
#[async_trait]
impl DatabaseIntrospector for MySqlIntrospector {
    async fn get_table_names(&self, conn: &mut AnyConnection) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>(0)?))
            .collect()
    }

    async fn get_columns(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<RawColumnInfo>> {
        let sql = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR),
                CAST(COLUMN_TYPE AS CHAR),
                CAST(IS_NULLABLE AS CHAR),
                CAST(COLUMN_DEFAULT AS CHAR),
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED),
                CAST(NUMERIC_PRECISION AS SIGNED),
                CAST(NUMERIC_SCALE AS SIGNED),
                CAST(EXTRA AS CHAR),
                CAST(COLUMN_COMMENT AS CHAR)
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let extra: Option<String> = row.try_get(7)?;
            columns.push(RawColumnInfo {
                name: row.try_get(0)?,
                data_type: row.try_get(1)?,
                is_nullable: row.try_get::<String, _>(2)? == "YES",
                default_value: row.try_get(3)?,
                char_max_length: row.try_get(4)?,
                numeric_precision: row.try_get(5)?,
                numeric_scale: row.try_get(6)?,
                autoincrement: extra
                    .as_deref()
                    .is_some_and(|e| e.to_ascii_lowercase().contains("auto_increment")),
                comment: row.try_get(8)?,
            });
        }

        Ok(columns)
    }

    async fn get_primary_key(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Option<Index>> {
        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR)
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME = 'PRIMARY'
            ORDER BY SEQ_IN_INDEX
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .map(|row| row.try_get::<String, _>(0))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((!columns.is_empty()).then(|| Index::primary(DEFAULT_PRIMARY_KEY_NAME, columns)))
    }

    async fn get_indexes(&self, conn: &mut AnyConnection, table_name: &str) -> Result<Vec<Index>> {
        let sql = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR),
                CAST(COLUMN_NAME AS CHAR),
                CAST(NON_UNIQUE AS SIGNED)
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME <> 'PRIMARY'
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let mut index_map: BTreeMap<String, (Vec<String>, bool)> = BTreeMap::new();
        for row in &rows {
            let index_name: String = row.try_get(0)?;
            let column_name: String = row.try_get(1)?;
            let non_unique: i64 = row.try_get(2)?;

            index_map
                .entry(index_name)
                .or_insert_with(|| (Vec::new(), non_unique == 0))
                .0
                .push(column_name);
        }

        Ok(index_map
            .into_iter()
            .map(|(name, (columns, unique))| Index::new(&name, columns, unique))
            .collect())
    }

    async fn get_foreign_keys(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                CAST(k.CONSTRAINT_NAME AS CHAR),
                CAST(k.COLUMN_NAME AS CHAR),
                CAST(k.REFERENCED_TABLE_NAME AS CHAR),
                CAST(k.REFERENCED_COLUMN_NAME AS CHAR),
                CAST(r.DELETE_RULE AS CHAR),
                CAST(r.UPDATE_RULE AS CHAR)
            FROM information_schema.KEY_COLUMN_USAGE k
            JOIN information_schema.REFERENTIAL_CONSTRAINTS r
                ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
                AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
            WHERE k.TABLE_SCHEMA = DATABASE() AND k.TABLE_NAME = ?
            ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#;

        let rows = sqlx::query(sql)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        group_foreign_key_rows(&rows)
    }
}

/// (制約名, カラム, 参照テーブル, 参照カラム, DELETE規則, UPDATE規則) の行をグループ化
fn group_foreign_key_rows(rows: &[sqlx::any::AnyRow]) -> Result<Vec<ForeignKey>> {
    let mut fk_map: BTreeMap<String, ForeignKeyBuilder> = BTreeMap::new();

    for row in rows {
        let constraint_name: String = row.try_get(0)?;
        let column: String = row.try_get(1)?;
        let referenced_table: String = row.try_get(2)?;
        let referenced_column: String = row.try_get(3)?;
        let delete_rule: Option<String> = row.try_get(4)?;
        let update_rule: Option<String> = row.try_get(5)?;

        let entry = fk_map
            .entry(constraint_name)
            .or_insert_with(|| ForeignKeyBuilder {
                referenced_table,
                on_delete: delete_rule.as_deref().and_then(referential_action),
                on_update: update_rule.as_deref().and_then(referential_action),
                ..Default::default()
            });
        entry.columns.push(column);
        entry.referenced_columns.push(referenced_column);
    }

    Ok(fk_map
        .into_iter()
        .map(|(name, builder)| builder.build(&name))
        .collect())
}

// =============================================================================
// SQLite イントロスペクター実装
// =============================================================================

impl SqliteIntrospector {
    /// CREATE TABLE文に AUTOINCREMENT を含むか
    async fn declares_autoincrement(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<bool> {
        let row = sqlx::query("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table_name)
            .fetch_optional(&mut *conn)
            .await?;
        let sql: Option<String> = match row {
            Some(row) => row.try_get(0)?,
            None => None,
        };
        Ok(sql.is_some_and(|s| s.to_ascii_uppercase().contains("AUTOINCREMENT")))
    }
}

#[async_trait]
impl DatabaseIntrospector for SqliteIntrospector {
    async fn get_table_names(&self, conn: &mut AnyConnection) -> Result<Vec<String>> {
        let sql = r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table'
                AND name NOT LIKE 'sqlite_%'
            ORDER BY name
        "#;

        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>(0)?))
            .collect()
    }

    async fn get_columns(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<RawColumnInfo>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier_ansi(table_name));
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

        let mut columns = Vec::with_capacity(rows.len());
        let mut pk_count = 0;
        for row in &rows {
            let not_null: i64 = row.try_get(3)?;
            let pk: i64 = row.try_get(5)?;
            if pk > 0 {
                pk_count += 1;
            }
            columns.push((
                pk > 0,
                RawColumnInfo {
                    name: row.try_get(1)?,
                    data_type: row.try_get(2)?,
                    is_nullable: not_null == 0,
                    default_value: row.try_get(4)?,
                    ..Default::default()
                },
            ));
        }

        // AUTOINCREMENT は単一の INTEGER 主キーにのみ付与できる
        let autoincrement =
            pk_count == 1 && self.declares_autoincrement(conn, table_name).await?;

        Ok(columns
            .into_iter()
            .map(|(is_pk, mut raw)| {
                if autoincrement && is_pk && raw.data_type.eq_ignore_ascii_case("INTEGER") {
                    raw.autoincrement = true;
                    raw.is_nullable = false;
                }
                raw
            })
            .collect())
    }

    async fn get_primary_key(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Option<Index>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier_ansi(table_name));
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

        let mut pk_columns: Vec<(i64, String)> = Vec::new();
        for row in &rows {
            let pk: i64 = row.try_get(5)?;
            if pk > 0 {
                pk_columns.push((pk, row.try_get(1)?));
            }
        }
        pk_columns.sort_by_key(|(position, _)| *position);

        Ok((!pk_columns.is_empty()).then(|| {
            Index::primary(
                DEFAULT_PRIMARY_KEY_NAME,
                pk_columns.into_iter().map(|(_, name)| name).collect(),
            )
        }))
    }

    async fn get_indexes(&self, conn: &mut AnyConnection, table_name: &str) -> Result<Vec<Index>> {
        let sql = format!("PRAGMA index_list({})", quote_identifier_ansi(table_name));
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

        let mut indexes = Vec::new();
        for row in &rows {
            let index_name: String = row.try_get(1)?;
            let is_unique: i64 = row.try_get(2)?;
            let origin: String = row.try_get(3)?;

            // 主キーと制約由来の自動インデックスをスキップ
            if origin == "pk" || index_name.starts_with("sqlite_") {
                continue;
            }

            let info_sql = format!("PRAGMA index_info({})", quote_identifier_ansi(&index_name));
            let info_rows = sqlx::query(&info_sql).fetch_all(&mut *conn).await?;
            let mut columns: Vec<(i64, String)> = Vec::new();
            for info in &info_rows {
                columns.push((info.try_get(0)?, info.try_get(2)?));
            }
            columns.sort_by_key(|(seqno, _)| *seqno);

            indexes.push(Index::new(
                &index_name,
                columns.into_iter().map(|(_, name)| name).collect(),
                is_unique == 1,
            ));
        }

        indexes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indexes)
    }

    async fn get_foreign_keys(
        &self,
        conn: &mut AnyConnection,
        table_name: &str,
    ) -> Result<Vec<ForeignKey>> {
        let sql = format!(
            "PRAGMA foreign_key_list({})",
            quote_identifier_ansi(table_name)
        );
        let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

        // SQLiteは制約名を返さないため、id から名前を合成する
        let mut fk_map: BTreeMap<i64, ForeignKeyBuilder> = BTreeMap::new();
        for row in &rows {
            let id: i64 = row.try_get(0)?;
            let referenced_table: String = row.try_get(2)?;
            let from_column: String = row.try_get(3)?;
            let to_column: String = row.try_get(4)?;
            let on_update: String = row.try_get(5)?;
            let on_delete: String = row.try_get(6)?;

            let entry = fk_map.entry(id).or_insert_with(|| ForeignKeyBuilder {
                referenced_table,
                on_delete: referential_action(&on_delete),
                on_update: referential_action(&on_update),
                ..Default::default()
            });
            entry.columns.push(from_column);
            entry.referenced_columns.push(to_column);
        }

        Ok(fk_map
            .into_iter()
            .map(|(id, builder)| builder.build(&format!("fk_{}_{}", table_name, id)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{ColumnDefault, ColumnType};

    #[test]
    fn test_create_introspector_per_platform() {
        assert!(create_introspector(Platform::PostgreSQL).is_some());
        assert!(create_introspector(Platform::MySQL).is_some());
        assert!(create_introspector(Platform::SQLite).is_some());
        assert!(create_introspector(Platform::Oracle).is_none());
    }

    #[test]
    fn test_raw_column_into_column_with_default() {
        let raw = RawColumnInfo {
            name: "enabled".to_string(),
            data_type: "boolean".to_string(),
            is_nullable: false,
            default_value: Some("true".to_string()),
            ..Default::default()
        };
        let column = raw.into_column(&TypeMappingService::new(Platform::PostgreSQL));
        assert_eq!(column.column_type, ColumnType::BOOLEAN);
        assert!(!column.nullable);
        assert_eq!(column.default, Some(ColumnDefault::Boolean(true)));
    }

    #[test]
    fn test_raw_column_autoincrement_drops_default() {
        let raw = RawColumnInfo {
            name: "id".to_string(),
            data_type: "bigint".to_string(),
            default_value: Some("nextval('oc_jobs_id_seq'::regclass)".to_string()),
            autoincrement: true,
            ..Default::default()
        };
        let column = raw.into_column(&TypeMappingService::new(Platform::PostgreSQL));
        assert!(column.autoincrement);
        assert_eq!(column.default, None);
    }

    #[test]
    fn test_raw_column_empty_comment_is_none() {
        let raw = RawColumnInfo {
            name: "uid".to_string(),
            data_type: "varchar(64)".to_string(),
            is_nullable: true,
            comment: Some(String::new()),
            ..Default::default()
        };
        let column = raw.into_column(&TypeMappingService::new(Platform::MySQL));
        assert_eq!(column.column_type, ColumnType::STRING);
        assert_eq!(column.length, Some(64));
        assert_eq!(column.comment, None);
    }

    #[test]
    fn test_referential_action_no_action_is_default() {
        assert_eq!(referential_action("NO ACTION"), None);
        assert_eq!(referential_action("CASCADE"), Some(ReferentialAction::Cascade));
    }
}

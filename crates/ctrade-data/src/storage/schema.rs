//! 하이퍼테이블/엔진 뷰 관리.
//!
//! 모든 연산은 멱등입니다. 테이블 생성은 존재 여부를 먼저 확인하고,
//! 없으면 하나의 트랜잭션에서 테이블, 고유 제약, 인덱스, 청크 폭, 압축 정책을
//! 함께 만듭니다.
//!
//! SQL 문은 순수 함수로 조립되어 DB 없이 검증할 수 있습니다. 테이블/컬럼 이름은
//! 파라미터로 바인딩할 수 없으므로 보간 전에 [`validate_identifier`]를 통과해야 합니다.

use serde::Serialize;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, info, instrument};

use ctrade_core::DatasetSpec;

use super::database::table_exists;
use crate::error::{DataError, Result};

/// 압축 정책 기본 경과 기간.
pub const DEFAULT_COMPRESS_AFTER: &str = "7 days";

/// SQL 식별자 검증 (`[a-z_][a-z0-9_]*`).
pub fn validate_identifier(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid_head = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let valid_tail = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid_head && valid_tail && name.len() <= 63 {
        Ok(name)
    } else {
        Err(DataError::Config(format!("허용되지 않는 SQL 식별자: {:?}", name)))
    }
}

fn column_list(columns: &[&str]) -> Result<String> {
    let checked = columns
        .iter()
        .map(|c| validate_identifier(c))
        .collect::<Result<Vec<_>>>()?;
    Ok(checked.join(", "))
}

/// `CREATE TABLE` 문.
pub fn create_table_sql(spec: &DatasetSpec) -> Result<String> {
    let table = validate_identifier(&spec.table)?;
    let mut defs = Vec::with_capacity(spec.fields.len() + 1);
    for field in &spec.fields {
        defs.push(format!(
            "    {} {} NOT NULL",
            validate_identifier(field.column)?,
            field.field_type.sql_type()
        ));
    }
    defs.push(format!("    UNIQUE ({})", column_list(&spec.unique_key)?));
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        table,
        defs.join(",\n")
    ))
}

/// `create_hypertable` 호출 (기본 인덱스는 직접 생성).
pub fn create_hypertable_sql(spec: &DatasetSpec) -> Result<String> {
    Ok(format!(
        "SELECT create_hypertable('{}', 'ts', chunk_time_interval => INTERVAL '{}', \
         create_default_indexes => FALSE, if_not_exists => TRUE)",
        validate_identifier(&spec.table)?,
        spec.partition.as_interval()
    ))
}

/// 시간 역순 인덱스와 (심볼, 시간 역순) 인덱스.
pub fn create_index_sql(spec: &DatasetSpec) -> Result<Vec<String>> {
    let table = validate_identifier(&spec.table)?;
    Ok(vec![
        format!("CREATE INDEX IF NOT EXISTS {t}_ts_idx ON {t} (ts DESC)", t = table),
        format!(
            "CREATE INDEX IF NOT EXISTS {t}_symbol_ts_idx ON {t} (symbol, ts DESC)",
            t = table
        ),
    ])
}

/// 압축 설정과 압축 정책.
pub fn compression_sql(spec: &DatasetSpec, compress_after: &str) -> Result<Vec<String>> {
    let table = validate_identifier(&spec.table)?;
    if !compress_after
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ')
    {
        return Err(DataError::Config(format!(
            "잘못된 압축 기간: {:?}",
            compress_after
        )));
    }
    Ok(vec![
        format!(
            "ALTER TABLE {} SET (timescaledb.compress, \
             timescaledb.compress_segmentby = 'symbol', \
             timescaledb.compress_orderby = 'ts DESC')",
            table
        ),
        format!(
            "SELECT add_compression_policy('{}', INTERVAL '{}', if_not_exists => TRUE)",
            table, compress_after
        ),
    ])
}

/// 엔진 뷰 `CREATE OR REPLACE VIEW` 문.
pub fn create_view_sql(view: &str, table: &str, columns: &[&str]) -> Result<String> {
    Ok(format!(
        "CREATE OR REPLACE VIEW {} AS SELECT {} FROM {}",
        validate_identifier(view)?,
        column_list(columns)?,
        validate_identifier(table)?
    ))
}

/// 하이퍼테이블 압축 통계.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct CompressionStats {
    pub total_chunks: Option<i64>,
    pub number_compressed_chunks: Option<i64>,
    pub before_compression_total_bytes: Option<i64>,
    pub after_compression_total_bytes: Option<i64>,
}

impl CompressionStats {
    /// 압축률 (압축 전/후 바이트 비율).
    pub fn ratio(&self) -> Option<f64> {
        match (
            self.before_compression_total_bytes,
            self.after_compression_total_bytes,
        ) {
            (Some(before), Some(after)) if after > 0 => Some(before as f64 / after as f64),
            _ => None,
        }
    }
}

/// 스키마/뷰 관리자.
#[derive(Clone)]
pub struct SchemaManager {
    pool: PgPool,
    compress_after: String,
}

impl SchemaManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            compress_after: DEFAULT_COMPRESS_AFTER.to_string(),
        }
    }

    /// 압축 정책 경과 기간 변경 (예: `"3 days"`).
    pub fn with_compress_after(mut self, compress_after: impl Into<String>) -> Self {
        self.compress_after = compress_after.into();
        self
    }

    /// 테이블 존재 여부.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        table_exists(&self.pool, validate_identifier(table)?).await
    }

    /// 하이퍼테이블을 보장합니다. 새로 만들었으면 `true`.
    #[instrument(skip(self, spec), fields(table = %spec.table))]
    pub async fn ensure_table(&self, spec: &DatasetSpec) -> Result<bool> {
        // 문장 조립을 I/O 전에 끝내 잘못된 식별자는 바로 실패
        let create = create_table_sql(spec)?;
        let hypertable = create_hypertable_sql(spec)?;
        let indexes = create_index_sql(spec)?;
        let compression = compression_sql(spec, &self.compress_after)?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS timescaledb")
            .execute(&self.pool)
            .await?;

        if self.table_exists(&spec.table).await? {
            debug!("테이블이 이미 존재합니다");
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        // 동시 생성 직렬화 후 재확인
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&spec.table)
            .execute(&mut *tx)
            .await?;
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1)",
        )
        .bind(&spec.table)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            return Ok(false);
        }

        sqlx::query(&create).execute(&mut *tx).await?;
        sqlx::query(&hypertable).execute(&mut *tx).await?;
        for statement in indexes.iter().chain(compression.iter()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(
            chunk = spec.partition.as_interval(),
            compress_after = %self.compress_after,
            "하이퍼테이블 생성 완료"
        );
        Ok(true)
    }

    /// 엔진 뷰를 생성/교체합니다.
    ///
    /// 원본 테이블이 아직 없으면 건너뛰고 `false`를 반환합니다.
    #[instrument(skip(self, columns))]
    pub async fn ensure_view(&self, view: &str, table: &str, columns: &[&str]) -> Result<bool> {
        let sql = create_view_sql(view, table, columns)?;

        if !self.table_exists(table).await? {
            info!("원본 테이블이 없어 뷰 생성을 건너뜁니다");
            return Ok(false);
        }

        sqlx::query(&sql).execute(&self.pool).await?;
        debug!("뷰 생성 완료");
        Ok(true)
    }

    /// 데이터셋 정의의 뷰를 보장합니다.
    pub async fn ensure_dataset_view(&self, spec: &DatasetSpec) -> Result<bool> {
        self.ensure_view(&spec.view, &spec.table, &spec.columns()).await
    }

    /// 압축 통계 조회 (진단용).
    ///
    /// 실패는 항상 [`DataError::Diagnostic`]이며 호출자는 로그만 남깁니다.
    pub async fn compression_stats(&self, table: &str) -> Result<CompressionStats> {
        let table = validate_identifier(table).map_err(|e| DataError::Diagnostic(e.to_string()))?;
        sqlx::query_as::<_, CompressionStats>(
            r#"
            SELECT total_chunks, number_compressed_chunks,
                   before_compression_total_bytes, after_compression_total_bytes
            FROM hypertable_compression_stats($1::regclass)
            "#,
        )
        .bind(table)
        .fetch_optional(&self.pool)
        .await
        .map(Option::unwrap_or_default)
        .map_err(|e| DataError::Diagnostic(format!("{}: {}", table, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrade_core::{BarInterval, DatasetKind, DatasetRegistry};

    fn spec(kind: DatasetKind) -> DatasetSpec {
        DatasetRegistry::usdm_futures(BarInterval::M1)
            .require(kind)
            .unwrap()
            .clone()
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("klines_1m").is_ok());
        assert!(validate_identifier("_stage").is_ok());
        assert!(validate_identifier("1m_klines").is_err());
        assert!(validate_identifier("Klines").is_err());
        assert!(validate_identifier("agg_trades; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&spec(DatasetKind::AggTrades)).unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS agg_trades ("));
        assert!(sql.contains("ts TIMESTAMPTZ NOT NULL"));
        assert!(sql.contains("agg_trade_id BIGINT NOT NULL"));
        assert!(sql.contains("is_buyer_maker BOOLEAN NOT NULL"));
        assert!(sql.contains("UNIQUE (ts, symbol, agg_trade_id)"));
    }

    #[test]
    fn test_hypertable_chunk_width() {
        let day = create_hypertable_sql(&spec(DatasetKind::BookDepth)).unwrap();
        assert!(day.contains("'book_depth'"));
        assert!(day.contains("INTERVAL '1 day'"));

        let week = create_hypertable_sql(&spec(DatasetKind::Klines)).unwrap();
        assert!(week.contains("'klines_1m'"));
        assert!(week.contains("INTERVAL '1 week'"));
    }

    #[test]
    fn test_indexes_and_compression() {
        let s = spec(DatasetKind::MarkPriceKlines);
        let indexes = create_index_sql(&s).unwrap();
        assert_eq!(indexes.len(), 2);
        assert!(indexes[0].ends_with("ON mark_price_klines_1m (ts DESC)"));
        assert!(indexes[1].ends_with("ON mark_price_klines_1m (symbol, ts DESC)"));

        let compression = compression_sql(&s, DEFAULT_COMPRESS_AFTER).unwrap();
        assert!(compression[0].contains("compress_segmentby = 'symbol'"));
        assert!(compression[1].contains("INTERVAL '7 days'"));
        assert!(compression_sql(&s, "7 days'); --").is_err());
    }

    #[test]
    fn test_view_sql() {
        let s = spec(DatasetKind::BookDepth);
        let sql = create_view_sql(&s.view, &s.table, &s.columns()).unwrap();
        assert_eq!(
            sql,
            "CREATE OR REPLACE VIEW engine_book_depth AS SELECT ts, symbol, percentage, depth, notional FROM book_depth"
        );
        assert!(create_view_sql("v", "t", &["ok", "Bad"]).is_err());
    }

    #[test]
    fn test_compression_ratio() {
        let stats = CompressionStats {
            total_chunks: Some(4),
            number_compressed_chunks: Some(3),
            before_compression_total_bytes: Some(1000),
            after_compression_total_bytes: Some(100),
        };
        assert_eq!(stats.ratio(), Some(10.0));
        assert_eq!(CompressionStats::default().ratio(), None);
    }
}

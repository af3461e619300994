//! 중복 제거 벌크 적재.
//!
//! 파일 한 개 = 트랜잭션 한 개. 파싱은 blocking 스레드에서 고정 크기 배치로
//! 나뉘어 bounded 채널로 전달되고, 각 배치는 다음 순서로 처리됩니다:
//!
//! 1. 임시 스테이징 테이블(`stage_<uuid>`, `ON COMMIT DROP`)에 `UNNEST` 배열로 삽입
//! 2. `INSERT ... SELECT ... ON CONFLICT DO NOTHING`으로 본 테이블에 병합
//! 3. 스테이징 테이블 `TRUNCATE`
//!
//! 실패나 취소로 트랜잭션이 drop되면 롤백되어 스테이징 테이블도 함께 사라집니다.
//! 병합은 삽입만 하고 충돌은 무시하므로 같은 파일을 여러 번, 어떤 순서로
//! 적재해도 최종 상태는 같습니다.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::Query;
use sqlx::Postgres;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use ctrade_core::{CanonicalRow, DatasetKind, DatasetSpec, FieldType};

use super::schema::validate_identifier;
use crate::error::{DataError, Result};
use crate::parser::ParserRegistry;

/// 기본 배치 크기 (행).
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// 기본 동시 적재 파일 수.
pub const DEFAULT_LOAD_CONCURRENCY: usize = 4;

/// 파서 → 적재기 채널 깊이 (배치 단위).
const CHANNEL_DEPTH: usize = 2;

/// 단일 컬럼 배열.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Timestamp(Vec<DateTime<Utc>>),
    Text(Vec<String>),
    Float64(Vec<f64>),
    Int64(Vec<i64>),
    Int32(Vec<i32>),
    Int16(Vec<i16>),
    Bool(Vec<bool>),
}

impl Column {
    pub fn field_type(&self) -> FieldType {
        match self {
            Column::Timestamp(_) => FieldType::Timestamp,
            Column::Text(_) => FieldType::Text,
            Column::Float64(_) => FieldType::Float64,
            Column::Int64(_) => FieldType::Int64,
            Column::Int32(_) => FieldType::Int32,
            Column::Int16(_) => FieldType::Int16,
            Column::Bool(_) => FieldType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Timestamp(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Int32(v) => v.len(),
            Column::Int16(v) => v.len(),
            Column::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bind<'q>(&'q self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            Column::Timestamp(v) => query.bind(v),
            Column::Text(v) => query.bind(v),
            Column::Float64(v) => query.bind(v),
            Column::Int64(v) => query.bind(v),
            Column::Int32(v) => query.bind(v),
            Column::Int16(v) => query.bind(v),
            Column::Bool(v) => query.bind(v),
        }
    }
}

fn mismatch(expected: DatasetKind, row: &CanonicalRow) -> DataError {
    DataError::Config(format!(
        "{} 배치에 {} 행이 섞여 있습니다",
        expected,
        row.kind()
    ))
}

/// 행 배치를 데이터셋 필드 순서의 컬럼 배열로 변환합니다.
pub fn columns_from_rows(kind: DatasetKind, rows: &[CanonicalRow]) -> Result<Vec<Column>> {
    let n = rows.len();
    let ts: Vec<DateTime<Utc>> = rows.iter().map(CanonicalRow::ts).collect();
    let symbols: Vec<String> = rows.iter().map(|r| r.symbol().to_string()).collect();

    let columns = match kind {
        DatasetKind::Klines => {
            let (mut open, mut high, mut low, mut close, mut volume) = (
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
            );
            let (mut quote, mut trades, mut taker, mut taker_quote) = (
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
            );
            for row in rows {
                let CanonicalRow::Kline(k) = row else {
                    return Err(mismatch(kind, row));
                };
                open.push(k.open);
                high.push(k.high);
                low.push(k.low);
                close.push(k.close);
                volume.push(k.volume);
                quote.push(k.quote_volume);
                trades.push(k.trades);
                taker.push(k.taker_buy_volume);
                taker_quote.push(k.taker_buy_quote_volume);
            }
            vec![
                Column::Timestamp(ts),
                Column::Text(symbols),
                Column::Float64(open),
                Column::Float64(high),
                Column::Float64(low),
                Column::Float64(close),
                Column::Float64(volume),
                Column::Float64(quote),
                Column::Int32(trades),
                Column::Float64(taker),
                Column::Float64(taker_quote),
            ]
        }
        DatasetKind::AggTrades => {
            let (mut id, mut price, mut qty, mut first, mut last, mut maker) = (
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
            );
            for row in rows {
                let CanonicalRow::AggTrade(t) = row else {
                    return Err(mismatch(kind, row));
                };
                id.push(t.agg_trade_id);
                price.push(t.price);
                qty.push(t.qty);
                first.push(t.first_trade_id);
                last.push(t.last_trade_id);
                maker.push(t.is_buyer_maker);
            }
            vec![
                Column::Timestamp(ts),
                Column::Text(symbols),
                Column::Int64(id),
                Column::Float64(price),
                Column::Float64(qty),
                Column::Int64(first),
                Column::Int64(last),
                Column::Bool(maker),
            ]
        }
        DatasetKind::BookDepth => {
            let (mut pct, mut depth, mut notional) =
                (Vec::with_capacity(n), Vec::with_capacity(n), Vec::with_capacity(n));
            for row in rows {
                let CanonicalRow::BookDepth(b) = row else {
                    return Err(mismatch(kind, row));
                };
                pct.push(b.percentage);
                depth.push(b.depth);
                notional.push(b.notional);
            }
            vec![
                Column::Timestamp(ts),
                Column::Text(symbols),
                Column::Int16(pct),
                Column::Float64(depth),
                Column::Float64(notional),
            ]
        }
        DatasetKind::MarkPriceKlines => {
            let (mut open, mut high, mut low, mut close) = (
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
                Vec::with_capacity(n),
            );
            for row in rows {
                let CanonicalRow::MarkPrice(m) = row else {
                    return Err(mismatch(kind, row));
                };
                open.push(m.open);
                high.push(m.high);
                low.push(m.low);
                close.push(m.close);
            }
            vec![
                Column::Timestamp(ts),
                Column::Text(symbols),
                Column::Float64(open),
                Column::Float64(high),
                Column::Float64(low),
                Column::Float64(close),
            ]
        }
    };
    Ok(columns)
}

/// 스테이징 테이블 이름 (`stage_<uuid>`).
pub fn staging_table_name() -> String {
    format!("stage_{}", Uuid::new_v4().simple())
}

/// 스테이징 테이블 생성문.
pub fn create_staging_sql(spec: &DatasetSpec, stage: &str) -> Result<String> {
    Ok(format!(
        "CREATE TEMP TABLE {} (LIKE {} INCLUDING DEFAULTS) ON COMMIT DROP",
        validate_identifier(stage)?,
        validate_identifier(&spec.table)?
    ))
}

/// 스테이징 `UNNEST` 삽입문.
pub fn stage_insert_sql(spec: &DatasetSpec, stage: &str) -> Result<String> {
    let columns = spec.columns().join(", ");
    let arrays: Vec<String> = spec
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| format!("${}::{}", i + 1, f.field_type.sql_array_type()))
        .collect();
    Ok(format!(
        "INSERT INTO {} ({}) SELECT * FROM UNNEST({})",
        validate_identifier(stage)?,
        columns,
        arrays.join(", ")
    ))
}

/// 스테이징 → 본 테이블 병합문 (충돌 무시).
pub fn merge_sql(spec: &DatasetSpec, stage: &str) -> Result<String> {
    for column in spec.columns() {
        validate_identifier(column)?;
    }
    let columns = spec.columns().join(", ");
    Ok(format!(
        "INSERT INTO {table} ({cols}) SELECT {cols} FROM {stage} ON CONFLICT ({key}) DO NOTHING",
        table = validate_identifier(&spec.table)?,
        cols = columns,
        stage = validate_identifier(stage)?,
        key = spec.unique_key.join(", ")
    ))
}

/// 파일 한 개 적재 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// 파싱된 행 수
    pub rows_parsed: u64,
    /// 실제로 새로 삽입된 행 수 (충돌 무시 제외)
    pub rows_inserted: u64,
    /// 버려진 줄 수 (헤더 포함)
    pub lines_skipped: u64,
}

impl LoadOutcome {
    /// 이미 존재하여 무시된 행 수.
    pub fn conflicts_ignored(&self) -> u64 {
        self.rows_parsed.saturating_sub(self.rows_inserted)
    }
}

/// 파일 배치 적재 보고서.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub rows_parsed: u64,
    pub rows_inserted: u64,
    pub lines_skipped: u64,
    /// 성공한 파일 수
    pub loaded: usize,
    /// 실패한 파일과 원인
    pub failures: Vec<(PathBuf, DataError)>,
}

impl LoadReport {
    fn record(&mut self, path: PathBuf, result: Result<LoadOutcome>) {
        match result {
            Ok(outcome) => {
                self.loaded += 1;
                self.rows_parsed += outcome.rows_parsed;
                self.rows_inserted += outcome.rows_inserted;
                self.lines_skipped += outcome.lines_skipped;
            }
            Err(e) => self.failures.push((path, e)),
        }
    }
}

/// 벌크 적재기.
#[derive(Clone)]
pub struct BulkLoader {
    pool: PgPool,
    parsers: ParserRegistry,
    batch_size: usize,
    concurrency: usize,
}

impl BulkLoader {
    pub fn new(pool: PgPool, parsers: ParserRegistry) -> Self {
        Self {
            pool,
            parsers,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_LOAD_CONCURRENCY,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 파일 한 개를 적재합니다.
    #[instrument(skip(self, spec, path), fields(table = %spec.table, file = %path.display()))]
    pub async fn load_file(&self, spec: &DatasetSpec, symbol: &str, path: &Path) -> Result<LoadOutcome> {
        let stage = staging_table_name();
        let create_stage = create_staging_sql(spec, &stage)?;
        let insert_stage = stage_insert_sql(spec, &stage)?;
        let merge = merge_sql(spec, &stage)?;
        let truncate = format!("TRUNCATE {}", stage);

        let (sender, mut receiver) = mpsc::channel::<Vec<CanonicalRow>>(CHANNEL_DEPTH);
        let parsers = self.parsers.clone();
        let kind = spec.kind;
        let owned_symbol = symbol.to_string();
        let owned_path = path.to_path_buf();
        let batch_size = self.batch_size;

        // 수신 측이 사라지면 전송 실패로 조기 종료
        let producer = tokio::task::spawn_blocking(move || -> Result<u64> {
            let mut rows = parsers.open_file(kind, &owned_symbol, &owned_path)?;
            let mut batch = Vec::with_capacity(batch_size);
            while let Some(row) = rows.next() {
                batch.push(row?);
                if batch.len() >= batch_size {
                    let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
                    if sender.blocking_send(full).is_err() {
                        return Ok(rows.skipped() as u64);
                    }
                }
            }
            if !batch.is_empty() {
                let _ = sender.blocking_send(batch);
            }
            Ok(rows.skipped() as u64)
        });

        let mut tx = self.pool.begin().await?;
        sqlx::query(&create_stage).execute(&mut *tx).await?;

        let mut outcome = LoadOutcome::default();
        while let Some(batch) = receiver.recv().await {
            let columns = columns_from_rows(kind, &batch)?;
            let query = columns
                .iter()
                .fold(sqlx::query(&insert_stage), |q, column| column.bind(q));
            query.execute(&mut *tx).await?;

            let merged = sqlx::query(&merge).execute(&mut *tx).await?.rows_affected();
            sqlx::query(&truncate).execute(&mut *tx).await?;

            outcome.rows_parsed += batch.len() as u64;
            outcome.rows_inserted += merged;
            debug!(batch = batch.len(), inserted = merged, "배치 병합");
        }

        // 파서 에러(I/O 등)는 커밋 전에 확인
        outcome.lines_skipped = producer.await??;
        tx.commit().await?;

        debug!(
            parsed = outcome.rows_parsed,
            inserted = outcome.rows_inserted,
            skipped = outcome.lines_skipped,
            "파일 적재 완료"
        );
        Ok(outcome)
    }

    /// 여러 파일을 최대 `concurrency`개씩 동시에 적재합니다.
    ///
    /// 파일별 실패는 보고서에 기록되며 다른 파일 적재를 중단하지 않습니다.
    pub async fn load_files(&self, spec: &DatasetSpec, symbol: &str, files: &[PathBuf]) -> LoadReport {
        let results: Vec<(PathBuf, Result<LoadOutcome>)> = stream::iter(files.iter().cloned())
            .map(|path| async move {
                let result = self.load_file(spec, symbol, &path).await;
                (path, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = LoadReport::default();
        for (path, result) in results {
            if let Err(e) = &result {
                warn!(file = %path.display(), error = %e, "파일 적재 실패");
            }
            report.record(path, result);
        }

        info!(
            dataset = %spec.kind,
            symbol = symbol,
            files = files.len(),
            loaded = report.loaded,
            failed = report.failures.len(),
            rows_inserted = report.rows_inserted,
            "적재 완료"
        );
        report
    }
}

//! 원격 아카이브 증분 동기화 모듈.
//!
//! (심볼, 데이터셋)마다:
//!
//! 1. 하이퍼테이블 보장
//! 2. 워터마크 조회
//! 3. 원격 목록 조회 → 계획
//! 4. 병렬 다운로드 (`fetch_concurrency`)
//! 5. 병렬 적재 (`load_concurrency`)
//! 6. 엔진 뷰 보장, 압축 통계 기록
//!
//! 1~3단계 실패는 해당 (심볼, 데이터셋)만 중단하고, 객체/파일 단위 실패는
//! 통계에 기록한 뒤 계속 진행합니다.

use chrono::NaiveDate;
use sqlx::PgPool;
use std::path::PathBuf;
use std::time::Instant;
use tracing::Instrument;

use ctrade_core::{dataset_span, DatasetRegistry, DatasetSpec, DateRange};
use ctrade_data::{
    ArtifactLayout, BulkLoader, CatalogLister, ParallelFetcher, ParserRegistry, SchemaManager,
    WatermarkTracker,
};

use super::plan::plan_range;
use super::view_refresh::log_compression_stats;
use crate::stats::{DatasetStats, SyncSummary};
use crate::{CollectorConfig, Result};

/// 동기화 구성 요소 묶음.
#[derive(Clone)]
pub struct SyncContext {
    pub registry: DatasetRegistry,
    pub lister: CatalogLister,
    pub fetcher: ParallelFetcher,
    pub loader: BulkLoader,
    pub schema: SchemaManager,
    pub watermark: WatermarkTracker,
    pub layout: ArtifactLayout,
}

impl SyncContext {
    /// 설정으로 구성 요소를 생성합니다 (네트워크 I/O 없음).
    pub fn new(pool: &PgPool, config: &CollectorConfig) -> Result<Self> {
        let sync = &config.sync;
        let client = config.http.build_client()?;
        let layout = ArtifactLayout::new(&sync.data_root);

        Ok(Self {
            registry: config.registry()?,
            lister: CatalogLister::with_client(client.clone(), &config.http),
            fetcher: ParallelFetcher::with_client(
                client,
                &config.http,
                layout.clone(),
                sync.fetch_concurrency,
            ),
            loader: BulkLoader::new(pool.clone(), ParserRegistry::usdm_futures())
                .with_batch_size(sync.batch_size)
                .with_concurrency(sync.load_concurrency),
            schema: SchemaManager::new(pool.clone()).with_compress_after(&sync.compress_after),
            watermark: WatermarkTracker::new(pool.clone()),
            layout,
        })
    }

    /// 테이블을 보장하고 현재 워터마크를 반환합니다.
    pub(crate) async fn prepare(&self, spec: &DatasetSpec, symbol: &str) -> Result<Option<NaiveDate>> {
        self.schema.ensure_table(spec).await?;
        let watermark = self.watermark.latest_date(spec, symbol).await?;
        tracing::debug!(watermark = ?watermark, "워터마크 확인");
        Ok(watermark)
    }

    /// 파일을 적재하고 뷰를 갱신합니다.
    pub(crate) async fn load_and_publish(
        &self,
        spec: &DatasetSpec,
        symbol: &str,
        files: &[PathBuf],
        stats: &mut DatasetStats,
    ) {
        if !files.is_empty() {
            let report = self.loader.load_files(spec, symbol, files).await;
            for (path, error) in &report.failures {
                tracing::warn!(file = %path.display(), error = %error, "적재 실패 (다음 실행에서 재시도)");
            }
            stats.record_load(&report);
        }

        if let Err(e) = self.schema.ensure_dataset_view(spec).await {
            tracing::warn!(view = %spec.view, error = %e, "뷰 갱신 실패");
        }
        log_compression_stats(&self.schema, spec).await;
    }
}

/// 단일 (심볼, 데이터셋) 동기화
pub async fn sync_dataset(
    ctx: &SyncContext,
    spec: &DatasetSpec,
    symbol: &str,
    range: &DateRange,
) -> DatasetStats {
    let span = dataset_span!("sync", symbol, spec.kind);
    async {
        let start = Instant::now();
        let mut stats = DatasetStats::new(symbol, spec.kind);

        if let Err(e) = sync_inner(ctx, spec, symbol, range, &mut stats).await {
            tracing::error!(error = %e, "데이터셋 동기화 실패");
            stats.error = Some(e.to_string());
        }

        stats.elapsed = start.elapsed();
        stats
    }
    .instrument(span)
    .await
}

async fn sync_inner(
    ctx: &SyncContext,
    spec: &DatasetSpec,
    symbol: &str,
    range: &DateRange,
    stats: &mut DatasetStats,
) -> Result<()> {
    let watermark = ctx.prepare(spec, symbol).await?;

    let listing = ctx.lister.list(spec, symbol).await?;
    stats.listed = listing.len();

    let planned = plan_range(&listing, watermark, range);
    stats.planned = planned.len();
    tracing::info!(
        listed = stats.listed,
        planned = stats.planned,
        range = %range,
        watermark = ?watermark,
        "동기화 계획 수립"
    );

    let report = ctx.fetcher.fetch_all(&planned).await;
    stats.record_fetch(&report);
    for (object, error) in report.failures() {
        tracing::warn!(key = %object.key, error = %error, retryable = error.is_retryable(), "다운로드 실패");
    }

    let files: Vec<PathBuf> = report.artifacts().map(|(_, path)| path.to_path_buf()).collect();
    ctx.load_and_publish(spec, symbol, &files, stats).await;
    Ok(())
}

/// 모든 심볼 × 선택된 데이터셋 동기화
///
/// 한 데이터셋의 실패는 다른 데이터셋 처리를 막지 않습니다.
pub async fn sync_all(ctx: &SyncContext, symbols: &[String], range: &DateRange) -> SyncSummary {
    let start = Instant::now();
    let mut summary = SyncSummary::new();

    tracing::info!(
        symbols = symbols.len(),
        datasets = ctx.registry.len(),
        range = %range,
        "동기화 시작"
    );

    for symbol in symbols {
        for spec in ctx.registry.iter() {
            let stats = sync_dataset(ctx, spec, symbol, range).await;
            stats.log_summary("sync");
            summary.push(stats);
        }
    }

    summary.elapsed = start.elapsed();
    summary
}

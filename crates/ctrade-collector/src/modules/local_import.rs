//! 로컬 아티팩트 적재 모듈.
//!
//! 이미 다운로드된 `<data-root>/<symbol>/<dataset>/*.csv` 파일을
//! 네트워크 없이 적재합니다. 계획은 원격 동기화와 같은 규칙을 따릅니다.

use std::path::PathBuf;
use std::time::Instant;
use tracing::Instrument;

use ctrade_core::{dataset_span, DatasetSpec, DateRange};

use super::dataset_sync::SyncContext;
use super::plan::{plan_range, LocalArtifact};
use crate::error::CollectorError;
use crate::stats::{DatasetStats, SyncSummary};
use crate::Result;

/// 로컬 아티팩트 목록
pub async fn local_listing(ctx: &SyncContext, spec: &DatasetSpec, symbol: &str) -> Result<Vec<LocalArtifact>> {
    let layout = ctx.layout.clone();
    let spec = spec.clone();
    let symbol = symbol.to_string();

    let found = tokio::task::spawn_blocking(move || layout.local_artifacts(&spec, &symbol))
        .await
        .map_err(|e| CollectorError::Other(Box::new(e)))??;

    Ok(found
        .into_iter()
        .map(|(date, path)| LocalArtifact { date, path })
        .collect())
}

/// 단일 (심볼, 데이터셋) 로컬 적재
pub async fn import_dataset(
    ctx: &SyncContext,
    spec: &DatasetSpec,
    symbol: &str,
    range: &DateRange,
) -> DatasetStats {
    let span = dataset_span!("import", symbol, spec.kind);
    async {
        let start = Instant::now();
        let mut stats = DatasetStats::new(symbol, spec.kind);

        if let Err(e) = import_inner(ctx, spec, symbol, range, &mut stats).await {
            tracing::error!(error = %e, "로컬 적재 실패");
            stats.error = Some(e.to_string());
        }

        stats.elapsed = start.elapsed();
        stats
    }
    .instrument(span)
    .await
}

async fn import_inner(
    ctx: &SyncContext,
    spec: &DatasetSpec,
    symbol: &str,
    range: &DateRange,
    stats: &mut DatasetStats,
) -> Result<()> {
    let watermark = ctx.prepare(spec, symbol).await?;

    let listing = local_listing(ctx, spec, symbol).await?;
    stats.listed = listing.len();

    let planned = plan_range(&listing, watermark, range);
    stats.planned = planned.len();
    stats.skipped = planned.len();
    tracing::info!(
        listed = stats.listed,
        planned = stats.planned,
        root = %ctx.layout.root().display(),
        "로컬 적재 계획 수립"
    );

    let files: Vec<PathBuf> = planned.into_iter().map(|a| a.path).collect();
    ctx.load_and_publish(spec, symbol, &files, stats).await;
    Ok(())
}

/// 모든 심볼 × 선택된 데이터셋 로컬 적재
pub async fn import_all(ctx: &SyncContext, symbols: &[String], range: &DateRange) -> SyncSummary {
    let start = Instant::now();
    let mut summary = SyncSummary::new();

    for symbol in symbols {
        for spec in ctx.registry.iter() {
            let stats = import_dataset(ctx, spec, symbol, range).await;
            stats.log_summary("import");
            summary.push(stats);
        }
    }

    summary.elapsed = start.elapsed();
    summary
}

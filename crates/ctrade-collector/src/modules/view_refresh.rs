//! 엔진 뷰 재생성 및 압축 통계 기록.

use ctrade_core::{DatasetRegistry, DatasetSpec};
use ctrade_data::{DataError, SchemaManager};

use crate::stats::ViewStats;

/// 레지스트리의 모든 뷰를 재생성합니다.
///
/// 원본 테이블이 없는 뷰는 건너뜁니다. 한 뷰의 실패는 나머지를 막지 않습니다.
pub async fn refresh_views(schema: &SchemaManager, registry: &DatasetRegistry) -> ViewStats {
    let mut stats = ViewStats::default();

    for spec in registry.iter() {
        match schema.ensure_dataset_view(spec).await {
            Ok(true) => {
                tracing::info!(view = %spec.view, table = %spec.table, "뷰 갱신");
                stats.created += 1;
            }
            Ok(false) => stats.skipped += 1,
            Err(e) => {
                tracing::warn!(view = %spec.view, error = %e, "뷰 갱신 실패");
                stats.failed += 1;
            }
        }
    }

    stats
}

/// 압축 통계를 디버그 로그로 남깁니다. 조회 실패는 무시합니다.
pub async fn log_compression_stats(schema: &SchemaManager, spec: &DatasetSpec) {
    match schema.compression_stats(&spec.table).await {
        Ok(stats) => tracing::debug!(
            table = %spec.table,
            total_chunks = ?stats.total_chunks,
            compressed_chunks = ?stats.number_compressed_chunks,
            ratio = ?stats.ratio(),
            "압축 통계"
        ),
        Err(DataError::Diagnostic(reason)) => {
            tracing::debug!(table = %spec.table, reason = %reason, "압축 통계 조회 불가")
        }
        Err(e) => tracing::debug!(table = %spec.table, error = %e, "압축 통계 조회 실패"),
    }
}

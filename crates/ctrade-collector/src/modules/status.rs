//! 적재 상태 조회 (워터마크 + 압축 통계).

use chrono::NaiveDate;
use serde::Serialize;

use ctrade_core::DatasetKind;
use ctrade_data::CompressionStats;

use super::dataset_sync::SyncContext;
use crate::Result;

/// (심볼, 데이터셋) 상태 한 줄.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatus {
    pub symbol: String,
    pub dataset: DatasetKind,
    pub table: String,
    pub table_exists: bool,
    pub watermark: Option<NaiveDate>,
    pub compression: Option<CompressionStats>,
}

impl DatasetStatus {
    /// 사람이 읽는 한 줄 요약.
    pub fn render(&self) -> String {
        let watermark = self
            .watermark
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let ratio = self
            .compression
            .as_ref()
            .and_then(CompressionStats::ratio)
            .map(|r| format!("{:.1}x", r))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{:<12} {:<10} {:<24} {:<12} {}",
            self.symbol, self.dataset, self.table, watermark, ratio
        )
    }
}

/// 심볼 × 데이터셋 상태를 읽습니다. 테이블을 만들지 않습니다.
pub async fn collect_status(ctx: &SyncContext, symbols: &[String]) -> Result<Vec<DatasetStatus>> {
    let mut rows = Vec::new();

    for spec in ctx.registry.iter() {
        let exists = ctx.schema.table_exists(&spec.table).await?;
        let compression = if exists {
            ctx.schema.compression_stats(&spec.table).await.ok()
        } else {
            None
        };

        for symbol in symbols {
            let watermark = if exists {
                ctx.watermark.latest_date(spec, symbol).await?
            } else {
                None
            };
            rows.push(DatasetStatus {
                symbol: symbol.clone(),
                dataset: spec.kind,
                table: spec.table.clone(),
                table_exists: exists,
                watermark,
                compression: compression.clone(),
            });
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_data() {
        let status = DatasetStatus {
            symbol: "BTCUSDT".into(),
            dataset: DatasetKind::Klines,
            table: "klines_1m".into(),
            table_exists: false,
            watermark: None,
            compression: None,
        };
        let line = status.render();
        assert!(line.starts_with("BTCUSDT"));
        assert!(line.trim_end().ends_with('-'));
    }

    #[test]
    fn test_render_with_ratio() {
        let status = DatasetStatus {
            symbol: "ETHUSDT".into(),
            dataset: DatasetKind::BookDepth,
            table: "book_depth".into(),
            table_exists: true,
            watermark: ctrade_core::parse_date("2024-03-01").ok(),
            compression: Some(CompressionStats {
                total_chunks: Some(4),
                number_compressed_chunks: Some(2),
                before_compression_total_bytes: Some(1000),
                after_compression_total_bytes: Some(100),
            }),
        };
        let line = status.render();
        assert!(line.contains("2024-03-01"));
        assert!(line.contains("10.0x"));
    }
}

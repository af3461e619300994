//! 동기화 통계 구조체.

use serde::Serialize;
use std::time::Duration;

use ctrade_core::DatasetKind;
use ctrade_data::{FetchReport, LoadReport};

/// (심볼, 데이터셋) 단위 동기화 통계
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub symbol: String,
    pub dataset: DatasetKind,
    /// 원격(또는 로컬) 목록의 객체 수
    pub listed: usize,
    /// 계획된 객체 수
    pub planned: usize,
    /// 새로 다운로드한 객체 수
    pub fetched: usize,
    /// 이미 존재하여 건너뛴 객체 수
    pub skipped: usize,
    /// 다운로드 실패 수
    pub fetch_failed: usize,
    /// 적재 성공 파일 수
    pub loaded: usize,
    /// 적재 실패 파일 수
    pub load_failed: usize,
    pub rows_parsed: u64,
    /// 새로 삽입된 행 수
    pub rows_inserted: u64,
    /// 버려진 줄 수
    pub lines_skipped: u64,
    /// 데이터셋 단위 중단 원인 (스키마/목록 실패)
    pub error: Option<String>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl DatasetStats {
    /// 새 통계 객체 생성
    pub fn new(symbol: &str, dataset: DatasetKind) -> Self {
        Self {
            symbol: symbol.to_string(),
            dataset,
            listed: 0,
            planned: 0,
            fetched: 0,
            skipped: 0,
            fetch_failed: 0,
            loaded: 0,
            load_failed: 0,
            rows_parsed: 0,
            rows_inserted: 0,
            lines_skipped: 0,
            error: None,
            elapsed: Duration::ZERO,
        }
    }

    pub fn record_fetch(&mut self, report: &FetchReport) {
        self.fetched += report.fetched;
        self.skipped += report.skipped;
        self.fetch_failed += report.failed;
    }

    pub fn record_load(&mut self, report: &LoadReport) {
        self.loaded += report.loaded;
        self.load_failed += report.failures.len();
        self.rows_parsed += report.rows_parsed;
        self.rows_inserted += report.rows_inserted;
        self.lines_skipped += report.lines_skipped;
    }

    /// 실패 수 (객체 + 파일 + 데이터셋 중단).
    pub fn failures(&self) -> usize {
        self.fetch_failed + self.load_failed + usize::from(self.error.is_some())
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        if let Some(error) = &self.error {
            tracing::error!(
                operation = operation,
                symbol = %self.symbol,
                dataset = %self.dataset,
                error = %error,
                "데이터셋 동기화 중단"
            );
            return;
        }
        tracing::info!(
            operation = operation,
            symbol = %self.symbol,
            dataset = %self.dataset,
            listed = self.listed,
            planned = self.planned,
            fetched = self.fetched,
            skipped = self.skipped,
            fetch_failed = self.fetch_failed,
            load_failed = self.load_failed,
            rows_inserted = self.rows_inserted,
            lines_skipped = self.lines_skipped,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "데이터셋 동기화 완료"
        );
    }
}

/// 전체 실행 통계
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub datasets: Vec<DatasetStats>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SyncSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stats: DatasetStats) {
        self.datasets.push(stats);
    }

    pub fn rows_inserted(&self) -> u64 {
        self.datasets.iter().map(|d| d.rows_inserted).sum()
    }

    pub fn failures(&self) -> usize {
        self.datasets.iter().map(DatasetStats::failures).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }

    /// 데이터셋 타입별 합계.
    pub fn by_dataset(&self) -> Vec<(DatasetKind, DatasetStats)> {
        let mut totals: Vec<(DatasetKind, DatasetStats)> = Vec::new();
        for stats in &self.datasets {
            let idx = match totals.iter().position(|(k, _)| *k == stats.dataset) {
                Some(idx) => idx,
                None => {
                    totals.push((stats.dataset, DatasetStats::new("*", stats.dataset)));
                    totals.len() - 1
                }
            };
            let total = &mut totals[idx].1;
            total.listed += stats.listed;
            total.planned += stats.planned;
            total.fetched += stats.fetched;
            total.skipped += stats.skipped;
            total.fetch_failed += stats.fetch_failed;
            total.loaded += stats.loaded;
            total.load_failed += stats.load_failed;
            total.rows_parsed += stats.rows_parsed;
            total.rows_inserted += stats.rows_inserted;
            total.lines_skipped += stats.lines_skipped;
            total.elapsed += stats.elapsed;
            if stats.error.is_some() && total.error.is_none() {
                total.error = stats.error.clone();
            }
        }
        totals
    }

    /// 통계 요약 로그 출력 (데이터셋별 + 전체)
    pub fn log_summary(&self, operation: &str) {
        for (dataset, total) in self.by_dataset() {
            tracing::info!(
                operation = operation,
                dataset = %dataset,
                fetched = total.fetched,
                skipped = total.skipped,
                failed = total.failures(),
                rows_inserted = total.rows_inserted,
                "데이터셋 합계"
            );
        }
        tracing::info!(
            operation = operation,
            datasets = self.datasets.len(),
            failures = self.failures(),
            rows_inserted = self.rows_inserted(),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "동기화 완료"
        );
    }
}

/// 뷰 재생성 통계
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewStats {
    pub created: usize,
    /// 원본 테이블이 없어 건너뛴 뷰
    pub skipped: usize,
    pub failed: usize,
}

impl ViewStats {
    pub fn log_summary(&self) {
        tracing::info!(
            created = self.created,
            skipped = self.skipped,
            failed = self.failed,
            "뷰 갱신 완료"
        );
    }
}

//! 파일 + 환경변수 기반 설정 모듈.
//!
//! 우선순위 (낮음 → 높음):
//!
//! 1. 구조체 기본값
//! 2. `config/collector.toml` (없으면 무시)
//! 3. `CTRADE__<SECTION>__<KEY>` 환경변수 (예: `CTRADE__SYNC__FETCH_CONCURRENCY=16`)
//! 4. `DATABASE_URL` (필수)
//! 5. CLI 플래그 ([`SyncOverrides`])

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ctrade_core::{BarInterval, DatasetKind, DatasetRegistry, DateRange};
use ctrade_data::{DatabaseConfig, HttpConfig};

use crate::error::CollectorError;
use crate::Result;

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/collector.toml";

/// Collector 전체 설정
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// 데이터베이스 설정 (`url`은 `DATABASE_URL`에서)
    pub database: DatabaseConfig,
    /// 원격 저장소 HTTP 설정
    #[serde(default)]
    pub http: HttpConfig,
    /// 동기화 설정
    #[serde(default)]
    pub sync: SyncConfig,
    /// 데몬 모드 설정
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// 동기화 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 대상 심볼
    pub symbols: Vec<String>,
    /// 대상 데이터셋 (비어 있으면 에러)
    pub datasets: Vec<DatasetKind>,
    /// kline 계열 봉 간격
    pub interval: BarInterval,
    /// 로컬 아티팩트 루트
    pub data_root: PathBuf,
    /// 기본 조회 기간 (개월, 30일 단위)
    pub months: u32,
    /// 시작일 (포함)
    pub start_date: Option<NaiveDate>,
    /// 종료일 (포함, 기본: 오늘 UTC)
    pub end_date: Option<NaiveDate>,
    /// 동시 다운로드 수
    pub fetch_concurrency: usize,
    /// 동시 적재 파일 수
    pub load_concurrency: usize,
    /// 적재 배치 크기 (행)
    pub batch_size: usize,
    /// 압축 정책 경과 기간
    pub compress_after: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string()],
            datasets: DatasetKind::ALL.to_vec(),
            interval: BarInterval::M1,
            data_root: PathBuf::from("data"),
            months: 6,
            start_date: None,
            end_date: None,
            fetch_concurrency: ctrade_data::provider::fetcher::DEFAULT_FETCH_CONCURRENCY,
            load_concurrency: ctrade_data::DEFAULT_LOAD_CONCURRENCY,
            batch_size: ctrade_data::DEFAULT_BATCH_SIZE,
            compress_after: ctrade_data::storage::schema::DEFAULT_COMPRESS_AFTER.to_string(),
        }
    }
}

/// 데몬 모드 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 24 * 60,
        }
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1) * 60)
    }
}

/// CLI에서 넘어온 덮어쓰기 값.
#[derive(Debug, Clone, Default)]
pub struct SyncOverrides {
    pub symbols: Vec<String>,
    pub datasets: Option<Vec<DatasetKind>>,
    pub interval: Option<BarInterval>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub fetch_concurrency: Option<usize>,
    pub load_concurrency: Option<usize>,
    pub data_root: Option<PathBuf>,
}

impl CollectorConfig {
    /// 설정 파일(선택)과 환경변수에서 설정 로드
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;

        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("CTRADE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("sync.symbols")
                    .with_list_parse_key("sync.datasets")
                    .try_parsing(true),
            )
            .set_override("database.url", database_url)?;

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// CLI 덮어쓰기를 적용합니다.
    pub fn apply_overrides(&mut self, overrides: SyncOverrides) -> Result<()> {
        let sync = &mut self.sync;
        if !overrides.symbols.is_empty() {
            sync.symbols = overrides.symbols;
        }
        if let Some(datasets) = overrides.datasets {
            sync.datasets = datasets;
        }
        if let Some(interval) = overrides.interval {
            sync.interval = interval;
        }
        if overrides.start_date.is_some() {
            sync.start_date = overrides.start_date;
        }
        if overrides.end_date.is_some() {
            sync.end_date = overrides.end_date;
        }
        if let Some(n) = overrides.fetch_concurrency {
            sync.fetch_concurrency = n;
        }
        if let Some(n) = overrides.load_concurrency {
            sync.load_concurrency = n;
        }
        if let Some(root) = overrides.data_root {
            sync.data_root = root;
        }
        self.validate()
    }

    /// I/O 이전 설정 검증.
    pub fn validate(&self) -> Result<()> {
        let sync = &self.sync;
        if sync.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(CollectorError::Config("동기화할 심볼이 없습니다".to_string()));
        }
        if sync.fetch_concurrency == 0 || sync.load_concurrency == 0 {
            return Err(CollectorError::Config(
                "동시성 값은 1 이상이어야 합니다".to_string(),
            ));
        }
        if sync.batch_size == 0 {
            return Err(CollectorError::Config("배치 크기는 1 이상이어야 합니다".to_string()));
        }
        if (self.database.max_connections as usize) < sync.load_concurrency {
            return Err(CollectorError::Config(format!(
                "database.max_connections({})가 load_concurrency({})보다 작습니다",
                self.database.max_connections, sync.load_concurrency
            )));
        }
        self.registry()?;
        if let (Some(start), Some(end)) = (sync.start_date, sync.end_date) {
            DateRange::new(start, end)?;
        }
        Ok(())
    }

    /// 선택된 데이터셋으로 구성된 레지스트리.
    pub fn registry(&self) -> Result<DatasetRegistry> {
        Ok(DatasetRegistry::usdm_futures(self.sync.interval).subset(&self.sync.datasets)?)
    }

    /// 정규화된 (대문자, 중복 제거) 심볼 목록.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::new();
        for symbol in &self.sync.symbols {
            let symbol = symbol.trim().to_uppercase();
            if !symbol.is_empty() && !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        symbols
    }

    /// 동기화 날짜 범위 (`today` 기준 기본값 적용).
    pub fn date_range(&self, today: NaiveDate) -> Result<DateRange> {
        let end = self.sync.end_date.unwrap_or(today);
        let range = match self.sync.start_date {
            Some(start) => DateRange::new(start, end)?,
            None => DateRange::trailing_months(end, self.sync.months)?,
        };
        Ok(range)
    }
}

//! Binance USD-M 선물 아카이브 → TimescaleDB 증분 동기화.
//!
//! 이 crate는 다음을 제공합니다:
//! - 원격 목록 조회 → 워터마크 기반 계획 → 병렬 다운로드 → 병렬 적재
//! - 로컬 아티팩트 재적재
//! - 하이퍼테이블/엔진 뷰 관리

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{CollectorConfig, SyncOverrides};
pub use error::{CollectorError, Result};
pub use stats::{DatasetStats, SyncSummary, ViewStats};

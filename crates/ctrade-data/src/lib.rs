//! 원격 카탈로그, 다운로드, 파싱, TimescaleDB 저장.
//!
//! 이 crate는 다음을 제공합니다:
//! - S3 호환 카탈로그 목록 조회와 병렬 아카이브 다운로드
//! - 데이터셋별 CSV 행 디코더
//! - 하이퍼테이블/엔진 뷰 관리, 워터마크 조회, 중복 제거 벌크 적재

pub mod error;
pub mod layout;
pub mod parser;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};
pub use layout::ArtifactLayout;
pub use parser::{FileRows, ParserRegistry, RowParser};
pub use provider::catalog::CatalogLister;
pub use provider::fetcher::{FetchOutcome, FetchReport, FetchStatus, ParallelFetcher};
pub use provider::HttpConfig;
pub use storage::{
    BulkLoader, CompressionStats, Database, DatabaseConfig, LoadOutcome, LoadReport,
    SchemaManager, WatermarkTracker, DEFAULT_BATCH_SIZE, DEFAULT_LOAD_CONCURRENCY,
};

//! TimescaleDB 저장소.
//!
//! - [`database`]: 연결 풀
//! - [`schema`]: 하이퍼테이블, 압축 정책, 엔진 뷰
//! - [`watermark`]: 최신 적재 날짜 조회
//! - [`loader`]: 스테이징 테이블 기반 벌크 병합

pub mod database;
pub mod loader;
pub mod schema;
pub mod watermark;

pub use database::{Database, DatabaseConfig};
pub use loader::{BulkLoader, LoadOutcome, LoadReport, DEFAULT_BATCH_SIZE, DEFAULT_LOAD_CONCURRENCY};
pub use schema::{CompressionStats, SchemaManager};
pub use watermark::WatermarkTracker;

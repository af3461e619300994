//! # ctrade Core
//!
//! 시장 데이터 동기화 파이프라인의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 공유되는 기본 타입을 제공합니다:
//! - 데이터셋 타입과 스키마 정의 (불변 레지스트리)
//! - 원격 카탈로그 객체
//! - 정규화된 행 타입
//! - 날짜 범위와 봉 간격
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;

//! 코어 도메인 에러 타입.
//!
//! 데이터셋 정의, 날짜 범위 등 I/O 이전 단계에서 발생하는 설정 오류를 정의합니다.
//! 이 에러들은 모두 네트워크/DB 작업을 시작하기 전에 즉시 실패(fail fast)합니다.

use thiserror::Error;

/// 코어 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 알 수 없는 데이터셋 타입
    #[error("알 수 없는 데이터셋: {0}")]
    UnknownDataset(String),

    /// 잘못된 날짜 또는 날짜 범위
    #[error("잘못된 날짜: {0}")]
    InvalidDate(String),
}

/// 코어 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

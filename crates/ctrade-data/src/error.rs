//! 데이터 모듈 오류 타입.

use ctrade_core::CoreError;
use thiserror::Error;

/// 데이터 관련 오류.
///
/// 각 변형은 파이프라인의 에러 분류와 1:1로 대응합니다. 파싱 스킵과 충돌 무시는
/// 에러가 아니므로 여기에 없습니다.
#[derive(Debug, Error)]
pub enum DataError {
    /// 목록 조회/다운로드 네트워크 오류 (재실행으로 복구 가능)
    #[error("Transport error: {0}")]
    Transport(String),

    /// 2xx가 아닌 HTTP 응답
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// 손상되었거나 예상과 다른 아카이브
    #[error("Archive error: {0}")]
    Archive(String),

    /// 스키마 생성 또는 벌크 병합 실패
    #[error("Storage error: {0}")]
    Storage(String),

    /// 잘못된 설정 (I/O 이전에 실패)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 로컬 파일 시스템 오류
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 진단용 조회 실패 (제어 흐름에 영향 없음)
    #[error("Diagnostic query failed: {0}")]
    Diagnostic(String),

    /// blocking 작업 실패 (panic/취소)
    #[error("Task error: {0}")]
    Task(String),
}

impl DataError {
    /// 재실행으로 복구 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Transport(_) => true,
            DataError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// 설정 에러인지 확인합니다.
    pub fn is_config(&self) -> bool {
        matches!(self, DataError::Config(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DataError::Storage("Connection pool exhausted".to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                DataError::Storage(format!("[{}] {}", code, db_err.message()))
            }
            _ => DataError::Storage(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return DataError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        DataError::Transport(err.to_string())
    }
}

impl From<zip::result::ZipError> for DataError {
    fn from(err: zip::result::ZipError) -> Self {
        DataError::Archive(err.to_string())
    }
}

impl From<quick_xml::DeError> for DataError {
    fn from(err: quick_xml::DeError) -> Self {
        DataError::Transport(format!("Malformed listing response: {}", err))
    }
}

impl From<tokio::task::JoinError> for DataError {
    fn from(err: tokio::task::JoinError) -> Self {
        DataError::Task(err.to_string())
    }
}

impl From<CoreError> for DataError {
    fn from(err: CoreError) -> Self {
        DataError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

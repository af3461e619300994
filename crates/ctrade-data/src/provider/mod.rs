//! 원격 데이터 제공자.
//!
//! - [`catalog`]: 페이지네이션 목록 조회 (S3 ListObjects 호환)
//! - [`fetcher`]: 병렬 다운로드 및 압축 해제

pub mod catalog;
pub mod fetcher;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::error::{DataError, Result};

/// 원격 저장소 기본 URL.
pub const DEFAULT_BASE_URL: &str = "https://s3-ap-northeast-1.amazonaws.com/data.binance.vision";

/// HTTP 클라이언트 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// 저장소 기본 URL (목록/객체 공통)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 연결 타임아웃 (초)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 다운로드 중 청크 수신 대기 한도 (초)
    #[serde(default = "default_read_stall_timeout")]
    pub read_stall_timeout_secs: u64,
    /// 목록 조회 요청 전체 타임아웃 (초)
    #[serde(default = "default_listing_timeout")]
    pub listing_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_read_stall_timeout() -> u64 {
    300
}
fn default_listing_timeout() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            read_stall_timeout_secs: default_read_stall_timeout(),
            listing_timeout_secs: default_listing_timeout(),
        }
    }
}

impl HttpConfig {
    /// 지정한 기본 URL로 설정 생성 (나머지는 기본값).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_stall_timeout(&self) -> Duration {
        Duration::from_secs(self.read_stall_timeout_secs)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    /// 끝의 `/`를 제거한 기본 URL.
    pub fn trimmed_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// 공유 HTTP 클라이언트 생성.
    ///
    /// 연결 타임아웃만 클라이언트에 걸고, 읽기 정체는 다운로드 루프에서 청크 단위로 감시합니다.
    pub fn build_client(&self) -> Result<Client> {
        Client::builder()
            .connect_timeout(self.connect_timeout())
            .user_agent(concat!("ctrade/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))
    }
}

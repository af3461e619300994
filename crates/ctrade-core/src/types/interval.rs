//! 캔들 데이터셋의 봉 간격 정의.
//!
//! 원격 저장소는 kline 계열 데이터셋을 `<symbol>/<interval>/` 디렉토리 아래에
//! 간격별로 게시합니다. 일별(daily) 아카이브에 존재하는 간격만 허용합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 봉 간격.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarInterval {
    /// 1분봉
    #[serde(rename = "1m")]
    M1,
    /// 3분봉
    #[serde(rename = "3m")]
    M3,
    /// 5분봉
    #[serde(rename = "5m")]
    M5,
    /// 15분봉
    #[serde(rename = "15m")]
    M15,
    /// 30분봉
    #[serde(rename = "30m")]
    M30,
    /// 1시간봉
    #[serde(rename = "1h")]
    H1,
    /// 2시간봉
    #[serde(rename = "2h")]
    H2,
    /// 4시간봉
    #[serde(rename = "4h")]
    H4,
    /// 6시간봉
    #[serde(rename = "6h")]
    H6,
    /// 8시간봉
    #[serde(rename = "8h")]
    H8,
    /// 12시간봉
    #[serde(rename = "12h")]
    H12,
    /// 일봉
    #[serde(rename = "1d")]
    D1,
}

impl BarInterval {
    /// 지원하는 모든 간격.
    pub const ALL: [BarInterval; 12] = [
        BarInterval::M1,
        BarInterval::M3,
        BarInterval::M5,
        BarInterval::M15,
        BarInterval::M30,
        BarInterval::H1,
        BarInterval::H2,
        BarInterval::H4,
        BarInterval::H6,
        BarInterval::H8,
        BarInterval::H12,
        BarInterval::D1,
    ];

    /// 원격 경로/파일명에 쓰이는 간격 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            BarInterval::M1 => "1m",
            BarInterval::M3 => "3m",
            BarInterval::M5 => "5m",
            BarInterval::M15 => "15m",
            BarInterval::M30 => "30m",
            BarInterval::H1 => "1h",
            BarInterval::H2 => "2h",
            BarInterval::H4 => "4h",
            BarInterval::H6 => "6h",
            BarInterval::H8 => "8h",
            BarInterval::H12 => "12h",
            BarInterval::D1 => "1d",
        }
    }
}

impl Default for BarInterval {
    fn default() -> Self {
        Self::M1
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarInterval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|iv| iv.as_str() == s)
            .ok_or_else(|| CoreError::Config(format!("지원하지 않는 봉 간격: {}", s)))
    }
}

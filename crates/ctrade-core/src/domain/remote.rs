//! 원격 카탈로그 객체.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dataset::DatasetKind;

/// 원격 아카이브 확장자.
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// 목록 조회로 발견된 원격 객체.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RemoteObject {
    pub kind: DatasetKind,
    pub symbol: String,
    pub date: NaiveDate,
    /// 저장소 객체 키 (`data/futures/um/daily/.../<stem>.zip`)
    pub key: String,
}

impl RemoteObject {
    /// 객체 키를 정규화합니다.
    ///
    /// `.zip`으로 끝나지 않거나 파일명 끝에 `YYYY-MM-DD` 날짜가 없는 키는
    /// 데이터 객체가 아니므로 `None`을 반환합니다.
    pub fn from_key(kind: DatasetKind, symbol: &str, key: &str) -> Option<Self> {
        let date = date_from_name(key, ARCHIVE_SUFFIX)?;
        Some(Self {
            kind,
            symbol: symbol.to_string(),
            date,
            key: key.to_string(),
        })
    }

    /// 키의 마지막 경로 조각에서 확장자를 뺀 이름.
    pub fn file_stem(&self) -> &str {
        let name = self.key.rsplit('/').next().unwrap_or(&self.key);
        name.strip_suffix(ARCHIVE_SUFFIX).unwrap_or(name)
    }
}

/// `...-YYYY-MM-DD<suffix>` 형태의 이름에서 날짜를 추출합니다.
pub fn date_from_name(name: &str, suffix: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(suffix)?;
    if stem.len() < 10 || !stem.is_char_boundary(stem.len() - 10) {
        return None;
    }
    let tail = &stem[stem.len() - 10..];
    NaiveDate::parse_from_str(tail, "%Y-%m-%d").ok()
}

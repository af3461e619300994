//! 동기화 계획 수립.
//!
//! 목록에서 `start ≤ date ≤ end`이고 워터마크 이후(`date ≥ watermark`)인 항목만
//! 날짜 오름차순으로 고릅니다. 워터마크 당일도 다시 포함됩니다.

use chrono::NaiveDate;
use std::path::PathBuf;

use ctrade_core::{CoreResult, DateRange, RemoteObject};

/// 날짜가 있는 계획 대상.
pub trait Dated: Ord + Clone {
    fn date(&self) -> NaiveDate;
}

impl Dated for RemoteObject {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// 이미 다운로드된 로컬 아티팩트.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LocalArtifact {
    pub date: NaiveDate,
    pub path: PathBuf,
}

impl Dated for LocalArtifact {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// 계획 포함 여부.
pub fn is_planned(date: NaiveDate, watermark: Option<NaiveDate>, range: &DateRange) -> bool {
    range.contains(date) && watermark.map_or(true, |w| date >= w)
}

/// 날짜 범위를 검증한 뒤 계획을 세웁니다.
///
/// `start > end`이면 설정 에러이며 계획은 만들어지지 않습니다.
pub fn plan<T: Dated>(
    listing: &[T],
    watermark: Option<NaiveDate>,
    start: NaiveDate,
    end: NaiveDate,
) -> CoreResult<Vec<T>> {
    let range = DateRange::new(start, end)?;
    Ok(plan_range(listing, watermark, &range))
}

/// 검증된 범위로 계획을 세웁니다 (날짜순, 중복 제거).
pub fn plan_range<T: Dated>(listing: &[T], watermark: Option<NaiveDate>, range: &DateRange) -> Vec<T> {
    let mut planned: Vec<T> = listing
        .iter()
        .filter(|item| is_planned(item.date(), watermark, range))
        .cloned()
        .collect();
    planned.sort_by(|a, b| a.date().cmp(&b.date()).then_with(|| a.cmp(b)));
    planned.dedup();
    planned
}

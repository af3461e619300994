//! 동기화 날짜 범위.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// 날짜 문자열 형식 (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 양 끝을 포함하는 날짜 범위 `[start, end]`.
///
/// `start > end`인 범위는 생성할 수 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// 검증된 날짜 범위를 생성합니다.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if start > end {
            return Err(CoreError::InvalidDate(format!(
                "시작일({})이 종료일({})보다 늦습니다",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// 종료일로부터 `months`×30일 이전까지의 범위.
    ///
    /// 시작일이 표현 가능한 날짜 범위를 벗어나면 에러입니다.
    pub fn trailing_months(end: NaiveDate, months: u32) -> CoreResult<Self> {
        let start = Duration::try_days(i64::from(months) * 30)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(|| {
                CoreError::InvalidDate(format!("{}에서 {}개월 이전 날짜를 계산할 수 없습니다", end, months))
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// 날짜가 범위 안에 있는지 확인합니다 (양 끝 포함).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 범위에 포함된 일 수.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// `YYYY-MM-DD` 문자열을 날짜로 파싱합니다.
pub fn parse_date(s: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| CoreError::InvalidDate(format!("{} ({})", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_range_inclusive() {
        let range = DateRange::new(d("2024-03-01"), d("2024-03-15")).unwrap();
        assert!(range.contains(d("2024-03-01")));
        assert!(range.contains(d("2024-03-15")));
        assert!(!range.contains(d("2024-02-29")));
        assert!(!range.contains(d("2024-03-16")));
        assert_eq!(range.days(), 15);
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::new(d("2024-03-01"), d("2024-03-01")).unwrap();
        assert_eq!(range.days(), 1);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = DateRange::new(d("2024-03-15"), d("2024-03-01")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDate(_)));
    }

    #[test]
    fn test_trailing_months() {
        let range = DateRange::trailing_months(d("2024-07-01"), 6).unwrap();
        assert_eq!(range.start(), d("2024-01-03"));
        assert_eq!(range.end(), d("2024-07-01"));
    }

    #[test]
    fn test_trailing_months_overflow_is_error() {
        let err = DateRange::trailing_months(d("2024-07-01"), u32::MAX).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDate(_)));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(d(" 2024-01-31 "), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert!(parse_date("20240131").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }
}

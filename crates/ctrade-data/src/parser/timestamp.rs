//! 제공자 타임스탬프 변환.

use chrono::{DateTime, NaiveDateTime, Utc};

/// 이 값보다 큰 epoch 정수는 마이크로초입니다.
pub const MICROS_THRESHOLD: i64 = 9_999_999_999_999;

/// 스냅샷 데이터셋의 텍스트 시각 형식 (UTC).
pub const TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// ASCII 숫자로만 이루어진 비어있지 않은 문자열인지 확인합니다.
pub fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// epoch 정수(ms 또는 µs)를 UTC 시각으로 변환합니다.
pub fn from_epoch(raw: &str) -> Option<DateTime<Utc>> {
    if !is_digits(raw) {
        return None;
    }
    let value: i64 = raw.parse().ok()?;
    if value > MICROS_THRESHOLD {
        DateTime::from_timestamp_micros(value)
    } else {
        DateTime::from_timestamp_millis(value)
    }
}

/// `YYYY-MM-DD HH:MM:SS` 텍스트를 UTC 시각으로 변환합니다.
pub fn from_text(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TEXT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

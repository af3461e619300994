//! 데이터셋 타입과 스키마 정의.
//!
//! 각 데이터셋은 원격 저장소의 경로 규칙, 행 스키마, 고유 키, 파티션 폭을
//! 하나의 불변 [`DatasetSpec`]으로 소유합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 데이터셋 타입.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DatasetKind {
    /// 캔들 (OHLCV + 체결 통계)
    #[serde(rename = "klines")]
    Klines,
    /// 집계 체결
    #[serde(rename = "aggTrades")]
    AggTrades,
    /// 호가 깊이 스냅샷
    #[serde(rename = "bookDepth")]
    BookDepth,
    /// 마크 가격 캔들
    #[serde(rename = "markPriceKlines")]
    MarkPriceKlines,
}

impl DatasetKind {
    /// 모든 데이터셋 타입 (처리 순서).
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Klines,
        DatasetKind::AggTrades,
        DatasetKind::BookDepth,
        DatasetKind::MarkPriceKlines,
    ];

    /// 원격 저장소/로컬 디렉토리에서 사용하는 이름.
    pub fn remote_name(&self) -> &'static str {
        match self {
            DatasetKind::Klines => "klines",
            DatasetKind::AggTrades => "aggTrades",
            DatasetKind::BookDepth => "bookDepth",
            DatasetKind::MarkPriceKlines => "markPriceKlines",
        }
    }

    /// 원격 경로에 봉 간격 디렉토리가 있는지 여부.
    pub fn has_interval(&self) -> bool {
        matches!(self, DatasetKind::Klines | DatasetKind::MarkPriceKlines)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.remote_name())
    }
}

impl FromStr for DatasetKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.remote_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownDataset(s.to_string()))
    }
}

/// 컬럼의 의미 타입.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 절대 시각 (UTC)
    Timestamp,
    Text,
    Float64,
    Int64,
    Int32,
    Int16,
    Bool,
}

impl FieldType {
    /// PostgreSQL 컬럼 타입.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Timestamp => "TIMESTAMPTZ",
            FieldType::Text => "TEXT",
            FieldType::Float64 => "DOUBLE PRECISION",
            FieldType::Int64 => "BIGINT",
            FieldType::Int32 => "INTEGER",
            FieldType::Int16 => "SMALLINT",
            FieldType::Bool => "BOOLEAN",
        }
    }

    /// `UNNEST` 바인딩에 쓰이는 배열 타입 캐스트.
    pub fn sql_array_type(&self) -> &'static str {
        match self {
            FieldType::Timestamp => "timestamptz[]",
            FieldType::Text => "text[]",
            FieldType::Float64 => "float8[]",
            FieldType::Int64 => "int8[]",
            FieldType::Int32 => "int4[]",
            FieldType::Int16 => "int2[]",
            FieldType::Bool => "bool[]",
        }
    }
}

/// 스키마의 단일 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub column: &'static str,
    pub field_type: FieldType,
}

impl Field {
    pub const fn new(column: &'static str, field_type: FieldType) -> Self {
        Self { column, field_type }
    }
}

/// 시간축 파티션(청크) 폭.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionWidth {
    /// 1일 (행 밀도가 높은 데이터셋)
    Day,
    /// 1주
    Week,
}

impl PartitionWidth {
    /// `INTERVAL` 리터럴.
    pub fn as_interval(&self) -> &'static str {
        match self {
            PartitionWidth::Day => "1 day",
            PartitionWidth::Week => "1 week",
        }
    }
}

/// 데이터셋 정의.
///
/// 프로세스 시작 시 한 번 생성되며 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSpec {
    pub kind: DatasetKind,
    /// 물리 테이블 이름
    pub table: String,
    /// 외부 엔진이 읽는 뷰 이름
    pub view: String,
    /// 컬럼 순서대로의 필드 목록
    pub fields: Vec<Field>,
    /// 행 고유 키 (`ts`, `symbol`, [판별자])
    pub unique_key: Vec<&'static str>,
    pub partition: PartitionWidth,
    /// 봉 간격 (kline 계열만)
    pub interval: Option<String>,
}

impl DatasetSpec {
    /// 파일명 변형자 (`<symbol>-<variant>-<date>`).
    ///
    /// kline 계열은 봉 간격, 그 외는 원격 데이터셋 이름입니다.
    pub fn variant(&self) -> &str {
        self.interval
            .as_deref()
            .unwrap_or_else(|| self.kind.remote_name())
    }

    /// 원격 목록 조회 prefix.
    ///
    /// `data/futures/um/daily/<dataset>/<symbol>/[<interval>/]`
    pub fn remote_prefix(&self, symbol: &str) -> String {
        match &self.interval {
            Some(iv) => format!(
                "data/futures/um/daily/{}/{}/{}/",
                self.kind.remote_name(),
                symbol,
                iv
            ),
            None => format!("data/futures/um/daily/{}/{}/", self.kind.remote_name(), symbol),
        }
    }

    /// 해당 날짜의 원격 객체 파일명 (확장자 제외).
    pub fn file_stem(&self, symbol: &str, date: chrono::NaiveDate) -> String {
        format!("{}-{}-{}", symbol, self.variant(), date.format("%Y-%m-%d"))
    }

    /// 컬럼 이름 목록.
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_kind_parse() {
        assert_eq!("klines".parse::<DatasetKind>().unwrap(), DatasetKind::Klines);
        assert_eq!("aggTrades".parse::<DatasetKind>().unwrap(), DatasetKind::AggTrades);
        assert_eq!("aggtrades".parse::<DatasetKind>().unwrap(), DatasetKind::AggTrades);
        assert_eq!(
            "markPriceKlines".parse::<DatasetKind>().unwrap(),
            DatasetKind::MarkPriceKlines
        );
        assert_eq!(
            "trades".parse::<DatasetKind>().unwrap_err(),
            CoreError::UnknownDataset("trades".to_string())
        );
    }

    #[test]
    fn test_dataset_kind_display() {
        assert_eq!(DatasetKind::BookDepth.to_string(), "bookDepth");
        assert!(DatasetKind::Klines.has_interval());
        assert!(!DatasetKind::AggTrades.has_interval());
    }
}

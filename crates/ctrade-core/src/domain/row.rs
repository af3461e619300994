//! 정규화된(canonical) 행 타입.
//!
//! 파서가 생성하고 벌크 로더가 소비하는 단위입니다. 원본 파일 형식과 무관하게
//! 항상 심볼이 포함되며 시각은 UTC 절대 시각입니다.

use chrono::{DateTime, Utc};

use super::dataset::DatasetKind;

/// 캔들 행.
#[derive(Debug, Clone, PartialEq)]
pub struct KlineRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub trades: i32,
    pub taker_buy_volume: f64,
    pub taker_buy_quote_volume: f64,
}

/// 집계 체결 행.
#[derive(Debug, Clone, PartialEq)]
pub struct AggTradeRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub agg_trade_id: i64,
    pub price: f64,
    pub qty: f64,
    pub first_trade_id: i64,
    pub last_trade_id: i64,
    pub is_buyer_maker: bool,
}

/// 호가 깊이 스냅샷 행.
#[derive(Debug, Clone, PartialEq)]
pub struct BookDepthRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    /// 중간가 대비 퍼센트 구간 (음수: 매수 측)
    pub percentage: i16,
    pub depth: f64,
    pub notional: f64,
}

/// 마크 가격 캔들 행.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkPriceRow {
    pub ts: DateTime<Utc>,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// 데이터셋별 정규화 행.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalRow {
    Kline(KlineRow),
    AggTrade(AggTradeRow),
    BookDepth(BookDepthRow),
    MarkPrice(MarkPriceRow),
}

impl CanonicalRow {
    pub fn kind(&self) -> DatasetKind {
        match self {
            CanonicalRow::Kline(_) => DatasetKind::Klines,
            CanonicalRow::AggTrade(_) => DatasetKind::AggTrades,
            CanonicalRow::BookDepth(_) => DatasetKind::BookDepth,
            CanonicalRow::MarkPrice(_) => DatasetKind::MarkPriceKlines,
        }
    }

    pub fn ts(&self) -> DateTime<Utc> {
        match self {
            CanonicalRow::Kline(r) => r.ts,
            CanonicalRow::AggTrade(r) => r.ts,
            CanonicalRow::BookDepth(r) => r.ts,
            CanonicalRow::MarkPrice(r) => r.ts,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            CanonicalRow::Kline(r) => &r.symbol,
            CanonicalRow::AggTrade(r) => &r.symbol,
            CanonicalRow::BookDepth(r) => &r.symbol,
            CanonicalRow::MarkPrice(r) => &r.symbol,
        }
    }
}

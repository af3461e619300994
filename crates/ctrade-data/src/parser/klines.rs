//! 캔들 CSV 디코더.
//!
//! `open_time,open,high,low,close,volume,close_time,quote_volume,count,
//! taker_buy_volume,taker_buy_quote_volume,ignore`

use ctrade_core::{CanonicalRow, DatasetKind, KlineRow};

use super::timestamp::{from_epoch, is_digits};
use super::RowParser;

const MIN_FIELDS: usize = 11;

#[derive(Debug, Default, Clone, Copy)]
pub struct KlineParser;

impl RowParser for KlineParser {
    fn kind(&self) -> DatasetKind {
        DatasetKind::Klines
    }

    fn parse_fields(&self, symbol: &str, fields: &[&str]) -> Option<CanonicalRow> {
        if fields.len() < MIN_FIELDS || !is_digits(fields[0]) {
            return None;
        }

        Some(CanonicalRow::Kline(KlineRow {
            ts: from_epoch(fields[0])?,
            symbol: symbol.to_string(),
            open: fields[1].parse().ok()?,
            high: fields[2].parse().ok()?,
            low: fields[3].parse().ok()?,
            close: fields[4].parse().ok()?,
            volume: fields[5].parse().ok()?,
            quote_volume: fields[7].parse().ok()?,
            trades: fields[8].parse().ok()?,
            taker_buy_volume: fields[9].parse().ok()?,
            taker_buy_quote_volume: fields[10].parse().ok()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_header_discarded() {
        let line = "open_time,open,high,low,close,volume,close_time,quote_volume,count,taker_buy_volume,taker_buy_quote_volume,ignore";
        assert_eq!(KlineParser.parse_line("BTCUSDT", line), None);
    }

    #[test]
    fn test_well_formed_row() {
        let line = "1700000000000,50000.0,50100.0,49950.0,50050.0,12.5,1700000059999,625000.0,1000,6.0,300000.0,0";
        let Some(CanonicalRow::Kline(row)) = KlineParser.parse_line("BTCUSDT", line) else {
            panic!("expected kline row");
        };
        assert_eq!(row.ts, Utc.timestamp_millis_opt(1_700_000_000_000).unwrap());
        assert_eq!(row.symbol, "BTCUSDT");
        assert_eq!(row.open, 50000.0);
        assert_eq!(row.close, 50050.0);
        assert_eq!(row.quote_volume, 625000.0);
        assert_eq!(row.trades, 1000);
        assert_eq!(row.taker_buy_quote_volume, 300000.0);
    }

    #[test]
    fn test_short_or_bad_rows_discarded() {
        assert_eq!(KlineParser.parse_line("BTCUSDT", "1700000000000,1,2,3"), None);
        let bad_number = "1700000000000,abc,50100.0,49950.0,50050.0,12.5,1700000059999,625000.0,1000,6.0,300000.0,0";
        assert_eq!(KlineParser.parse_line("BTCUSDT", bad_number), None);
        assert_eq!(KlineParser.parse_line("BTCUSDT", ""), None);
    }

    #[test]
    fn test_crlf_tolerated() {
        let line = "1700000000000,1,2,0.5,1.5,10,1700000059999,15,3,5,7,0\r";
        assert!(KlineParser.parse_line("BTCUSDT", line).is_some());
    }
}

//! 집계 체결 CSV 디코더.
//!
//! `agg_trade_id,price,quantity,first_trade_id,last_trade_id,transact_time,is_buyer_maker`

use ctrade_core::{AggTradeRow, CanonicalRow, DatasetKind};

use super::timestamp::{from_epoch, is_digits};
use super::RowParser;

const FIELDS: usize = 7;

#[derive(Debug, Default, Clone, Copy)]
pub struct AggTradeParser;

impl RowParser for AggTradeParser {
    fn kind(&self) -> DatasetKind {
        DatasetKind::AggTrades
    }

    fn parse_fields(&self, symbol: &str, fields: &[&str]) -> Option<CanonicalRow> {
        if fields.len() != FIELDS || !is_digits(fields[0]) {
            return None;
        }

        Some(CanonicalRow::AggTrade(AggTradeRow {
            ts: from_epoch(fields[5])?,
            symbol: symbol.to_string(),
            agg_trade_id: fields[0].parse().ok()?,
            price: fields[1].parse().ok()?,
            qty: fields[2].parse().ok()?,
            first_trade_id: fields[3].parse().ok()?,
            last_trade_id: fields[4].parse().ok()?,
            is_buyer_maker: fields[6].eq_ignore_ascii_case("true"),
        }))
    }
}

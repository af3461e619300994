//! 마크 가격 캔들 CSV 디코더.

use ctrade_core::{CanonicalRow, DatasetKind, MarkPriceRow};

use super::timestamp::{from_epoch, is_digits};
use super::RowParser;

const MIN_FIELDS: usize = 5;

#[derive(Debug, Default, Clone, Copy)]
pub struct MarkPriceParser;

impl RowParser for MarkPriceParser {
    fn kind(&self) -> DatasetKind {
        DatasetKind::MarkPriceKlines
    }

    fn parse_fields(&self, symbol: &str, fields: &[&str]) -> Option<CanonicalRow> {
        if fields.len() < MIN_FIELDS || !is_digits(fields[0]) {
            return None;
        }

        Some(CanonicalRow::MarkPrice(MarkPriceRow {
            ts: from_epoch(fields[0])?,
            symbol: symbol.to_string(),
            open: fields[1].parse().ok()?,
            high: fields[2].parse().ok()?,
            low: fields[3].parse().ok()?,
            close: fields[4].parse().ok()?,
        }))
    }
}

//! 호가 깊이 CSV 디코더.
//!
//! `timestamp,percentage,depth,notional` (시각은 `YYYY-MM-DD HH:MM:SS`, UTC)

use ctrade_core::{BookDepthRow, CanonicalRow, DatasetKind};

use super::timestamp::from_text;
use super::RowParser;

const FIELDS: usize = 4;
const HEADER: &str = "timestamp";

#[derive(Debug, Default, Clone, Copy)]
pub struct BookDepthParser;

impl RowParser for BookDepthParser {
    fn kind(&self) -> DatasetKind {
        DatasetKind::BookDepth
    }

    fn parse_fields(&self, symbol: &str, fields: &[&str]) -> Option<CanonicalRow> {
        if fields.len() != FIELDS || fields[0] == HEADER {
            return None;
        }

        Some(CanonicalRow::BookDepth(BookDepthRow {
            ts: from_text(fields[0])?,
            symbol: symbol.to_string(),
            percentage: fields[1].parse().ok()?,
            depth: fields[2].parse().ok()?,
            notional: fields[3].parse().ok()?,
        }))
    }
}

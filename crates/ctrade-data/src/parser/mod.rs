//! 데이터셋별 행 디코더.
//!
//! 각 디코더는 한 줄을 독립적으로 해석하며 줄 사이의 상태를 갖지 않습니다.
//! 헤더나 구조가 맞지 않는 줄은 에러가 아니라 `None`으로 버려집니다.
//!
//! ```rust,ignore
//! let parsers = ParserRegistry::usdm_futures();
//! let mut rows = parsers.open_file(DatasetKind::Klines, "BTCUSDT", &path)?;
//! for row in rows.by_ref() {
//!     let row = row?;
//! }
//! println!("skipped {}", rows.skipped());
//! ```

mod agg_trades;
mod book_depth;
mod klines;
mod mark_price;
pub mod timestamp;

pub use agg_trades::AggTradeParser;
pub use book_depth::BookDepthParser;
pub use klines::KlineParser;
pub use mark_price::MarkPriceParser;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use ctrade_core::{CanonicalRow, DatasetKind};

use crate::error::{DataError, Result};

/// 단일 데이터셋 디코더.
pub trait RowParser: Send + Sync {
    /// 담당 데이터셋 타입.
    fn kind(&self) -> DatasetKind;

    /// 구분자로 나뉜(공백 제거된) 필드를 정규화 행으로 변환합니다.
    fn parse_fields(&self, symbol: &str, fields: &[&str]) -> Option<CanonicalRow>;

    /// 원본 한 줄을 해석합니다. 끝의 `\r`과 필드 주변 공백은 무시됩니다.
    fn parse_line(&self, symbol: &str, line: &str) -> Option<CanonicalRow> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        self.parse_fields(symbol, &fields)
    }
}

impl std::fmt::Debug for dyn RowParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowParser").field("kind", &self.kind()).finish()
    }
}

/// 데이터셋 타입 → 디코더 매핑.
#[derive(Clone)]
pub struct ParserRegistry {
    parsers: BTreeMap<DatasetKind, Arc<dyn RowParser>>,
}

impl ParserRegistry {
    /// 빈 레지스트리.
    pub fn empty() -> Self {
        Self {
            parsers: BTreeMap::new(),
        }
    }

    /// USD-M 선물 데이터셋 디코더가 모두 등록된 레지스트리.
    pub fn usdm_futures() -> Self {
        Self::empty()
            .with(KlineParser)
            .with(AggTradeParser)
            .with(BookDepthParser)
            .with(MarkPriceParser)
    }

    /// 디코더 등록 (같은 타입은 교체).
    pub fn with(mut self, parser: impl RowParser + 'static) -> Self {
        self.parsers.insert(parser.kind(), Arc::new(parser));
        self
    }

    /// 디코더 조회.
    pub fn get(&self, kind: DatasetKind) -> Result<Arc<dyn RowParser>> {
        self.parsers
            .get(&kind)
            .cloned()
            .ok_or_else(|| DataError::Config(format!("등록되지 않은 파서: {}", kind)))
    }

    /// 한 줄 해석 (미등록 타입은 `None`).
    pub fn parse(&self, kind: DatasetKind, symbol: &str, line: &str) -> Option<CanonicalRow> {
        self.parsers.get(&kind)?.parse_line(symbol, line)
    }

    /// 파일을 열어 지연 행 시퀀스를 반환합니다.
    pub fn open_file(&self, kind: DatasetKind, symbol: &str, path: &Path) -> Result<FileRows> {
        let parser = self.get(kind)?;
        let file = File::open(path)?;
        Ok(FileRows::new(parser, symbol, BufReader::new(file)))
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::usdm_futures()
    }
}

/// 파일 한 개의 정규화 행 시퀀스 (한 번만 순회 가능).
///
/// I/O 에러는 `Err` 항목으로 전달되며, 해석되지 않는 줄은 건너뛰고 [`skipped`](Self::skipped)에 집계됩니다.
pub struct FileRows {
    parser: Arc<dyn RowParser>,
    symbol: String,
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
    skipped: usize,
}

impl FileRows {
    pub fn new(parser: Arc<dyn RowParser>, symbol: &str, reader: impl BufRead + Send + 'static) -> Self {
        Self {
            parser,
            symbol: symbol.to_string(),
            reader: Box::new(reader),
            buf: Vec::with_capacity(256),
            skipped: 0,
        }
    }

    /// 지금까지 버려진 줄 수 (헤더 포함).
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for FileRows {
    type Item = Result<CanonicalRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }

            let row = std::str::from_utf8(&self.buf)
                .ok()
                .and_then(|line| self.parser.parse_line(&self.symbol, line));

            match row {
                Some(row) => return Some(Ok(row)),
                None => {
                    // 빈 마지막 줄은 집계하지 않음
                    if !self.buf.iter().all(u8::is_ascii_whitespace) {
                        self.skipped += 1;
                    }
                }
            }
        }
    }
}

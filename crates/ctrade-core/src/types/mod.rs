//! 데이터셋 전반에서 사용되는 공통 타입.

mod date_range;
mod interval;

pub use date_range::*;
pub use interval::*;

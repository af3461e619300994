//! 데이터셋 동기화를 위한 도메인 모델.

mod dataset;
mod registry;
mod remote;
mod row;

pub use dataset::*;
pub use registry::*;
pub use remote::*;
pub use row::*;

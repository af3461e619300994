//! 불변 데이터셋 레지스트리.
//!
//! 모든 컴포넌트는 시작 시 만들어진 레지스트리를 참조로 공유하며,
//! 어떤 컴포넌트도 레지스트리를 수정하지 않습니다.
//!
//! # 사용 예
//!
//! ```rust
//! use ctrade_core::{BarInterval, DatasetKind, DatasetRegistry};
//!
//! let registry = DatasetRegistry::usdm_futures(BarInterval::M1);
//! let spec = registry.get(DatasetKind::Klines).unwrap();
//! assert_eq!(spec.table, "klines_1m");
//! ```

use std::collections::BTreeMap;

use super::dataset::{DatasetKind, DatasetSpec, Field, FieldType, PartitionWidth};
use crate::error::{CoreError, CoreResult};
use crate::types::BarInterval;

/// 데이터셋 타입 → 정의 매핑.
#[derive(Debug, Clone)]
pub struct DatasetRegistry {
    specs: BTreeMap<DatasetKind, DatasetSpec>,
}

impl DatasetRegistry {
    /// USD-M 선물 일별 아카이브 데이터셋 정의.
    pub fn usdm_futures(interval: BarInterval) -> Self {
        let specs = DatasetKind::ALL
            .iter()
            .map(|kind| (*kind, build_spec(*kind, interval)))
            .collect();
        Self { specs }
    }

    /// 선택된 데이터셋 타입만 포함하는 레지스트리.
    ///
    /// 빈 목록은 설정 에러입니다.
    pub fn subset(&self, kinds: &[DatasetKind]) -> CoreResult<Self> {
        if kinds.is_empty() {
            return Err(CoreError::Config("처리할 데이터셋이 없습니다".to_string()));
        }
        let specs = kinds
            .iter()
            .map(|k| {
                self.specs
                    .get(k)
                    .cloned()
                    .map(|s| (*k, s))
                    .ok_or_else(|| CoreError::UnknownDataset(k.to_string()))
            })
            .collect::<CoreResult<BTreeMap<_, _>>>()?;
        Ok(Self { specs })
    }

    pub fn get(&self, kind: DatasetKind) -> Option<&DatasetSpec> {
        self.specs.get(&kind)
    }

    /// 데이터셋 정의 조회 (없으면 에러).
    pub fn require(&self, kind: DatasetKind) -> CoreResult<&DatasetSpec> {
        self.get(kind)
            .ok_or_else(|| CoreError::UnknownDataset(kind.to_string()))
    }

    /// 처리 순서대로 정의 순회.
    pub fn iter(&self) -> impl Iterator<Item = &DatasetSpec> {
        self.specs.values()
    }

    pub fn kinds(&self) -> Vec<DatasetKind> {
        self.specs.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn build_spec(kind: DatasetKind, interval: BarInterval) -> DatasetSpec {
    use FieldType::*;

    let iv = interval.as_str();
    match kind {
        DatasetKind::Klines => DatasetSpec {
            kind,
            table: format!("klines_{}", iv),
            view: format!("engine_klines_{}", iv),
            fields: vec![
                Field::new("ts", Timestamp),
                Field::new("symbol", Text),
                Field::new("open", Float64),
                Field::new("high", Float64),
                Field::new("low", Float64),
                Field::new("close", Float64),
                Field::new("volume", Float64),
                Field::new("quote_volume", Float64),
                Field::new("trades", Int32),
                Field::new("taker_buy_volume", Float64),
                Field::new("taker_buy_quote_volume", Float64),
            ],
            unique_key: vec!["ts", "symbol"],
            partition: PartitionWidth::Week,
            interval: Some(iv.to_string()),
        },
        DatasetKind::AggTrades => DatasetSpec {
            kind,
            table: "agg_trades".to_string(),
            view: "engine_agg_trades".to_string(),
            fields: vec![
                Field::new("ts", Timestamp),
                Field::new("symbol", Text),
                Field::new("agg_trade_id", Int64),
                Field::new("price", Float64),
                Field::new("qty", Float64),
                Field::new("first_trade_id", Int64),
                Field::new("last_trade_id", Int64),
                Field::new("is_buyer_maker", Bool),
            ],
            unique_key: vec!["ts", "symbol", "agg_trade_id"],
            partition: PartitionWidth::Day,
            interval: None,
        },
        DatasetKind::BookDepth => DatasetSpec {
            kind,
            table: "book_depth".to_string(),
            view: "engine_book_depth".to_string(),
            fields: vec![
                Field::new("ts", Timestamp),
                Field::new("symbol", Text),
                Field::new("percentage", Int16),
                Field::new("depth", Float64),
                Field::new("notional", Float64),
            ],
            unique_key: vec!["ts", "symbol", "percentage"],
            partition: PartitionWidth::Day,
            interval: None,
        },
        DatasetKind::MarkPriceKlines => DatasetSpec {
            kind,
            table: format!("mark_price_klines_{}", iv),
            view: format!("engine_mark_price_klines_{}", iv),
            fields: vec![
                Field::new("ts", Timestamp),
                Field::new("symbol", Text),
                Field::new("open", Float64),
                Field::new("high", Float64),
                Field::new("low", Float64),
                Field::new("close", Float64),
            ],
            unique_key: vec!["ts", "symbol"],
            partition: PartitionWidth::Week,
            interval: Some(iv.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_registry_contains_all_kinds() {
        let registry = DatasetRegistry::usdm_futures(BarInterval::M1);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.kinds(), DatasetKind::ALL.to_vec());
    }

    #[test]
    fn test_unique_keys_start_with_ts_symbol() {
        let registry = DatasetRegistry::usdm_futures(BarInterval::M1);
        for spec in registry.iter() {
            assert_eq!(&spec.unique_key[..2], &["ts", "symbol"]);
            let columns = spec.columns();
            for key in &spec.unique_key {
                assert!(columns.contains(key), "{} missing {}", spec.table, key);
            }
        }
    }

    #[test]
    fn test_remote_paths() {
        let registry = DatasetRegistry::usdm_futures(BarInterval::M1);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let klines = registry.require(DatasetKind::Klines).unwrap();
        assert_eq!(
            klines.remote_prefix("BTCUSDT"),
            "data/futures/um/daily/klines/BTCUSDT/1m/"
        );
        assert_eq!(klines.file_stem("BTCUSDT", date), "BTCUSDT-1m-2024-01-01");

        let trades = registry.require(DatasetKind::AggTrades).unwrap();
        assert_eq!(
            trades.remote_prefix("BTCUSDT"),
            "data/futures/um/daily/aggTrades/BTCUSDT/"
        );
        assert_eq!(trades.file_stem("BTCUSDT", date), "BTCUSDT-aggTrades-2024-01-01");
    }

    #[test]
    fn test_interval_in_table_name() {
        let registry = DatasetRegistry::usdm_futures(BarInterval::H1);
        assert_eq!(registry.require(DatasetKind::Klines).unwrap().table, "klines_1h");
        assert_eq!(
            registry.require(DatasetKind::MarkPriceKlines).unwrap().view,
            "engine_mark_price_klines_1h"
        );
        assert_eq!(registry.require(DatasetKind::BookDepth).unwrap().table, "book_depth");
    }

    #[test]
    fn test_subset() {
        let registry = DatasetRegistry::usdm_futures(BarInterval::M1);
        let sub = registry
            .subset(&[DatasetKind::BookDepth, DatasetKind::Klines])
            .unwrap();
        assert_eq!(sub.kinds(), vec![DatasetKind::Klines, DatasetKind::BookDepth]);
        assert!(sub.get(DatasetKind::AggTrades).is_none());
        assert!(registry.subset(&[]).is_err());
    }
}

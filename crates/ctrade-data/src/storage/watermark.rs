//! 심볼/데이터셋별 최신 적재 날짜 조회.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPool;
use tracing::{debug, instrument};

use ctrade_core::DatasetSpec;

use super::database::table_exists;
use super::schema::validate_identifier;
use crate::error::Result;

/// 워터마크 조회기.
///
/// 캐시하지 않으며 매 호출마다 저장소의 현재 상태를 읽습니다.
#[derive(Clone)]
pub struct WatermarkTracker {
    pool: PgPool,
}

impl WatermarkTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 해당 심볼의 가장 최근 행 날짜 (UTC). 테이블이나 행이 없으면 `None`.
    #[instrument(skip(self, spec), fields(table = %spec.table))]
    pub async fn latest_date(&self, spec: &DatasetSpec, symbol: &str) -> Result<Option<NaiveDate>> {
        Ok(self.latest_ts(spec, symbol).await?.map(|ts| ts.date_naive()))
    }

    /// 해당 심볼의 가장 최근 행 시각.
    pub async fn latest_ts(&self, spec: &DatasetSpec, symbol: &str) -> Result<Option<DateTime<Utc>>> {
        let table = validate_identifier(&spec.table)?;
        if !table_exists(&self.pool, table).await? {
            debug!(symbol = symbol, "테이블 없음, 워터마크 없음");
            return Ok(None);
        }

        let sql = format!("SELECT MAX(ts) FROM {} WHERE symbol = $1", table);
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar(&sql)
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;

        debug!(symbol = symbol, latest = ?latest, "워터마크 조회");
        Ok(latest)
    }
}

//! 원격 카탈로그 목록 조회.
//!
//! S3 호환 `ListObjects` 엔드포인트를 페이지 단위로 순회하여
//! (날짜, 객체 키) 쌍으로 정규화합니다.
//!
//! # 페이지네이션
//!
//! 1. `GET {base}/?prefix=<p>&delimiter=/[&marker=<m>]`
//! 2. `IsTruncated`가 false가 될 때까지 반복
//! 3. 다음 커서는 `NextMarker`, 없으면 해당 페이지의 마지막 키
//!
//! 목록 조회는 매번 처음부터 다시 시작하며 상태를 저장하지 않습니다.
//! 어느 페이지에서든 실패하면 전체 목록 조회가 실패합니다 (부분 결과 없음).
//!
//! ```rust,ignore
//! let lister = CatalogLister::new(&HttpConfig::default())?;
//! let objects = lister.list(spec, "BTCUSDT").await?;
//! ```

use futures::stream::{self, Stream, TryStreamExt};
use reqwest::Client;
use serde::Deserialize;
use std::pin::pin;
use std::time::Duration;
use tracing::{debug, instrument};

use ctrade_core::{DatasetSpec, RemoteObject};

use super::HttpConfig;
use crate::error::{DataError, Result};

/// `ListBucketResult` 응답 문서.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListEntry>,
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListEntry {
    key: String,
}

/// 파싱된 목록 페이지.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// 다음 페이지 커서 (`None`이면 마지막 페이지)
    pub next_marker: Option<String>,
}

impl ListPage {
    /// 응답 XML을 파싱합니다.
    pub fn parse(xml: &str) -> Result<Self> {
        let doc: ListBucketResult = quick_xml::de::from_str(xml)?;
        let keys: Vec<String> = doc.contents.into_iter().map(|c| c.key).collect();

        let next_marker = if !doc.is_truncated {
            None
        } else {
            // 제공자가 NextMarker를 생략하는 경우 마지막 키로 이어갑니다
            let marker = doc
                .next_marker
                .filter(|m| !m.is_empty())
                .or_else(|| keys.last().cloned());
            match marker {
                Some(m) => Some(m),
                None => {
                    return Err(DataError::Transport(
                        "truncated listing page without continuation".to_string(),
                    ))
                }
            }
        };

        Ok(Self { keys, next_marker })
    }
}

enum Cursor {
    Start,
    After(String),
    Done,
}

/// 원격 카탈로그 목록 조회기.
#[derive(Clone)]
pub struct CatalogLister {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl CatalogLister {
    /// 설정으로 새 조회기를 생성합니다.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self::with_client(config.build_client()?, config))
    }

    /// 기존 HTTP 클라이언트를 재사용합니다.
    pub fn with_client(client: Client, config: &HttpConfig) -> Self {
        Self {
            client,
            base_url: config.trimmed_base_url().to_string(),
            timeout: config.listing_timeout(),
        }
    }

    /// 단일 페이지 조회.
    async fn fetch_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage> {
        let url = format!("{}/", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .query(&[("prefix", prefix), ("delimiter", "/")]);
        if let Some(m) = marker {
            request = request.query(&[("marker", m)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DataError::Transport(format!("listing {} failed: {}", prefix, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Transport(format!(
                "listing {} returned HTTP {}",
                prefix,
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DataError::Transport(format!("listing {} body: {}", prefix, e)))?;

        ListPage::parse(&body)
    }

    /// 페이지 단위 키 스트림 (지연 평가).
    ///
    /// 스트림을 끝까지 소비해야 전체 목록이 완성됩니다.
    pub fn pages<'a>(&'a self, prefix: &'a str) -> impl Stream<Item = Result<Vec<String>>> + 'a {
        stream::try_unfold(Cursor::Start, move |cursor| async move {
            let marker = match cursor {
                Cursor::Done => return Ok(None),
                Cursor::Start => None,
                Cursor::After(m) => Some(m),
            };

            let page = self.fetch_page(prefix, marker.as_deref()).await?;
            debug!(
                prefix = prefix,
                keys = page.keys.len(),
                truncated = page.next_marker.is_some(),
                "목록 페이지 수신"
            );

            let next = match page.next_marker {
                Some(m) => Cursor::After(m),
                None => Cursor::Done,
            };
            Ok::<_, DataError>(Some((page.keys, next)))
        })
    }

    /// 데이터셋/심볼의 모든 원격 데이터 객체를 조회합니다.
    ///
    /// `.zip`이 아니거나 날짜가 없는 키(체크섬 파일 등)는 제외됩니다.
    #[instrument(skip(self, spec), fields(dataset = %spec.kind))]
    pub async fn list(&self, spec: &DatasetSpec, symbol: &str) -> Result<Vec<RemoteObject>> {
        let prefix = spec.remote_prefix(symbol);
        let mut pages = pin!(self.pages(&prefix));
        let mut objects = Vec::new();
        let mut total_keys = 0usize;

        while let Some(keys) = pages.try_next().await? {
            total_keys += keys.len();
            objects.extend(
                keys.iter()
                    .filter_map(|key| RemoteObject::from_key(spec.kind, symbol, key)),
            );
        }

        debug!(
            prefix = %prefix,
            keys = total_keys,
            objects = objects.len(),
            "원격 목록 조회 완료"
        );
        Ok(objects)
    }
}

//! 병렬 아카이브 다운로드 및 압축 해제.
//!
//! 각 원격 객체는 다음 순서로 처리됩니다:
//!
//! 1. 최종 아티팩트가 이미 있으면 `Skipped` (네트워크 요청 없음)
//! 2. 아카이브를 `<stem>.<token>.zip.part`로 스트리밍 다운로드
//! 3. 단일 CSV 엔트리를 `<stem>.<token>.csv.part`로 압축 해제 (blocking 풀)
//! 4. 선언된 크기와 일치하면 최종 경로로 rename
//!
//! 임시 파일은 성공/실패/취소 어느 경우에도 drop 가드가 제거하므로
//! 최종 경로에는 완전한 아티팩트만 존재합니다.

use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ctrade_core::RemoteObject;

use super::HttpConfig;
use crate::error::{DataError, Result};
use crate::layout::{ArtifactLayout, ARTIFACT_SUFFIX, PARTIAL_SUFFIX};

/// 기본 동시 다운로드 수.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 10;

/// 단일 객체 처리 결과 상태.
#[derive(Debug)]
pub enum FetchStatus {
    /// 새로 다운로드됨
    Fetched(PathBuf),
    /// 이미 존재하여 건너뜀
    Skipped(PathBuf),
    /// 실패 (다음 실행에서 다시 계획됨)
    Failed(DataError),
}

/// 단일 객체 처리 결과.
#[derive(Debug)]
pub struct FetchOutcome {
    pub object: RemoteObject,
    pub status: FetchStatus,
}

impl FetchOutcome {
    /// 로드 가능한 아티팩트 경로 (실패 시 `None`).
    pub fn artifact(&self) -> Option<&Path> {
        match &self.status {
            FetchStatus::Fetched(p) | FetchStatus::Skipped(p) => Some(p),
            FetchStatus::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FetchStatus::Failed(_))
    }
}

/// 배치 다운로드 보고서.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub outcomes: Vec<FetchOutcome>,
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl FetchReport {
    fn from_outcomes(mut outcomes: Vec<FetchOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.object.date.cmp(&b.object.date));

        let mut report = Self::default();
        for outcome in &outcomes {
            match outcome.status {
                FetchStatus::Fetched(_) => report.fetched += 1,
                FetchStatus::Skipped(_) => report.skipped += 1,
                FetchStatus::Failed(_) => report.failed += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    /// 로드할 아티팩트 목록 (날짜순).
    pub fn artifacts(&self) -> impl Iterator<Item = (&RemoteObject, &Path)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.artifact().map(|p| (&o.object, p)))
    }

    /// 실패한 객체와 에러.
    pub fn failures(&self) -> impl Iterator<Item = (&RemoteObject, &DataError)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            FetchStatus::Failed(e) => Some((&o.object, e)),
            _ => None,
        })
    }
}

/// 스코프를 벗어나면 삭제되는 임시 파일 경로.
struct TransientFile {
    path: PathBuf,
    armed: bool,
}

impl TransientFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// rename 등으로 경로가 소비된 뒤 호출합니다.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if self.armed {
            // 아직 생성되지 않은 경우도 있으므로 결과는 무시
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// 병렬 다운로더.
#[derive(Clone)]
pub struct ParallelFetcher {
    client: Client,
    base_url: String,
    layout: ArtifactLayout,
    concurrency: usize,
    read_stall_timeout: Duration,
}

impl ParallelFetcher {
    /// 새 다운로더를 생성합니다.
    pub fn new(config: &HttpConfig, layout: ArtifactLayout, concurrency: usize) -> Result<Self> {
        Ok(Self::with_client(config.build_client()?, config, layout, concurrency))
    }

    /// 기존 HTTP 클라이언트를 재사용합니다.
    pub fn with_client(
        client: Client,
        config: &HttpConfig,
        layout: ArtifactLayout,
        concurrency: usize,
    ) -> Self {
        Self {
            client,
            base_url: config.trimmed_base_url().to_string(),
            layout,
            concurrency: concurrency.max(1),
            read_stall_timeout: config.read_stall_timeout(),
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// 계획된 객체를 동시에 최대 `concurrency`개씩 가져옵니다.
    ///
    /// 객체별 실패는 보고서에 기록되며 나머지 객체 처리를 중단하지 않습니다.
    pub async fn fetch_all(&self, plan: &[RemoteObject]) -> FetchReport {
        if plan.is_empty() {
            return FetchReport::default();
        }

        let outcomes: Vec<FetchOutcome> = stream::iter(plan.iter().cloned())
            .map(|object| async move {
                let status = self.fetch_one(&object).await;
                FetchOutcome { object, status }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let report = FetchReport::from_outcomes(outcomes);
        info!(
            planned = plan.len(),
            fetched = report.fetched,
            skipped = report.skipped,
            failed = report.failed,
            "다운로드 완료"
        );
        report
    }

    /// 단일 객체 처리.
    pub async fn fetch_one(&self, object: &RemoteObject) -> FetchStatus {
        let target = self.layout.artifact_path(object);

        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            debug!(key = %object.key, "이미 존재하는 아티팩트, 건너뜀");
            return FetchStatus::Skipped(target);
        }

        match self.download_and_unpack(object, &target).await {
            Ok(bytes) => {
                debug!(key = %object.key, bytes = bytes, "아티팩트 저장");
                FetchStatus::Fetched(target)
            }
            Err(e) => {
                warn!(key = %object.key, error = %e, "다운로드 실패");
                FetchStatus::Failed(e)
            }
        }
    }

    async fn download_and_unpack(&self, object: &RemoteObject, target: &Path) -> Result<u64> {
        let dir = target
            .parent()
            .ok_or_else(|| DataError::Config(format!("잘못된 아티팩트 경로: {}", target.display())))?;
        tokio::fs::create_dir_all(dir).await?;

        let token = Uuid::new_v4().simple().to_string();
        let stem = object.file_stem();
        let archive = TransientFile::new(dir.join(format!("{}.{}.zip{}", stem, &token[..8], PARTIAL_SUFFIX)));
        let unpacked = TransientFile::new(dir.join(format!(
            "{}.{}{}{}",
            stem,
            &token[..8],
            ARTIFACT_SUFFIX,
            PARTIAL_SUFFIX
        )));

        self.download(&object.key, archive.path()).await?;

        // 이후 가드는 blocking 작업이 소유하므로 호출자가 취소해도 정리됩니다
        let target = target.to_path_buf();
        let bytes =
            tokio::task::spawn_blocking(move || publish_artifact(archive, unpacked, &target))
                .await??;
        Ok(bytes)
    }

    /// 객체를 스트리밍으로 파일에 저장합니다.
    async fn download(&self, key: &str, path: &Path) -> Result<u64> {
        let url = format!("{}/{}", self.base_url, key);
        let response = tokio::time::timeout(self.read_stall_timeout, self.client.get(&url).send())
            .await
            .map_err(|_| {
                DataError::Transport(format!(
                    "{}초 동안 응답 헤더 수신 없음: {}",
                    self.read_stall_timeout.as_secs(),
                    url
                ))
            })??;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }

        let expected = response.content_length();
        let mut file = tokio::fs::File::create(path).await?;
        let mut body = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let next = tokio::time::timeout(self.read_stall_timeout, body.next())
                .await
                .map_err(|_| {
                    DataError::Transport(format!(
                        "{}초 동안 데이터 수신 없음: {}",
                        self.read_stall_timeout.as_secs(),
                        url
                    ))
                })?;
            match next {
                Some(chunk) => {
                    let chunk = chunk?;
                    file.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                None => break,
            }
        }
        file.flush().await?;

        if let Some(expected) = expected {
            if expected != written {
                return Err(DataError::Transport(format!(
                    "응답 본문이 잘림: {} / {} bytes ({})",
                    written, expected, url
                )));
            }
        }

        Ok(written)
    }
}

/// 아카이브를 풀어 최종 경로로 rename합니다.
///
/// 실패하면 두 임시 파일 모두 가드가 제거합니다.
fn publish_artifact(archive: TransientFile, unpacked: TransientFile, target: &Path) -> Result<u64> {
    let bytes = unpack_single_csv(archive.path(), unpacked.path())?;
    std::fs::rename(unpacked.path(), target)?;
    unpacked.disarm();
    drop(archive);
    Ok(bytes)
}

/// 아카이브의 첫 번째 CSV 엔트리를 `out`에 씁니다.
///
/// 엔트리의 선언 크기와 실제 기록 크기가 다르면 에러입니다.
fn unpack_single_csv(archive_path: &Path, out: &Path) -> Result<u64> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

    let name = archive
        .file_names()
        .find(|n| n.ends_with(ARTIFACT_SUFFIX))
        .map(str::to_string)
        .ok_or_else(|| DataError::Archive("CSV 엔트리가 없는 아카이브".to_string()))?;

    let mut entry = archive.by_name(&name)?;
    let declared = entry.size();

    let mut writer = std::io::BufWriter::new(std::fs::File::create(out)?);
    let mut buf = [0u8; 64 * 1024];
    let mut written: u64 = 0;
    loop {
        let n = entry
            .read(&mut buf)
            .map_err(|e| DataError::Archive(format!("{}: {}", name, e)))?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        written += n as u64;
    }
    writer.flush()?;

    if written != declared {
        return Err(DataError::Archive(format!(
            "{}: 압축 해제 크기 불일치 ({} / {} bytes)",
            name, written, declared
        )));
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrade_core::DatasetKind;
    use zip::write::SimpleFileOptions;

    const KEY: &str = "data/futures/um/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-03-10.zip";
    const CSV: &str = "open_time,open,high,low,close,volume,close_time,quote_volume,count,taker_buy_volume,taker_buy_quote_volume,ignore\n\
1710028800000,68000.1,68010.0,67990.5,68005.0,12.5,1710028859999,850000.0,321,6.2,421000.0,0\n";

    fn zip_bytes(name: &str, content: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer.start_file(name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn object(key: &str) -> RemoteObject {
        RemoteObject::from_key(DatasetKind::Klines, "BTCUSDT", key).unwrap()
    }

    fn fetcher(server: &mockito::Server, root: &Path) -> ParallelFetcher {
        ParallelFetcher::new(
            &HttpConfig::with_base_url(server.url()),
            ArtifactLayout::new(root),
            4,
        )
        .unwrap()
    }

    fn leftover_partials(dir: &Path) -> Vec<PathBuf> {
        if !dir.exists() {
            return Vec::new();
        }
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(PARTIAL_SUFFIX))
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_and_unpack() {
        let mut server = mockito::Server::new_async().await;
        let root = tempfile::tempdir().unwrap();
        let _mock = server
            .mock("GET", format!("/{}", KEY).as_str())
            .with_status(200)
            .with_body(zip_bytes("BTCUSDT-1m-2024-03-10.csv", CSV))
            .create_async()
            .await;

        let fetcher = fetcher(&server, root.path());
        let report = fetcher.fetch_all(&[object(KEY)]).await;

        assert_eq!(report.fetched, 1);
        assert_eq!(report.failed, 0);
        let (_, path) = report.artifacts().next().unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), CSV);
        assert!(leftover_partials(path.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_existing_artifact_skipped_without_request() {
        let mut server = mockito::Server::new_async().await;
        let root = tempfile::tempdir().unwrap();
        let mock = server
            .mock("GET", format!("/{}", KEY).as_str())
            .expect(0)
            .create_async()
            .await;

        let fetcher = fetcher(&server, root.path());
        let obj = object(KEY);
        let target = fetcher.layout().artifact_path(&obj);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, CSV).unwrap();

        let report = fetcher.fetch_all(&[obj]).await;
        assert_eq!(report.skipped, 1);
        assert_eq!(report.fetched, 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_leaves_no_files() {
        let mut server = mockito::Server::new_async().await;
        let root = tempfile::tempdir().unwrap();
        let _mock = server
            .mock("GET", format!("/{}", KEY).as_str())
            .with_status(404)
            .create_async()
            .await;

        let fetcher = fetcher(&server, root.path());
        let obj = object(KEY);
        let report = fetcher.fetch_all(std::slice::from_ref(&obj)).await;

        assert_eq!(report.failed, 1);
        let (_, err) = report.failures().next().unwrap();
        assert!(matches!(err, DataError::HttpStatus { status: 404, .. }));
        let target = fetcher.layout().artifact_path(&obj);
        assert!(!target.exists());
        assert!(leftover_partials(target.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_archive_is_archive_error() {
        let mut server = mockito::Server::new_async().await;
        let root = tempfile::tempdir().unwrap();
        let _mock = server
            .mock("GET", format!("/{}", KEY).as_str())
            .with_status(200)
            .with_body(b"PK\x03\x04 not really a zip".to_vec())
            .create_async()
            .await;

        let fetcher = fetcher(&server, root.path());
        let obj = object(KEY);
        let report = fetcher.fetch_all(std::slice::from_ref(&obj)).await;

        let (_, err) = report.failures().next().unwrap();
        assert!(matches!(err, DataError::Archive(_)));
        let target = fetcher.layout().artifact_path(&obj);
        assert!(!target.exists());
        assert!(leftover_partials(target.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_archive_without_csv() {
        let mut server = mockito::Server::new_async().await;
        let root = tempfile::tempdir().unwrap();
        let _mock = server
            .mock("GET", format!("/{}", KEY).as_str())
            .with_status(200)
            .with_body(zip_bytes("notes.txt", "hello"))
            .create_async()
            .await;

        let report = fetcher(&server, root.path()).fetch_all(&[object(KEY)]).await;
        let (_, err) = report.failures().next().unwrap();
        assert!(matches!(err, DataError::Archive(_)));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_batch() {
        let mut server = mockito::Server::new_async().await;
        let root = tempfile::tempdir().unwrap();
        let good = KEY;
        let bad = "data/futures/um/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-03-11.zip";

        let _ok = server
            .mock("GET", format!("/{}", good).as_str())
            .with_status(200)
            .with_body(zip_bytes("BTCUSDT-1m-2024-03-10.csv", CSV))
            .create_async()
            .await;
        let _fail = server
            .mock("GET", format!("/{}", bad).as_str())
            .with_status(500)
            .create_async()
            .await;

        let report = fetcher(&server, root.path())
            .fetch_all(&[object(bad), object(good)])
            .await;

        assert_eq!(report.fetched, 1);
        assert_eq!(report.failed, 1);
        // 날짜순 정렬
        assert_eq!(report.outcomes[0].object.key, good);
        let (_, err) = report.failures().next().unwrap();
        assert!(err.is_retryable());
    }

    /// 요청을 받은 뒤 `reply`를 보내고 `hold` 동안 연결을 유지하는 서버.
    async fn raw_server(reply: &'static [u8], hold: Duration) -> String {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(reply).await;
                    let _ = socket.flush().await;
                    tokio::time::sleep(hold).await;
                });
            }
        });
        format!("http://{}", addr)
    }

    fn stall_fetcher(base_url: String, root: &Path) -> ParallelFetcher {
        let config = HttpConfig {
            connect_timeout_secs: 1,
            read_stall_timeout_secs: 1,
            ..HttpConfig::with_base_url(base_url)
        };
        ParallelFetcher::new(&config, ArtifactLayout::new(root), 1).unwrap()
    }

    async fn assert_transport_failure_leaves_nothing(fetcher: &ParallelFetcher) {
        let obj = object(KEY);
        let target = fetcher.layout().artifact_path(&obj);

        let status = tokio::time::timeout(Duration::from_secs(10), fetcher.fetch_one(&obj))
            .await
            .expect("fetch_one must finish within the stall timeout");

        assert!(
            matches!(status, FetchStatus::Failed(DataError::Transport(_))),
            "unexpected status: {:?}",
            status
        );
        assert!(!target.exists());
        assert!(leftover_partials(target.parent().unwrap()).is_empty());
    }

    #[tokio::test]
    async fn test_silent_server_times_out_waiting_for_headers() {
        let root = tempfile::tempdir().unwrap();
        let base = raw_server(b"", Duration::from_secs(60)).await;
        assert_transport_failure_leaves_nothing(&stall_fetcher(base, root.path())).await;
    }

    #[tokio::test]
    async fn test_body_stall_times_out() {
        let root = tempfile::tempdir().unwrap();
        let base = raw_server(
            b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\nPK\x03\x04partial",
            Duration::from_secs(60),
        )
        .await;
        assert_transport_failure_leaves_nothing(&stall_fetcher(base, root.path())).await;
    }

    #[tokio::test]
    async fn test_truncated_body_is_transport_error() {
        let root = tempfile::tempdir().unwrap();
        // 선언 길이보다 적게 보내고 연결 종료
        let base = raw_server(
            b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\nConnection: close\r\n\r\nPK\x03\x04partial",
            Duration::ZERO,
        )
        .await;
        assert_transport_failure_leaves_nothing(&stall_fetcher(base, root.path())).await;
    }

    #[test]
    fn test_publish_failure_removes_both_transients() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("a.zip.part");
        let unpacked = dir.path().join("a.csv.part");
        let target = dir.path().join("a.csv");
        std::fs::write(&archive, b"not a zip").unwrap();
        // blocking 작업이 이미 쓰기 시작한 상태
        std::fs::write(&unpacked, b"half").unwrap();

        let err = publish_artifact(
            TransientFile::new(archive.clone()),
            TransientFile::new(unpacked.clone()),
            &target,
        )
        .unwrap_err();

        assert!(matches!(err, DataError::Archive(_)));
        assert!(!archive.exists());
        assert!(!unpacked.exists());
        assert!(!target.exists());
    }

    #[test]
    fn test_publish_success_renames_and_cleans() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("b.zip.part");
        let unpacked = dir.path().join("b.csv.part");
        let target = dir.path().join("b.csv");
        std::fs::write(&archive, zip_bytes("b.csv", CSV)).unwrap();

        let bytes = publish_artifact(
            TransientFile::new(archive.clone()),
            TransientFile::new(unpacked.clone()),
            &target,
        )
        .unwrap();

        assert_eq!(bytes, CSV.len() as u64);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), CSV);
        assert!(!archive.exists());
        assert!(!unpacked.exists());
    }

    #[test]
    fn test_transient_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.part");
        std::fs::write(&path, b"partial").unwrap();
        {
            let _guard = TransientFile::new(path.clone());
        }
        assert!(!path.exists());

        std::fs::write(&path, b"kept").unwrap();
        TransientFile::new(path.clone()).disarm();
        assert!(path.exists());
    }
}

//! 로컬 아티팩트 디렉토리 구조.
//!
//! `<root>/<symbol>/<dataset>/<symbol>-<variant>-<YYYY-MM-DD>.csv`

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use ctrade_core::{date_from_name, DatasetKind, DatasetSpec, RemoteObject};

use crate::error::Result;

/// 압축 해제된 아티팩트 확장자.
pub const ARTIFACT_SUFFIX: &str = ".csv";

/// 진행 중인 쓰기의 임시 확장자.
pub const PARTIAL_SUFFIX: &str = ".part";

/// 로컬 데이터 루트.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 심볼/데이터셋 디렉토리.
    pub fn dataset_dir(&self, symbol: &str, kind: DatasetKind) -> PathBuf {
        self.root.join(symbol).join(kind.remote_name())
    }

    /// 원격 객체에 대응하는 최종 아티팩트 경로.
    pub fn artifact_path(&self, object: &RemoteObject) -> PathBuf {
        self.dataset_dir(&object.symbol, object.kind)
            .join(format!("{}{}", object.file_stem(), ARTIFACT_SUFFIX))
    }

    /// 디렉토리에 이미 있는 아티팩트를 날짜순으로 나열합니다.
    ///
    /// 파일명 변형자가 데이터셋 정의와 다른 파일(다른 봉 간격 등)과
    /// 임시 파일은 제외됩니다. 디렉토리가 없으면 빈 목록입니다.
    pub fn local_artifacts(&self, spec: &DatasetSpec, symbol: &str) -> Result<Vec<(NaiveDate, PathBuf)>> {
        let dir = self.dataset_dir(symbol, spec.kind);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(date) = date_from_name(name, ARTIFACT_SUFFIX) else {
                continue;
            };
            if name != format!("{}{}", spec.file_stem(symbol, date), ARTIFACT_SUFFIX) {
                continue;
            }
            found.push((date, entry.path()));
        }

        found.sort();
        Ok(found)
    }
}

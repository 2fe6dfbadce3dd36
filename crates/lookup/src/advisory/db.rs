//! 로컬 권고 데이터베이스
//!
//! 디렉토리 안의 JSON 파일들에서 권고 항목을 읽어 패키지명으로 색인합니다.
//! 파일 하나는 항목 배열입니다:
//!
//! ```json
//! [
//!   {
//!     "advisory_id": "GHSA-wf5p-g6vw-rhxx",
//!     "package": "left-pad",
//!     "affected_ranges": [{ "introduced": "0.0.1", "fixed": "1.3.0" }],
//!     "fixed_version": "1.3.0",
//!     "severity": "high",
//!     "description": "prototype pollution"
//!   }
//! ]
//! ```
//!
//! 손상된 파일 하나가 전체 로드를 막지 않도록, 읽기/파싱 실패는 경고 후
//! 건너뜁니다. 로드는 블로킹 I/O이므로 비동기 런타임에서는
//! `tokio::task::spawn_blocking` 안에서 호출해야 합니다.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use depwatch_core::types::Severity;

use crate::error::LookupError;

/// 파일 하나의 최대 크기. 초과하는 파일은 건너뜁니다.
pub const MAX_ADVISORY_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// 데이터베이스가 보관하는 최대 항목 수. 초과분은 잘라냅니다.
pub const MAX_ADVISORY_ENTRIES: usize = 1_000_000;

/// 버전 구간 `[introduced, fixed)`
///
/// `introduced`가 없으면 최초 버전부터, `fixed`가 없으면 아직 수정되지
/// 않은 구간입니다.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VersionRange {
    /// 취약점이 도입된 버전 (포함)
    #[serde(default)]
    pub introduced: Option<String>,
    /// 취약점이 수정된 버전 (미포함)
    #[serde(default)]
    pub fixed: Option<String>,
}

/// 권고 항목 하나
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdvisoryDbEntry {
    /// 권고 식별자 (예: GHSA id)
    pub advisory_id: String,
    /// 대상 패키지명
    pub package: String,
    /// 영향받는 버전 구간들. 비어 있으면 어떤 버전도 매칭되지 않습니다.
    #[serde(default)]
    pub affected_ranges: Vec<VersionRange>,
    /// 수정된 버전 (출력용)
    #[serde(default)]
    pub fixed_version: Option<String>,
    /// 심각도
    #[serde(default)]
    pub severity: Severity,
    /// 설명
    #[serde(default)]
    pub description: String,
}

/// 패키지명으로 색인된 권고 데이터베이스
///
/// 로드 후에는 불변입니다. 조회는 소문자 패키지명 기준이라 대소문자가
/// 달라도 같은 항목을 찾습니다.
#[derive(Debug, Clone, Default)]
pub struct AdvisoryDb {
    entries: Vec<AdvisoryDbEntry>,
    index: HashMap<String, Vec<usize>>,
}

impl AdvisoryDb {
    /// 항목이 없는 빈 데이터베이스를 생성합니다.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 항목 목록으로 데이터베이스를 만들고 색인합니다.
    pub fn from_entries(entries: Vec<AdvisoryDbEntry>) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, entry) in entries.iter().enumerate() {
            index.entry(entry.package.to_lowercase()).or_default().push(pos);
        }
        Self { entries, index }
    }

    /// JSON 배열 문자열을 항목 목록으로 파싱합니다.
    ///
    /// # Errors
    ///
    /// 유효한 JSON 배열이 아니면 `LookupError::AdvisoryParse`를 반환합니다.
    pub fn parse_entries(raw: &str) -> Result<Vec<AdvisoryDbEntry>, LookupError> {
        serde_json::from_str(raw).map_err(|error| LookupError::AdvisoryParse(error.to_string()))
    }

    /// 디렉토리의 `.json` 파일들을 모두 읽어 데이터베이스를 만듭니다.
    ///
    /// 디렉토리가 없으면 빈 데이터베이스를 반환합니다. 개별 파일의 읽기나
    /// 파싱 실패는 경고 후 건너뜁니다. 파일은 이름순으로 읽어 로드 결과가
    /// 결정적입니다.
    ///
    /// # Errors
    ///
    /// 디렉토리 자체를 열 수 없을 때만 `LookupError::AdvisoryLoad`를
    /// 반환합니다.
    pub fn load_from_dir(path: &Path) -> Result<Self, LookupError> {
        if !path.exists() {
            debug!(path = %path.display(), "advisory directory missing, starting empty");
            return Ok(Self::empty());
        }

        let read_dir = fs::read_dir(path).map_err(|error| LookupError::AdvisoryLoad {
            path: path.display().to_string(),
            reason: error.to_string(),
        })?;

        let mut files: Vec<_> = read_dir
            .filter_map(Result::ok)
            .map(|dir_entry| dir_entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut entries = Vec::new();
        let mut loaded_files = 0usize;
        for file in &files {
            if let Ok(meta) = fs::metadata(file)
                && meta.len() > MAX_ADVISORY_FILE_SIZE
            {
                warn!(
                    path = %file.display(),
                    size = meta.len(),
                    limit = MAX_ADVISORY_FILE_SIZE,
                    "skipping oversized advisory file"
                );
                continue;
            }

            let raw = match fs::read_to_string(file) {
                Ok(raw) => raw,
                Err(error) => {
                    warn!(path = %file.display(), error = %error, "failed to read advisory file");
                    continue;
                }
            };

            match Self::parse_entries(&raw) {
                Ok(parsed) => {
                    entries.extend(parsed);
                    loaded_files += 1;
                }
                Err(error) => {
                    warn!(path = %file.display(), error = %error, "skipping unparseable advisory file");
                }
            }

            if entries.len() >= MAX_ADVISORY_ENTRIES {
                warn!(
                    limit = MAX_ADVISORY_ENTRIES,
                    "advisory entry limit reached, truncating"
                );
                entries.truncate(MAX_ADVISORY_ENTRIES);
                break;
            }
        }

        info!(
            path = %path.display(),
            files = loaded_files,
            entries = entries.len(),
            "advisory database loaded"
        );
        Ok(Self::from_entries(entries))
    }

    /// 패키지명으로 권고 항목을 찾습니다. 대소문자를 구분하지 않습니다.
    pub fn lookup(&self, package: &str) -> Vec<&AdvisoryDbEntry> {
        let key = package.to_lowercase();
        self.index
            .get(&key)
            .map(|positions| positions.iter().map(|&pos| &self.entries[pos]).collect())
            .unwrap_or_default()
    }

    /// 보관 중인 항목 수
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// 항목이 하나도 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"[
            {
                "advisory_id": "GHSA-0001",
                "package": "left-pad",
                "affected_ranges": [{ "introduced": "0.0.1", "fixed": "1.3.0" }],
                "fixed_version": "1.3.0",
                "severity": "high",
                "description": "padding gone wrong"
            },
            {
                "advisory_id": "GHSA-0002",
                "package": "left-pad",
                "affected_ranges": [{ "fixed": "2.0.0" }],
                "severity": "low",
                "description": "minor issue"
            }
        ]"#
    }

    #[test]
    fn parse_entries_reads_array() {
        let entries = AdvisoryDb::parse_entries(sample_json()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].advisory_id, "GHSA-0001");
        assert_eq!(entries[0].severity, Severity::High);
    }

    #[test]
    fn parse_entries_applies_defaults() {
        let entries =
            AdvisoryDb::parse_entries(r#"[{"advisory_id": "A-1", "package": "x"}]"#).unwrap();
        assert_eq!(entries[0].severity, Severity::Info);
        assert!(entries[0].affected_ranges.is_empty());
        assert_eq!(entries[0].description, "");
        assert_eq!(entries[0].fixed_version, None);
    }

    #[test]
    fn parse_entries_rejects_malformed() {
        assert!(matches!(
            AdvisoryDb::parse_entries("{not an array"),
            Err(LookupError::AdvisoryParse(_))
        ));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let db = AdvisoryDb::from_entries(AdvisoryDb::parse_entries(sample_json()).unwrap());
        assert_eq!(db.lookup("left-pad").len(), 2);
        assert_eq!(db.lookup("Left-Pad").len(), 2);
        assert!(db.lookup("chalk").is_empty());
    }

    #[test]
    fn missing_directory_yields_empty_db() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let db = AdvisoryDb::load_from_dir(&missing).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn load_from_dir_skips_non_json_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), sample_json()).unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"[{"advisory_id": "GHSA-0003", "package": "chalk", "severity": "critical"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{{{{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let db = AdvisoryDb::load_from_dir(dir.path()).unwrap();
        assert_eq!(db.entry_count(), 3);
        assert_eq!(db.lookup("chalk").len(), 1);
        assert_eq!(db.lookup("left-pad").len(), 2);
    }
}

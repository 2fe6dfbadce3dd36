//! 권고 데이터베이스 기반 취약점 probe
//!
//! [`AdvisoryDb`]에서 패키지의 권고를 찾고, 설치 버전이 영향 구간에
//! 들어가는지 판정한 뒤, 최소 심각도 아래의 발견을 걸러
//! [`VulnReport`](crate::types::VulnReport)를 만듭니다.

pub mod db;
pub mod version;

use std::sync::Arc;

use tracing::debug;

use depwatch_core::types::{Severity, Vulnerability};

use crate::error::LookupError;
use crate::probe::VulnProbe;
use crate::types::{PackageIdentity, VulnReport};

pub use db::{
    AdvisoryDb, AdvisoryDbEntry, MAX_ADVISORY_ENTRIES, MAX_ADVISORY_FILE_SIZE, VersionRange,
};
pub use version::is_affected;

/// 로컬 권고 데이터베이스를 조회하는 [`VulnProbe`] 구현
///
/// `min_severity` 미만의 발견은 리포트에서 제외합니다. 걸러진 리포트가
/// 비면 깨끗한 결과(`ok == true`)가 됩니다.
#[derive(Debug, Clone)]
pub struct AdvisoryDbProbe {
    db: Arc<AdvisoryDb>,
    min_severity: Severity,
}

impl AdvisoryDbProbe {
    /// 데이터베이스와 심각도 하한으로 probe를 생성합니다.
    pub fn new(db: Arc<AdvisoryDb>, min_severity: Severity) -> Self {
        Self { db, min_severity }
    }

    /// 조회 대상 데이터베이스
    pub fn db(&self) -> &AdvisoryDb {
        &self.db
    }

    /// 리포트에 포함되는 최소 심각도
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    fn findings_for(&self, identity: &PackageIdentity) -> Vec<Vulnerability> {
        self.db
            .lookup(&identity.name)
            .into_iter()
            .filter(|entry| is_affected(&identity.version, &entry.affected_ranges))
            .filter(|entry| entry.severity >= self.min_severity)
            .map(|entry| Vulnerability {
                advisory_id: entry.advisory_id.clone(),
                package: entry.package.clone(),
                affected_version: identity.version.clone(),
                fixed_version: entry.fixed_version.clone(),
                severity: entry.severity,
                description: entry.description.clone(),
            })
            .collect()
    }
}

impl VulnProbe for AdvisoryDbProbe {
    async fn probe(&self, identity: &PackageIdentity) -> Result<VulnReport, LookupError> {
        let findings = self.findings_for(identity);
        debug!(
            package = %identity,
            findings = findings.len(),
            "advisory database probed"
        );
        Ok(VulnReport::from_findings(findings))
    }
}

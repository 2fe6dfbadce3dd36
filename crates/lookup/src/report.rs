//! 리포트 요약 렌더링
//!
//! 오케스트레이터가 성공한 리포트에 첨부하는 사람용 요약 문자열과,
//! 심각도별 집계를 만듭니다. 요약은 캐시된 리포트에 함께 보관되므로
//! 키 하나당 한 번만 렌더링됩니다.

use std::fmt;

use serde::Serialize;

use depwatch_core::types::{Severity, Vulnerability};

use crate::types::VulnReport;

/// 심각도별 발견 수 집계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    /// Critical 발견 수
    pub critical: usize,
    /// High 발견 수
    pub high: usize,
    /// Medium 발견 수
    pub medium: usize,
    /// Low 발견 수
    pub low: usize,
    /// Info 발견 수
    pub info: usize,
}

impl SeverityCounts {
    /// 발견 목록을 집계합니다.
    pub fn tally(findings: &[Vulnerability]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }

    /// 전체 발견 수
    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.info
    }

    /// 두 집계를 더합니다.
    pub fn merge(&mut self, other: &Self) {
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
        self.info += other.info;
    }
}

impl fmt::Display for SeverityCounts {
    /// 0이 아닌 항목만 심각한 순서로 나열합니다. 예: `1 critical, 2 high`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (self.critical, "critical"),
            (self.high, "high"),
            (self.medium, "medium"),
            (self.low, "low"),
            (self.info, "info"),
        ];
        let mut first = true;
        for (count, label) in parts {
            if count == 0 {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{count} {label}")?;
            first = false;
        }
        if first {
            write!(f, "none")?;
        }
        Ok(())
    }
}

/// 리포트의 사람용 요약을 렌더링합니다.
///
/// 발견이 없으면 한 줄, 있으면 집계 헤더와 발견별 상세 줄을 만듭니다:
///
/// ```text
/// left-pad@1.0.5: 2 known vulnerabilities (1 high, 1 low)
///   [High] GHSA-0001 padding gone wrong (fixed in 1.3.0)
///   [Low] GHSA-0002 minor issue (no fix available)
/// ```
pub fn render_summary(key: &str, report: &VulnReport) -> String {
    if report.findings.is_empty() {
        return format!("{key}: no known vulnerabilities");
    }

    let counts = SeverityCounts::tally(&report.findings);
    let noun = if report.findings.len() == 1 {
        "vulnerability"
    } else {
        "vulnerabilities"
    };
    let mut summary = format!("{key}: {} known {noun} ({counts})", report.findings.len());

    for finding in &report.findings {
        let fix = match &finding.fixed_version {
            Some(version) => format!("fixed in {version}"),
            None => "no fix available".to_owned(),
        };
        summary.push_str(&format!(
            "\n  [{}] {} {} ({fix})",
            finding.severity, finding.advisory_id, finding.description
        ));
    }
    summary
}

//! 어드바이저리 이벤트
//!
//! 취약점이 발견된 리포트마다 하나씩 만들어져 서비스의 이벤트 채널로
//! 방출됩니다. 소비자(CLI, 알림 등)는 리포트 전체가 아니라 이 요약
//! 이벤트를 받습니다.

use std::fmt;

use serde::Serialize;

use depwatch_core::event::{EVENT_TYPE_ADVISORY, Event, EventMetadata, MODULE_LOOKUP};
use depwatch_core::types::Severity;

use crate::report::render_summary;
use crate::types::VulnReport;

/// 취약점 발견을 알리는 이벤트
#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryEvent {
    id: String,
    metadata: EventMetadata,
    /// 대상 패키지의 복합 키 (`name@version`)
    pub package: String,
    /// 발견 중 가장 높은 심각도
    pub worst_severity: Severity,
    /// 발견 수
    pub finding_count: usize,
    /// 사람용 요약
    pub summary: String,
}

impl AdvisoryEvent {
    /// 새 추적 ID로 이벤트를 생성합니다.
    ///
    /// 리포트에 요약이 첨부되어 있으면 그대로 쓰고, 없으면 직접
    /// 렌더링합니다.
    pub fn new(package_key: impl Into<String>, report: &VulnReport) -> Self {
        Self::build(
            package_key.into(),
            report,
            EventMetadata::with_new_trace(MODULE_LOOKUP),
        )
    }

    /// 기존 추적 ID를 이어받아 이벤트를 생성합니다.
    pub fn with_trace(
        package_key: impl Into<String>,
        report: &VulnReport,
        trace_id: impl Into<String>,
    ) -> Self {
        Self::build(
            package_key.into(),
            report,
            EventMetadata::new(MODULE_LOOKUP, trace_id),
        )
    }

    fn build(package: String, report: &VulnReport, metadata: EventMetadata) -> Self {
        let summary = report
            .summary
            .clone()
            .unwrap_or_else(|| render_summary(&package, report));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata,
            package,
            worst_severity: report.worst_severity(),
            finding_count: report.finding_count(),
            summary,
        }
    }
}

impl Event for AdvisoryEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_ADVISORY
    }
}

impl fmt::Display for AdvisoryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AdvisoryEvent[{}] package={} findings={} severity={}",
            &self.id[..8.min(self.id.len())],
            self.package,
            self.finding_count,
            self.worst_severity,
        )
    }
}

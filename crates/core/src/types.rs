//! 공통 도메인 타입
//!
//! 워크스페이스 전체에서 공유하는 심각도와 취약점 레코드 타입을 정의합니다.
//! 조회 파이프라인 고유의 타입(패키지 질의, 리포트 등)은 `depwatch-lookup`에
//! 있습니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 취약점 심각도
///
/// `Info < Low < Medium < High < Critical` 순서로 정렬됩니다.
/// 어드바이저리 필터링의 최소 심각도 비교에 `Ord`를 사용합니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 정보성 (기본값)
    #[default]
    Info,
    /// 낮음
    Low,
    /// 중간
    Medium,
    /// 높음
    High,
    /// 치명적
    Critical,
}

impl Severity {
    /// 관용적인 표기를 허용하는 느슨한 파싱입니다.
    ///
    /// 설정 파일이나 CLI 인자처럼 사람이 입력하는 값에 사용합니다.
    /// 인식할 수 없는 문자열은 `None`을 반환합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" | "informational" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "Info",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        write!(f, "{label}")
    }
}

/// 단일 취약점 발견 레코드
///
/// 어드바이저리 DB 항목이 특정 패키지 버전과 매칭되었을 때 생성됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    /// 어드바이저리 식별자 (예: "GHSA-xxxx-xxxx-xxxx")
    pub advisory_id: String,
    /// 영향을 받는 패키지명
    pub package: String,
    /// 매칭된 설치 버전
    pub affected_version: String,
    /// 수정된 버전 (없으면 아직 패치 미출시)
    pub fixed_version: Option<String>,
    /// 심각도
    pub severity: Severity,
    /// 설명
    pub description: String,
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}@{} (fixed: {})",
            self.severity,
            self.advisory_id,
            self.package,
            self.affected_version,
            self.fixed_version.as_deref().unwrap_or("N/A"),
        )
    }
}

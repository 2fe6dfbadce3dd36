//! 조회 파이프라인 도메인 타입
//!
//! 입력(패키지 질의)부터 출력(주석된 패키지)까지의 타입을 정의합니다.
//!
//! ```text
//! PackageQuery --(resolver)--> PackageIdentity --(probe)--> VulnReport
//!                                                               |
//!                                            AnnotatedPackage <-+
//! ```

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use depwatch_core::types::{Severity, Vulnerability};

use crate::error::LookupError;

/// 로컬 설치본을 찾지 못한 패키지에 부여되는 버전 센티널
pub const LATEST_VERSION: &str = "latest";

/// 패키지 질의 -- 파이프라인의 입력 단위
///
/// 두 형태가 있습니다:
///
/// - **완전 지정**: `name`과 `version`이 모두 있는 경우. 식별 과정을
///   완전히 건너뜁니다.
/// - **참조**: `version`이 없는 경우. `source_file`에서 상위로 manifest를
///   탐색하여 설치된 버전을 찾습니다.
///
/// `reference`는 원본 참조 문자열(예: import 스펙)로, 식별 캐시의 키로만
/// 사용되는 불투명한 값입니다. 질의는 수신된 그대로 불변으로 유지되며,
/// 파이프라인은 새 [`AnnotatedPackage`]를 만들어 반환합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageQuery {
    /// 요청된 패키지명
    pub name: String,
    /// 요청된 버전 (있으면 완전 지정 질의)
    pub version: Option<String>,
    /// 참조가 선언된 소스 파일 경로
    pub source_file: Option<PathBuf>,
    /// 식별 캐시 키로 쓰이는 원본 참조 문자열
    pub reference: Option<String>,
}

impl PackageQuery {
    /// 이름과 버전이 모두 지정된 질의를 생성합니다.
    pub fn specified(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            source_file: None,
            reference: None,
        }
    }

    /// 소스 파일 기준으로 식별이 필요한 질의를 생성합니다.
    pub fn from_source(name: impl Into<String>, source_file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: None,
            source_file: Some(source_file.into()),
            reference: None,
        }
    }

    /// 참조 문자열을 설정합니다. 같은 문자열의 질의는 식별 결과를 공유합니다.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// 소스 파일 경로를 설정합니다.
    #[must_use]
    pub fn with_source_file(mut self, source_file: impl Into<PathBuf>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// 이름과 버전이 모두 지정되어 식별이 불필요한지 여부
    pub fn is_fully_specified(&self) -> bool {
        self.version.is_some()
    }

    /// `name[@version]` 형식의 스펙 문자열을 파싱합니다.
    ///
    /// 스코프 패키지(`@scope/name`)의 선행 `@`는 구분자로 취급하지 않습니다.
    /// 파싱된 질의의 `reference`에는 입력 스펙 전체가 기록되어,
    /// 같은 스펙의 반복 질의가 식별 캐시를 공유합니다.
    ///
    /// # 사용 예시
    ///
    /// ```
    /// use depwatch_lookup::types::PackageQuery;
    ///
    /// let q = PackageQuery::parse_spec("left-pad@1.3.0").unwrap();
    /// assert_eq!(q.name, "left-pad");
    /// assert_eq!(q.version.as_deref(), Some("1.3.0"));
    ///
    /// let scoped = PackageQuery::parse_spec("@types/node@20.1.0").unwrap();
    /// assert_eq!(scoped.name, "@types/node");
    /// assert_eq!(scoped.version.as_deref(), Some("20.1.0"));
    /// ```
    ///
    /// # Errors
    ///
    /// 빈 문자열, 빈 이름, 빈 버전(`name@`)은 `LookupError::InvalidSpec`을
    /// 반환합니다.
    pub fn parse_spec(spec: &str) -> Result<Self, LookupError> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(LookupError::InvalidSpec {
                spec: spec.to_owned(),
            });
        }

        // 마지막 '@'에서 분리하되, 첫 문자의 '@'(스코프)는 제외
        let mut split_at = None;
        for (idx, ch) in trimmed.char_indices().skip(1) {
            if ch == '@' {
                split_at = Some(idx);
            }
        }

        let (name, version) = match split_at {
            Some(idx) => (&trimmed[..idx], Some(&trimmed[idx + 1..])),
            None => (trimmed, None),
        };

        if name.is_empty() || version.is_some_and(str::is_empty) {
            return Err(LookupError::InvalidSpec {
                spec: spec.to_owned(),
            });
        }

        Ok(Self {
            name: name.to_owned(),
            version: version.map(str::to_owned),
            source_file: None,
            reference: Some(trimmed.to_owned()),
        })
    }
}

/// 정규화된 패키지 식별자 -- 취약점 조회의 키
///
/// `version`은 구체 버전 문자열이거나, 로컬 설치본을 찾지 못했을 때의
/// 센티널 [`LATEST_VERSION`]입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// 정규화된 패키지명 (설치된 manifest의 선언명)
    pub name: String,
    /// 정규화된 버전
    pub version: String,
}

impl PackageIdentity {
    /// 새 식별자를 생성합니다.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// `latest` 버전 센티널을 가진 식별자를 생성합니다.
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: LATEST_VERSION.to_owned(),
        }
    }

    /// 결과 캐시와 코얼레서가 사용하는 복합 키 `name@version`을 반환합니다.
    ///
    /// 서로 다른 참조 문자열이라도 같은 식별자로 수렴하면 같은 복합 키를
    /// 공유하므로, 캐시 항목과 in-flight 조회가 하나로 합쳐집니다.
    pub fn composite_key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// 취약점 조회 결과 리포트
///
/// probe가 생성하고, 오케스트레이터가 요약을 붙여 캐시합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnReport {
    /// 발견된 취약점이 없으면 true
    pub ok: bool,
    /// 발견된 취약점 목록
    pub findings: Vec<Vulnerability>,
    /// 사람이 읽을 수 있는 요약 (오케스트레이터가 첨부)
    pub summary: Option<String>,
}

impl VulnReport {
    /// 발견 목록으로 리포트를 생성합니다. `ok`는 목록이 비었는지로 결정됩니다.
    pub fn from_findings(findings: Vec<Vulnerability>) -> Self {
        Self {
            ok: findings.is_empty(),
            findings,
            summary: None,
        }
    }

    /// 취약점이 없는 깨끗한 리포트를 생성합니다.
    pub fn clean() -> Self {
        Self::from_findings(Vec::new())
    }

    /// 조회 실패 후 캐시되는 빈 플레이스홀더를 생성합니다.
    ///
    /// 진짜 깨끗한 결과(`ok == true`)와 달리 `ok == false`이며,
    /// 캐시에서는 `ReportState::Failed` 태그로 구분됩니다.
    pub fn placeholder() -> Self {
        Self {
            ok: false,
            findings: Vec::new(),
            summary: None,
        }
    }

    /// 발견 수를 반환합니다.
    pub fn finding_count(&self) -> usize {
        self.findings.len()
    }

    /// 발견 중 가장 높은 심각도를 반환합니다. 발견이 없으면 `Info`입니다.
    pub fn worst_severity(&self) -> Severity {
        self.findings
            .iter()
            .map(|f| f.severity)
            .max()
            .unwrap_or(Severity::Info)
    }
}

/// 파이프라인의 출력 -- 취약점 정보가 주석된 패키지
///
/// 실패는 예외가 아니라 필드로 인코딩됩니다:
///
/// - 식별 실패: `identity == None`, `vulns == None` (미주석 통과)
/// - 조회 실패: `vulns == Some(플레이스홀더)`, `error == Some(메시지)`
/// - 성공: `vulns == Some(리포트)`, `error == None`
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedPackage {
    /// 원본 질의 (수신된 그대로)
    pub query: PackageQuery,
    /// 식별된 정규화 식별자
    pub identity: Option<PackageIdentity>,
    /// 취약점 리포트
    pub vulns: Option<VulnReport>,
    /// 조회 실패 메시지
    pub error: Option<String>,
}

impl AnnotatedPackage {
    /// 식별에 실패한 질의를 미주석 상태로 감쌉니다.
    pub fn unresolved(query: PackageQuery) -> Self {
        Self {
            query,
            identity: None,
            vulns: None,
            error: None,
        }
    }

    /// 조회에 성공한 패키지를 생성합니다.
    pub fn resolved(query: PackageQuery, identity: PackageIdentity, vulns: VulnReport) -> Self {
        Self {
            query,
            identity: Some(identity),
            vulns: Some(vulns),
            error: None,
        }
    }

    /// 조회에 실패한 패키지를 생성합니다. 빈 플레이스홀더 리포트를 첨부합니다.
    pub fn failed(query: PackageQuery, identity: PackageIdentity, error: impl Into<String>) -> Self {
        Self {
            query,
            identity: Some(identity),
            vulns: Some(VulnReport::placeholder()),
            error: Some(error.into()),
        }
    }
}

//! 조회 파이프라인 에러 타입
//!
//! [`LookupError`]는 lookup 모듈 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<LookupError> for DepwatchError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **식별 실패**: `ManifestNotFound`, `UnresolvableReference`, `InvalidSpec`
//!   -- 오케스트레이터가 회복하여 패키지를 미주석 상태로 통과시킵니다.
//! - **속도 제한**: `Debounced` -- 유일하게 호출자까지 전파되는 에러입니다.
//! - **조회 실패**: `TaskFailed`, `TaskStopped`, `Probe`
//!   -- 오케스트레이터가 회복하여 에러 플레이스홀더로 캐시합니다.
//! - **어드바이저리 DB**: `AdvisoryLoad`, `AdvisoryParse`
//! - **설정**: `Config`

use depwatch_core::error::{ConfigError, DepwatchError, LookupFailure};

/// 조회 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// 소스 파일에서 상위로 탐색했지만 manifest를 찾지 못함
    #[error("no manifest found walking up from {path}")]
    ManifestNotFound {
        /// 탐색 시작 경로
        path: String,
    },

    /// 버전도 소스 파일도 없는 참조는 식별할 수 없음
    #[error("reference '{name}' carries no version and no source file")]
    UnresolvableReference {
        /// 요청된 패키지명
        name: String,
    },

    /// 패키지 스펙 문자열 파싱 실패
    #[error("invalid package spec '{spec}' (expected name[@version])")]
    InvalidSpec {
        /// 입력된 스펙 문자열
        spec: String,
    },

    /// 디바운스 윈도우 내 재요청 거부
    ///
    /// 결과가 아니라 거부 신호입니다. 오케스트레이터는 이 에러를
    /// 삼키지 않고 호출자에게 그대로 전파합니다.
    #[error("lookup for '{key}' rate limited: {elapsed_ms}ms since last start, window {window_ms}ms")]
    Debounced {
        /// 거부된 복합 키 (name@version)
        key: String,
        /// 마지막 작업 시작 이후 경과 시간 (밀리초)
        elapsed_ms: u64,
        /// 설정된 디바운스 윈도우 (밀리초)
        window_ms: u64,
    },

    /// 합류한 작업이 에러로 종료됨
    #[error("vulnerability test for '{key}' failed: {message}")]
    TaskFailed {
        /// 복합 키
        key: String,
        /// 원본 에러 메시지
        message: String,
    },

    /// 합류한 작업이 완료 없이 중단됨 (panic 또는 abort)
    #[error("vulnerability test for '{key}' stopped before completion")]
    TaskStopped {
        /// 복합 키
        key: String,
    },

    /// 취약점 probe 실패
    #[error("vulnerability probe failed: {0}")]
    Probe(String),

    /// 어드바이저리 DB 파일 로딩 실패
    #[error("advisory db load error: {path}: {reason}")]
    AdvisoryLoad {
        /// DB 파일/디렉토리 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 어드바이저리 DB JSON 파싱 실패
    #[error("advisory db parse error: {0}")]
    AdvisoryParse(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<LookupError> for DepwatchError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::ManifestNotFound { .. }
            | LookupError::UnresolvableReference { .. }
            | LookupError::InvalidSpec { .. } => {
                DepwatchError::Lookup(LookupFailure::Resolution(err.to_string()))
            }
            LookupError::Debounced { .. } => {
                DepwatchError::Lookup(LookupFailure::RateLimited(err.to_string()))
            }
            LookupError::TaskFailed { .. }
            | LookupError::TaskStopped { .. }
            | LookupError::Probe(_) => DepwatchError::Lookup(LookupFailure::Probe(err.to_string())),
            LookupError::AdvisoryLoad { .. } | LookupError::AdvisoryParse(_) => {
                DepwatchError::Lookup(LookupFailure::AdvisoryDb(err.to_string()))
            }
            LookupError::Config { field, reason } => {
                DepwatchError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

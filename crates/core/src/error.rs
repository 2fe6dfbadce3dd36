//! Depwatch 에러 타입 계층
//!
//! [`DepwatchError`]는 워크스페이스 전체의 최상위 에러 타입입니다.
//! 각 모듈 크레이트는 자체 도메인 에러를 정의하고
//! `From<모듈에러> for DepwatchError` 구현으로 `?` 연산자를 통해
//! 자연스럽게 전파합니다.
//!
//! # 에러 카테고리
//!
//! - **설정**: [`ConfigError`] -- 파일 없음, 파싱 실패, 잘못된 값
//! - **조회 파이프라인**: [`LookupFailure`] -- 식별 실패, 속도 제한, 취약점 조회 실패
//! - **파일 I/O**: `Io`

use thiserror::Error;

/// Depwatch 최상위 에러 타입
///
/// 모든 하위 에러는 `#[from]`으로 이 타입에 수렴합니다.
#[derive(Debug, Error)]
pub enum DepwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 조회 파이프라인 에러
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupFailure),

    /// 파일 I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 로딩/검증 에러
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound {
        /// 조회한 파일 경로
        path: String,
    },

    /// TOML 파싱 실패
    #[error("config parse failed: {reason}")]
    ParseFailed {
        /// 파싱 실패 사유
        reason: String,
    },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue {
        /// 문제가 된 필드명
        field: String,
        /// 거부 사유
        reason: String,
    },
}

/// 조회 파이프라인 에러
///
/// `depwatch-lookup`의 [`LookupError`]가 상위로 전파될 때 이 타입으로
/// 변환됩니다. 변환 구현은 lookup 크레이트 쪽에 있습니다.
///
/// [`LookupError`]: https://docs.rs/depwatch-lookup
#[derive(Debug, Error)]
pub enum LookupFailure {
    /// 패키지 식별(identity resolution) 실패
    #[error("resolution failed: {0}")]
    Resolution(String),

    /// 디바운스 윈도우 내 재요청 거부
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// 취약점 조회(probe) 실패
    #[error("vulnerability probe failed: {0}")]
    Probe(String),

    /// 어드바이저리 DB 로딩/파싱 실패
    #[error("advisory db error: {0}")]
    AdvisoryDb(String),
}

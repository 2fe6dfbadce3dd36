//! 조회 서비스 설정
//!
//! [`depwatch_core::config::LookupConfig`]는 파일에서 읽은 문자열 그대로의
//! 설정이고, 이 모듈의 [`LookupServiceConfig`]는 서비스가 쓰는 파싱된
//! 형태입니다. 심각도는 [`Severity`]로, 간격은 밀리초 정수로 들고 있다가
//! [`debounce_window`](LookupServiceConfig::debounce_window)로 변환합니다.

use std::path::Path;
use std::time::Duration;

use depwatch_core::config::LookupConfig;
use depwatch_core::types::Severity;

use crate::error::LookupError;

/// 어드바이저리 이벤트 채널의 기본 용량
pub const DEFAULT_ADVISORY_CHANNEL_CAPACITY: usize = 256;

// depwatch-core 설정 검증과 동일한 상한
const MAX_DEBOUNCE_WINDOW_MS: u64 = 300_000;
const MAX_PATH_LEN: usize = 4096;

/// 조회 서비스의 런타임 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupServiceConfig {
    /// 로컬 어드바이저리 DB 디렉토리. 빈 문자열이면 빈 DB로 동작합니다.
    pub advisory_db_path: String,
    /// 같은 키 재조회의 최소 간격 (밀리초). 0이면 디바운스하지 않습니다.
    pub debounce_window_ms: u64,
    /// 리포트에 포함할 최소 심각도
    pub min_severity: Severity,
    /// 내부 생성 어드바이저리 채널의 용량
    pub advisory_channel_capacity: usize,
}

impl Default for LookupServiceConfig {
    fn default() -> Self {
        Self::from_core(&LookupConfig::default())
    }
}

impl LookupServiceConfig {
    /// 파일 설정을 런타임 설정으로 변환합니다.
    ///
    /// 심각도 문자열이 인식되지 않으면 `Info`로 동작합니다. 파일 검증을
    /// 거친 설정이라면 이 경우는 발생하지 않습니다.
    pub fn from_core(core: &LookupConfig) -> Self {
        Self {
            advisory_db_path: core.advisory_db_path.clone(),
            debounce_window_ms: core.debounce_window_ms,
            min_severity: Severity::from_str_loose(&core.min_severity).unwrap_or_default(),
            advisory_channel_capacity: DEFAULT_ADVISORY_CHANNEL_CAPACITY,
        }
    }

    /// 디바운스 간격을 [`Duration`]으로 반환합니다.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `debounce_window_ms`: 0-300000
    /// - `advisory_channel_capacity`: 1 이상
    /// - `advisory_db_path`: `..` 경로 순회 금지, 최대 4096자
    pub fn validate(&self) -> Result<(), LookupError> {
        if self.debounce_window_ms > MAX_DEBOUNCE_WINDOW_MS {
            return Err(LookupError::Config {
                field: "debounce_window_ms".to_owned(),
                reason: format!("must be 0-{MAX_DEBOUNCE_WINDOW_MS}"),
            });
        }

        if self.advisory_channel_capacity == 0 {
            return Err(LookupError::Config {
                field: "advisory_channel_capacity".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        if Path::new(&self.advisory_db_path)
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(LookupError::Config {
                field: "advisory_db_path".to_owned(),
                reason: "path contains traversal pattern '..'".to_owned(),
            });
        }

        if self.advisory_db_path.len() > MAX_PATH_LEN {
            return Err(LookupError::Config {
                field: "advisory_db_path".to_owned(),
                reason: format!("path exceeds maximum length {MAX_PATH_LEN}"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LookupServiceConfig::default();
        config.validate().unwrap();
        assert_eq!(config.debounce_window_ms, 2000);
        assert_eq!(config.min_severity, Severity::Info);
        assert_eq!(
            config.advisory_channel_capacity,
            DEFAULT_ADVISORY_CHANNEL_CAPACITY
        );
    }

    #[test]
    fn from_core_parses_severity_loosely() {
        let core = LookupConfig {
            min_severity: "MODERATE".to_owned(),
            ..LookupConfig::default()
        };
        let config = LookupServiceConfig::from_core(&core);
        assert_eq!(config.min_severity, Severity::Medium);
    }

    #[test]
    fn from_core_falls_back_to_info_on_unknown_severity() {
        let core = LookupConfig {
            min_severity: "catastrophic".to_owned(),
            ..LookupConfig::default()
        };
        let config = LookupServiceConfig::from_core(&core);
        assert_eq!(config.min_severity, Severity::Info);
    }

    #[test]
    fn debounce_window_converts_millis() {
        let config = LookupServiceConfig {
            debounce_window_ms: 1500,
            ..LookupServiceConfig::default()
        };
        assert_eq!(config.debounce_window(), Duration::from_millis(1500));
    }

    #[test]
    fn validate_rejects_oversized_window() {
        let config = LookupServiceConfig {
            debounce_window_ms: 300_001,
            ..LookupServiceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LookupError::Config { ref field, .. }) if field == "debounce_window_ms"
        ));
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = LookupServiceConfig {
            advisory_channel_capacity: 0,
            ..LookupServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_path_traversal() {
        let config = LookupServiceConfig {
            advisory_db_path: "../outside".to_owned(),
            ..LookupServiceConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_empty_db_path() {
        let config = LookupServiceConfig {
            advisory_db_path: String::new(),
            ..LookupServiceConfig::default()
        };
        config.validate().unwrap();
    }
}

//! Depwatch 설정 로딩/검증
//!
//! `depwatch.toml` 파일을 읽고, `DEPWATCH_*` 환경변수 오버라이드를 적용한 뒤,
//! 유효성을 검증합니다. 모든 섹션과 필드는 `#[serde(default)]`라서 부분 설정
//! 파일도 허용됩니다.
//!
//! # 로딩 순서
//!
//! 1. [`DepwatchConfig::from_file`] -- TOML 파일 파싱
//! 2. [`DepwatchConfig::apply_env_overrides`] -- 환경변수 적용
//! 3. [`DepwatchConfig::validate`] -- 값 검증
//!
//! # 환경변수 규칙
//!
//! `DEPWATCH_{섹션}_{필드}` 형식의 대문자 키를 사용합니다.
//! 예: `DEPWATCH_GENERAL_LOG_LEVEL`, `DEPWATCH_LOOKUP_DEBOUNCE_WINDOW_MS`

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DepwatchError};
use crate::types::Severity;

/// Depwatch 전체 설정
///
/// # 사용 예시
///
/// ```
/// use depwatch_core::config::DepwatchConfig;
///
/// let config = DepwatchConfig::parse(
///     r#"
///     [lookup]
///     debounce_window_ms = 1500
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.lookup.debounce_window_ms, 1500);
/// assert_eq!(config.general.log_level, "info");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepwatchConfig {
    /// 공통 설정 (로깅)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 조회 파이프라인 설정
    #[serde(default)]
    pub lookup: LookupConfig,
}

/// `[general]` 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// 로그 레벨: trace / debug / info / warn / error
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 로그 출력 형식: pretty / json
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// `[lookup]` 섹션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// 로컬 어드바이저리 DB 디렉토리 경로 (빈 문자열이면 빈 DB로 동작)
    #[serde(default = "default_advisory_db_path")]
    pub advisory_db_path: String,
    /// 같은 패키지 키에 대한 재조회 최소 간격 (밀리초)
    #[serde(default = "default_debounce_window_ms")]
    pub debounce_window_ms: u64,
    /// 리포트에 포함할 최소 심각도
    #[serde(default = "default_min_severity")]
    pub min_severity: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            advisory_db_path: default_advisory_db_path(),
            debounce_window_ms: default_debounce_window_ms(),
            min_severity: default_min_severity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> String {
    "pretty".to_owned()
}

fn default_advisory_db_path() -> String {
    "/var/lib/depwatch/advisory-db".to_owned()
}

fn default_debounce_window_ms() -> u64 {
    2000
}

fn default_min_severity() -> String {
    "info".to_owned()
}

/// 설정 상한값 상수
const MAX_DEBOUNCE_WINDOW_MS: u64 = 300_000; // 5 minutes
const MAX_PATH_LEN: usize = 4096;

impl DepwatchConfig {
    /// 파일 로딩, 환경변수 적용, 검증을 한 번에 수행합니다.
    ///
    /// # Errors
    ///
    /// - `ConfigError::FileNotFound`: 파일이 존재하지 않음
    /// - `ConfigError::ParseFailed`: TOML 파싱 실패
    /// - `ConfigError::InvalidValue`: 검증 실패
    /// - `DepwatchError::Io`: 그 외 I/O 에러
    pub async fn load(path: &Path) -> Result<Self, DepwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 읽습니다. 환경변수와 검증은 적용하지 않습니다.
    pub async fn from_file(path: &Path) -> Result<Self, DepwatchError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DepwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DepwatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, DepwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            DepwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// `DEPWATCH_*` 환경변수 오버라이드를 적용합니다.
    ///
    /// 숫자 필드의 파싱 실패는 경고 로그만 남기고 기존 값을 유지합니다.
    pub fn apply_env_overrides(&mut self) {
        override_string("DEPWATCH_GENERAL_LOG_LEVEL", &mut self.general.log_level);
        override_string("DEPWATCH_GENERAL_LOG_FORMAT", &mut self.general.log_format);
        override_string(
            "DEPWATCH_LOOKUP_ADVISORY_DB_PATH",
            &mut self.lookup.advisory_db_path,
        );
        override_u64(
            "DEPWATCH_LOOKUP_DEBOUNCE_WINDOW_MS",
            &mut self.lookup.debounce_window_ms,
        );
        override_string("DEPWATCH_LOOKUP_MIN_SEVERITY", &mut self.lookup.min_severity);
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `general.log_level`: trace / debug / info / warn / error
    /// - `general.log_format`: pretty / json
    /// - `lookup.debounce_window_ms`: 0-300000 (0이면 디바운스 없음)
    /// - `lookup.min_severity`: [`Severity::from_str_loose`]로 파싱 가능해야 함
    /// - `lookup.advisory_db_path`: `..` 경로 순회 금지, 최대 4096자
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LOG_LEVELS.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!(
                    "'{}' is not one of trace/debug/info/warn/error",
                    self.general.log_level
                ),
            });
        }

        if !matches!(self.general.log_format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("'{}' is not one of pretty/json", self.general.log_format),
            });
        }

        if self.lookup.debounce_window_ms > MAX_DEBOUNCE_WINDOW_MS {
            return Err(ConfigError::InvalidValue {
                field: "lookup.debounce_window_ms".to_owned(),
                reason: format!("must be 0-{MAX_DEBOUNCE_WINDOW_MS}"),
            });
        }

        if Severity::from_str_loose(&self.lookup.min_severity).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "lookup.min_severity".to_owned(),
                reason: format!(
                    "'{}' is not a recognized severity",
                    self.lookup.min_severity
                ),
            });
        }

        // 경로 순회 방지: ".." 컴포넌트 검출
        if Path::new(&self.lookup.advisory_db_path)
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(ConfigError::InvalidValue {
                field: "lookup.advisory_db_path".to_owned(),
                reason: "path contains traversal pattern '..'".to_owned(),
            });
        }

        if self.lookup.advisory_db_path.len() > MAX_PATH_LEN {
            return Err(ConfigError::InvalidValue {
                field: "lookup.advisory_db_path".to_owned(),
                reason: format!("path exceeds maximum length {MAX_PATH_LEN}"),
            });
        }

        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(key: &str, target: &mut String) {
    if let Ok(value) = std::env::var(key) {
        *target = value;
    }
}

fn override_u64(key: &str, target: &mut u64) {
    if let Ok(value) = std::env::var(key) {
        match value.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => {
                warn!(key = %key, value = %value, "ignoring non-numeric env override");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_is_valid() {
        let config = DepwatchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.lookup.debounce_window_ms, 2000);
        assert_eq!(config.lookup.min_severity, "info");
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let config = DepwatchConfig::parse(
            r#"
            [general]
            log_level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "pretty");
        assert_eq!(config.lookup.debounce_window_ms, 2000);
    }

    #[test]
    fn parse_empty_string_yields_defaults() {
        let config = DepwatchConfig::parse("").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn parse_rejects_malformed_toml() {
        let err = DepwatchConfig::parse("[general\nlog_level = ").unwrap_err();
        assert!(matches!(
            err,
            DepwatchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = DepwatchConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "general.log_level"));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = DepwatchConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_too_large_debounce_window() {
        let mut config = DepwatchConfig::default();
        config.lookup.debounce_window_ms = 400_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_zero_debounce_window() {
        let mut config = DepwatchConfig::default();
        config.lookup.debounce_window_ms = 0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_unknown_min_severity() {
        let mut config = DepwatchConfig::default();
        config.lookup.min_severity = "severe".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_loose_min_severity() {
        let mut config = DepwatchConfig::default();
        config.lookup.min_severity = "MODERATE".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_path_traversal_in_db_path() {
        let mut config = DepwatchConfig::default();
        config.lookup.advisory_db_path = "/var/lib/../../etc/passwd".to_owned();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "lookup.advisory_db_path"));
    }

    #[test]
    fn validate_accepts_empty_db_path() {
        let mut config = DepwatchConfig::default();
        config.lookup.advisory_db_path = String::new();
        config.validate().unwrap();
    }

    #[test]
    #[serial]
    fn env_override_replaces_log_level() {
        // SAFETY: 단일 스레드로 직렬화된 테스트에서만 환경변수를 변경합니다.
        unsafe {
            std::env::set_var("DEPWATCH_GENERAL_LOG_LEVEL", "trace");
        }
        let mut config = DepwatchConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.general.log_level, "trace");
        // SAFETY: 위와 동일
        unsafe {
            std::env::remove_var("DEPWATCH_GENERAL_LOG_LEVEL");
        }
    }

    #[test]
    #[serial]
    fn env_override_replaces_debounce_window() {
        // SAFETY: 단일 스레드로 직렬화된 테스트에서만 환경변수를 변경합니다.
        unsafe {
            std::env::set_var("DEPWATCH_LOOKUP_DEBOUNCE_WINDOW_MS", "500");
        }
        let mut config = DepwatchConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.lookup.debounce_window_ms, 500);
        // SAFETY: 위와 동일
        unsafe {
            std::env::remove_var("DEPWATCH_LOOKUP_DEBOUNCE_WINDOW_MS");
        }
    }

    #[test]
    #[serial]
    fn env_override_keeps_value_on_parse_failure() {
        // SAFETY: 단일 스레드로 직렬화된 테스트에서만 환경변수를 변경합니다.
        unsafe {
            std::env::set_var("DEPWATCH_LOOKUP_DEBOUNCE_WINDOW_MS", "not-a-number");
        }
        let mut config = DepwatchConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.lookup.debounce_window_ms, 2000);
        // SAFETY: 위와 동일
        unsafe {
            std::env::remove_var("DEPWATCH_LOOKUP_DEBOUNCE_WINDOW_MS");
        }
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = DepwatchConfig::from_file(Path::new("/nonexistent/depwatch.toml"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DepwatchError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn load_reads_validates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depwatch.toml");
        std::fs::write(
            &path,
            r#"
            [general]
            log_level = "warn"

            [lookup]
            debounce_window_ms = 100
            min_severity = "high"
            "#,
        )
        .unwrap();

        let config = DepwatchConfig::load(&path).await.unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.lookup.debounce_window_ms, 100);
        assert_eq!(config.lookup.min_severity, "high");
    }

    #[tokio::test]
    async fn load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depwatch.toml");
        std::fs::write(
            &path,
            r#"
            [lookup]
            debounce_window_ms = 999999999
            "#,
        )
        .unwrap();

        let err = DepwatchConfig::load(&path).await.unwrap_err();
        assert!(matches!(
            err,
            DepwatchError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}

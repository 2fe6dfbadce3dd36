//! 버전 구간 매칭
//!
//! 권고의 [`VersionRange`]는 반개구간 `[introduced, fixed)`입니다.
//! `introduced`와 같은 버전은 영향을 받고, `fixed`와 같은 버전은 받지
//! 않습니다.
//!
//! 비교 규칙:
//!
//! - 센티널 `latest`는 아직 수정되지 않은 구간(`fixed` 없음)에만
//!   매칭됩니다. 수정판이 나온 취약점은 최신 설치본에 없다고 봅니다.
//! - SemVer로 파싱되는 버전은 SemVer 순서로 비교합니다.
//! - 파싱되지 않는 버전 문자열은 사전순으로 비교합니다 (완화된 근사).
//! - 파싱되지 않는 경계는 무시합니다. 구간을 좁히기보다 넓게 봐서
//!   과소 보고를 피합니다.

use semver::Version;

use crate::advisory::db::VersionRange;
use crate::types::LATEST_VERSION;

/// 버전이 구간 목록 중 하나라도 매칭되는지 판정합니다.
///
/// 빈 목록은 어떤 버전에도 매칭되지 않습니다.
pub fn is_affected(version: &str, ranges: &[VersionRange]) -> bool {
    ranges.iter().any(|range| is_in_range(version, range))
}

fn is_in_range(version: &str, range: &VersionRange) -> bool {
    if version == LATEST_VERSION {
        return range.fixed.is_none();
    }
    match Version::parse(version) {
        Ok(parsed) => is_in_range_semver(&parsed, range),
        Err(_) => is_in_range_lexical(version, range),
    }
}

fn is_in_range_semver(version: &Version, range: &VersionRange) -> bool {
    if let Some(introduced) = &range.introduced
        && let Ok(lower) = Version::parse(introduced)
        && *version < lower
    {
        return false;
    }
    if let Some(fixed) = &range.fixed
        && let Ok(upper) = Version::parse(fixed)
        && *version >= upper
    {
        return false;
    }
    true
}

fn is_in_range_lexical(version: &str, range: &VersionRange) -> bool {
    if let Some(introduced) = &range.introduced
        && version < introduced.as_str()
    {
        return false;
    }
    if let Some(fixed) = &range.fixed
        && version >= fixed.as_str()
    {
        return false;
    }
    true
}

//! 메트릭 이름 상수와 등록
//!
//! 모든 메트릭 이름을 한곳에서 관리합니다. 각 모듈은 `metrics` facade의
//! `counter!` / `histogram!` 매크로에 이 상수를 사용하고, 익스포터를 붙이는
//! 쪽(CLI, 임베더)이 [`describe_all`]을 호출해 설명을 등록합니다.
//!
//! 이름 규칙: `depwatch_{모듈}_{대상}_{단위}`

use metrics::{describe_counter, describe_histogram};

// --- 레이블 키 ---

/// 조회 결과 레이블 (clean / findings / error / debounced / unresolved)
pub const LABEL_RESULT: &str = "result";
/// 심각도 레이블 (info / low / medium / high / critical)
pub const LABEL_SEVERITY: &str = "severity";

// --- 조회 파이프라인 메트릭 ---

/// 전체 조회 횟수 (결과별)
pub const LOOKUPS_TOTAL: &str = "depwatch_lookups_total";
/// 결과 캐시 히트 횟수
pub const LOOKUP_CACHE_HITS_TOTAL: &str = "depwatch_lookup_cache_hits_total";
/// 식별(resolution) 수행 횟수
pub const RESOLVER_RESOLUTIONS_TOTAL: &str = "depwatch_resolver_resolutions_total";
/// 식별 캐시 히트 횟수
pub const RESOLVER_IDENTITY_CACHE_HITS_TOTAL: &str =
    "depwatch_resolver_identity_cache_hits_total";
/// 진행 중인 작업에 합류한 호출 횟수
pub const COALESCER_JOINS_TOTAL: &str = "depwatch_coalescer_joins_total";
/// 디바운스 윈도우로 거부된 호출 횟수
pub const COALESCER_REJECTIONS_TOTAL: &str = "depwatch_coalescer_rejections_total";
/// 취약점 probe 수행 시간 (초)
pub const PROBE_DURATION_SECONDS: &str = "depwatch_probe_duration_seconds";
/// 발행된 어드바이저리 이벤트 수
pub const ADVISORY_EVENTS_TOTAL: &str = "depwatch_advisory_events_total";
/// 발견된 취약점 수 (심각도별)
pub const ADVISORY_FINDINGS_TOTAL: &str = "depwatch_advisory_findings_total";

/// probe 수행 시간 히스토그램 버킷 (초)
pub const PROBE_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// 모든 메트릭의 설명을 등록합니다.
///
/// 익스포터 설치 직후 한 번 호출합니다. 여러 번 호출해도 안전합니다.
pub fn describe_all() {
    describe_counter!(LOOKUPS_TOTAL, "Total package lookups by result");
    describe_counter!(LOOKUP_CACHE_HITS_TOTAL, "Result cache hits");
    describe_counter!(RESOLVER_RESOLUTIONS_TOTAL, "Identity resolutions performed");
    describe_counter!(
        RESOLVER_IDENTITY_CACHE_HITS_TOTAL,
        "Identity cache hits by reference string"
    );
    describe_counter!(
        COALESCER_JOINS_TOTAL,
        "Callers joined to an in-flight coalesced task"
    );
    describe_counter!(
        COALESCER_REJECTIONS_TOTAL,
        "Callers rejected inside the debounce window"
    );
    describe_histogram!(
        PROBE_DURATION_SECONDS,
        "Vulnerability probe duration in seconds"
    );
    describe_counter!(ADVISORY_EVENTS_TOTAL, "Advisory events published");
    describe_counter!(
        ADVISORY_FINDINGS_TOTAL,
        "Vulnerability findings by severity"
    );
}

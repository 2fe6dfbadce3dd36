//! 취약점 리포트 캐시
//!
//! 복합 키(`name@version`)별 조회 상태를 보관합니다. 상태는 명시적 태그로
//! 구분되며, 암묵적 센티널 값(빈 리포트 등)으로 상태를 추론하지 않습니다.
//!
//! 상태 전이:
//!
//! ```text
//! (없음) --begin_lookup--> Pending --insert_ready--> Ready
//!                             |
//!                             +--insert_failed--> Failed --begin_lookup--> Pending
//! ```
//!
//! `Failed`는 진단용 기록일 뿐 재시도를 막지 않습니다. 캐시는 명시적
//! [`clear`](ReportCache::clear) 외에는 비워지지 않습니다.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::types::VulnReport;

/// 키 하나의 조회 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportState {
    /// 조회가 진행 중입니다.
    Pending,
    /// 조회가 성공하여 리포트가 보관되어 있습니다.
    Ready(VulnReport),
    /// 마지막 조회가 실패했습니다. 다음 `begin_lookup`이 재시도를 시작합니다.
    Failed {
        /// 실패 원인 메시지
        message: String,
    },
}

impl ReportState {
    /// 진행 중 상태인지 여부
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// 성공 결과가 보관된 상태인지 여부
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// 실패 기록 상태인지 여부
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// 복합 키별 [`ReportState`]를 보관하는 공유 캐시
///
/// `Clone`은 저장소를 공유합니다. 서비스와 조회 태스크가 각자 클론을 들고
/// 같은 캐시를 갱신합니다.
#[derive(Debug, Clone, Default)]
pub struct ReportCache {
    entries: Arc<Mutex<HashMap<String, ReportState>>>,
}

impl ReportCache {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 조회 시작을 선언합니다.
    ///
    /// 키가 `Ready`이면 보관된 리포트를 반환하고 상태는 바꾸지 않습니다.
    /// 그 외(없음, `Pending`, `Failed`)에는 `Pending`을 기록하고 `None`을
    /// 반환합니다. 확인과 기록이 한 번의 잠금 안에서 일어나므로, 동시
    /// 호출이 서로의 `Ready` 기록을 `Pending`으로 덮어쓰지 못합니다.
    pub async fn begin_lookup(&self, key: &str) -> Option<VulnReport> {
        let mut entries = self.entries.lock().await;
        if let Some(ReportState::Ready(report)) = entries.get(key) {
            return Some(report.clone());
        }
        entries.insert(key.to_owned(), ReportState::Pending);
        None
    }

    /// 성공 리포트를 기록합니다.
    pub async fn insert_ready(&self, key: &str, report: VulnReport) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_owned(), ReportState::Ready(report));
    }

    /// 실패를 기록합니다.
    pub async fn insert_failed(&self, key: &str, message: impl Into<String>) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_owned(),
            ReportState::Failed {
                message: message.into(),
            },
        );
    }

    /// 키 하나를 제거합니다. 디바운스 거절 시 `Pending` 찌꺼기를 치울 때
    /// 사용합니다.
    pub async fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
    }

    /// 캐시 전체를 비웁니다.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        entries.clear();
    }

    /// 상태를 변경 없이 조회합니다.
    pub async fn peek(&self, key: &str) -> Option<ReportState> {
        let entries = self.entries.lock().await;
        entries.get(key).cloned()
    }

    /// 보관 중인 항목 수
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries.len()
    }

    /// 캐시가 비어 있는지 여부
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

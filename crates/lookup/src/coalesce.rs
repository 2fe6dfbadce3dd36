//! 키 단위 태스크 코얼레서
//!
//! 같은 키로 들어온 비동기 작업을 하나로 합치고, 완료 직후의 반복 실행을
//! 최소 간격으로 거절합니다. 키마다 슬롯 하나를 유지합니다:
//!
//! ```text
//! (없음/만료) --start--> Running --성공--> Succeeded --(간격 경과)--> 교체 가능
//!                          |                  |
//!                          | 실패/패닉         +--(간격 내 재호출)--> Debounced
//!                          v
//!                       슬롯 제거 (즉시 재시도 가능)
//! ```
//!
//! - `Running` 슬롯에 도착한 호출은 간격과 무관하게 진행 중인 작업에
//!   합류하여 같은 결과를 받습니다.
//! - 간격은 작업의 **시작** 시각부터 측정합니다. 작업 실행 시간은 다음
//!   실행 가능 시각을 늦추지 않습니다.
//! - 실패한 작업의 에러는 합류한 모든 호출자에게 전파되고, 슬롯은 즉시
//!   제거되어 다음 호출이 바로 재시도할 수 있습니다.
//!
//! 작업은 호출자의 future가 아니라 별도 태스크로 실행되므로, 최초
//! 호출자가 도중에 취소되어도 합류자들은 결과를 받습니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use depwatch_core::metrics::{COALESCER_JOINS_TOTAL, COALESCER_REJECTIONS_TOTAL};

use crate::error::LookupError;

/// 합류자에게 방송되는 작업 결말. `None`은 아직 실행 중임을 뜻합니다.
type TaskSignal<T> = Option<Result<T, TaskFailure>>;

/// 작업 실패의 두 형태
#[derive(Debug, Clone)]
enum TaskFailure {
    /// 작업이 에러를 반환했습니다.
    Failed(String),
    /// 작업이 패닉했거나 결과 없이 중단되었습니다.
    Stopped,
}

#[derive(Debug)]
enum SlotPhase<T> {
    /// 작업 실행 중. 합류자는 이 수신기를 복제해 결과를 기다립니다.
    Running(watch::Receiver<TaskSignal<T>>),
    /// 작업 성공. 간격이 끝날 때까지 새 실행을 거절합니다.
    Succeeded,
}

#[derive(Debug)]
struct Slot<T> {
    started_at: Instant,
    phase: SlotPhase<T>,
}

/// 키 단위로 작업을 합치고 간격을 강제하는 실행기
///
/// `Clone`은 슬롯 맵을 공유합니다. 상태는 전부 인스턴스 안에 있으므로
/// 서비스마다 독립된 코얼레서를 가질 수 있습니다.
pub struct TaskCoalescer<T> {
    slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
}

impl<T> Clone for TaskCoalescer<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> Default for TaskCoalescer<T> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> TaskCoalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// 빈 코얼레서를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// `key`에 대해 `task`를 실행하거나, 진행 중인 실행에 합류합니다.
    ///
    /// # 동작
    ///
    /// - 슬롯이 없거나 마지막 시작으로부터 `min_interval`이 지났으면
    ///   `task`를 호출해 새 실행을 시작합니다.
    /// - 실행 중이면 `task`를 호출하지 않고 그 결과에 합류합니다.
    /// - 직전 실행이 성공했고 간격이 남아 있으면
    ///   [`LookupError::Debounced`]를 반환합니다.
    ///
    /// `min_interval`이 0이면 거절 없이 매번 새로 실행합니다.
    ///
    /// # Errors
    ///
    /// 간격 내 재호출은 `Debounced`, 작업의 에러는 `TaskFailed`, 작업
    /// 패닉이나 결과 없는 중단은 `TaskStopped`로 반환됩니다.
    pub async fn run_coalesced<F, Fut>(
        &self,
        key: &str,
        min_interval: Duration,
        task: F,
    ) -> Result<T, LookupError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LookupError>> + Send + 'static,
    {
        let rx = {
            let mut slots = self.slots.lock().await;

            let joinable = if let Some(slot) = slots.get(key) {
                match &slot.phase {
                    SlotPhase::Running(receiver) => Some(receiver.clone()),
                    SlotPhase::Succeeded => {
                        let elapsed = slot.started_at.elapsed();
                        if elapsed < min_interval {
                            metrics::counter!(COALESCER_REJECTIONS_TOTAL).increment(1);
                            return Err(LookupError::Debounced {
                                key: key.to_owned(),
                                elapsed_ms: u64::try_from(elapsed.as_millis())
                                    .unwrap_or(u64::MAX),
                                window_ms: u64::try_from(min_interval.as_millis())
                                    .unwrap_or(u64::MAX),
                            });
                        }
                        None
                    }
                }
            } else {
                None
            };

            match joinable {
                Some(receiver) => {
                    metrics::counter!(COALESCER_JOINS_TOTAL).increment(1);
                    debug!(key, "joining in-flight task");
                    receiver
                }
                None => {
                    let (tx, receiver) = watch::channel(None);
                    slots.insert(
                        key.to_owned(),
                        Slot {
                            started_at: Instant::now(),
                            phase: SlotPhase::Running(receiver.clone()),
                        },
                    );
                    self.spawn_supervisor(key.to_owned(), tx, task());
                    receiver
                }
            }
        };

        Self::await_outcome(key, rx).await
    }

    /// 작업을 별도 태스크로 실행하고, 종료 시 슬롯을 갱신한 뒤 결과를
    /// 방송하는 감독 태스크를 띄웁니다.
    ///
    /// 순서가 중요합니다: 방송 전에 슬롯을 갱신해야, 결과를 받고 깨어난
    /// 호출자가 보는 슬롯 상태가 이미 결말을 반영하고 있습니다.
    fn spawn_supervisor<Fut>(
        &self,
        key: String,
        tx: watch::Sender<TaskSignal<T>>,
        future: Fut,
    ) where
        Fut: Future<Output = Result<T, LookupError>> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        tokio::spawn(async move {
            let outcome = match tokio::spawn(future).await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => Err(TaskFailure::Failed(error.to_string())),
                Err(join_error) => {
                    if join_error.is_panic() {
                        warn!(key = %key, "lookup task panicked");
                    }
                    Err(TaskFailure::Stopped)
                }
            };

            {
                let mut slots = slots.lock().await;
                match &outcome {
                    Ok(_) => {
                        // started_at은 유지합니다. 간격은 시작 시각 기준입니다.
                        if let Some(slot) = slots.get_mut(&key) {
                            slot.phase = SlotPhase::Succeeded;
                        }
                    }
                    Err(_) => {
                        slots.remove(&key);
                    }
                }
            }

            let _ = tx.send(Some(outcome));
        });
    }

    /// 방송된 결말을 기다려 호출자용 에러 타입으로 변환합니다.
    async fn await_outcome(
        key: &str,
        mut rx: watch::Receiver<TaskSignal<T>>,
    ) -> Result<T, LookupError> {
        loop {
            if let Some(outcome) = rx.borrow_and_update().as_ref() {
                return match outcome {
                    Ok(value) => Ok(value.clone()),
                    Err(TaskFailure::Failed(message)) => Err(LookupError::TaskFailed {
                        key: key.to_owned(),
                        message: message.clone(),
                    }),
                    Err(TaskFailure::Stopped) => Err(LookupError::TaskStopped {
                        key: key.to_owned(),
                    }),
                };
            }
            if rx.changed().await.is_err() {
                // 송신자가 결말 없이 사라졌습니다 (런타임 종료 등).
                return Err(LookupError::TaskStopped {
                    key: key.to_owned(),
                });
            }
        }
    }
}

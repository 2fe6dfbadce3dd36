//! 조회 오케스트레이터
//!
//! 질의 하나가 지나는 경로:
//!
//! ```text
//! PackageQuery
//!     | resolve (spawn_blocking)      실패 -> 미주석 통과
//!     v
//! PackageIdentity -> 복합 키
//!     | begin_lookup                  Ready -> 캐시된 리포트 반환
//!     v
//! TaskCoalescer::run_coalesced        합류/디바운스
//!     | probe + 요약 첨부 + 캐시 기록   (리더 태스크 안에서 한 번만)
//!     v
//! AnnotatedPackage
//! ```
//!
//! [`package_info`](LookupService::package_info)는 디바운스 거절만 에러로
//! 돌려주고, 그 외의 모든 실패는 결과 필드에 담아 `Ok`로 반환합니다.
//!
//! 조회 태스크는 결과를 방송하기 전에 캐시에 `Ready`를 기록하므로,
//! 합류자가 깨어난 시점에는 캐시가 이미 최신입니다. 요약 첨부, 캐시
//! 기록, 어드바이저리 이벤트 방출은 모두 리더 태스크 안에서 일어나
//! 합류자 수와 무관하게 정확히 한 번 수행됩니다.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use depwatch_core::metrics::{
    ADVISORY_EVENTS_TOTAL, ADVISORY_FINDINGS_TOTAL, LABEL_RESULT, LABEL_SEVERITY,
    LOOKUP_CACHE_HITS_TOTAL, LOOKUPS_TOTAL, PROBE_DURATION_SECONDS,
};

use crate::cache::{ReportCache, ReportState};
use crate::coalesce::TaskCoalescer;
use crate::config::LookupServiceConfig;
use crate::error::LookupError;
use crate::event::AdvisoryEvent;
use crate::manifest::ManifestLocator;
use crate::probe::VulnProbe;
use crate::report::render_summary;
use crate::resolver::IdentityResolver;
use crate::types::{AnnotatedPackage, PackageIdentity, PackageQuery, VulnReport};

/// 패키지 취약점 조회 서비스
///
/// 모든 상태(식별 캐시, 리포트 캐시, 디바운스 슬롯)는 인스턴스 안에
/// 있습니다. [`LookupServiceBuilder`]로 생성합니다.
pub struct LookupService<M, P> {
    config: LookupServiceConfig,
    resolver: Arc<IdentityResolver<M>>,
    cache: ReportCache,
    coalescer: TaskCoalescer<VulnReport>,
    probe: Arc<P>,
    advisory_tx: mpsc::Sender<AdvisoryEvent>,
}

impl<M, P> LookupService<M, P>
where
    M: ManifestLocator,
    P: VulnProbe,
{
    /// 빌더를 생성합니다.
    pub fn builder() -> LookupServiceBuilder<M, P> {
        LookupServiceBuilder::new()
    }

    /// 서비스 설정
    pub fn config(&self) -> &LookupServiceConfig {
        &self.config
    }

    /// 질의 하나를 식별하고 취약점을 조회합니다.
    ///
    /// - 식별 실패: 질의를 미주석 상태로 감싸 `Ok`로 반환합니다.
    /// - 캐시 적중: 보관된 리포트로 즉시 반환합니다.
    /// - 조회 실패: 실패를 캐시에 기록하고, 빈 플레이스홀더와 에러
    ///   메시지를 담아 `Ok`로 반환합니다.
    ///
    /// # Errors
    ///
    /// 디바운스 거절([`LookupError::Debounced`])만 에러로 전파됩니다.
    /// 이때 이 호출이 기록한 `Pending`은 제거되어 다음 시도를 막지
    /// 않습니다.
    pub async fn package_info(
        &self,
        query: PackageQuery,
    ) -> Result<AnnotatedPackage, LookupError> {
        let resolver = Arc::clone(&self.resolver);
        let resolve_query = query.clone();
        let resolved =
            tokio::task::spawn_blocking(move || resolver.resolve(&resolve_query)).await;

        let identity = match resolved {
            Ok(Ok(identity)) => identity,
            Ok(Err(error)) => {
                warn!(name = %query.name, error = %error, "package resolution failed");
                metrics::counter!(LOOKUPS_TOTAL, LABEL_RESULT => "unresolved").increment(1);
                return Ok(AnnotatedPackage::unresolved(query));
            }
            Err(join_error) => {
                warn!(name = %query.name, error = %join_error, "resolution task failed");
                metrics::counter!(LOOKUPS_TOTAL, LABEL_RESULT => "unresolved").increment(1);
                return Ok(AnnotatedPackage::unresolved(query));
            }
        };

        let key = identity.composite_key();
        debug!(key = %key, "query");

        if let Some(report) = self.cache.begin_lookup(&key).await {
            metrics::counter!(LOOKUP_CACHE_HITS_TOTAL).increment(1);
            return Ok(AnnotatedPackage::resolved(query, identity, report));
        }

        let outcome = self
            .coalescer
            .run_coalesced(&key, self.config.debounce_window(), || {
                Self::lookup_task(
                    key.clone(),
                    identity.clone(),
                    Arc::clone(&self.probe),
                    self.cache.clone(),
                    self.advisory_tx.clone(),
                )
            })
            .await;

        match outcome {
            Ok(report) => {
                let result = if report.ok { "clean" } else { "findings" };
                metrics::counter!(LOOKUPS_TOTAL, LABEL_RESULT => result).increment(1);
                Ok(AnnotatedPackage::resolved(query, identity, report))
            }
            Err(error @ LookupError::Debounced { .. }) => {
                // 거절된 호출이 남긴 Pending을 치웁니다.
                self.cache.remove(&key).await;
                metrics::counter!(LOOKUPS_TOTAL, LABEL_RESULT => "debounced").increment(1);
                Err(error)
            }
            Err(error) => {
                warn!(key = %key, error = %error, "vulnerability test failed");
                let message = error.to_string();
                self.cache.insert_failed(&key, message.clone()).await;
                metrics::counter!(LOOKUPS_TOTAL, LABEL_RESULT => "error").increment(1);
                Ok(AnnotatedPackage::failed(query, identity, message))
            }
        }
    }

    /// 리더 태스크 본문. probe 호출부터 이벤트 방출까지 한 번만 수행합니다.
    async fn lookup_task(
        key: String,
        identity: PackageIdentity,
        probe: Arc<P>,
        cache: ReportCache,
        advisory_tx: mpsc::Sender<AdvisoryEvent>,
    ) -> Result<VulnReport, LookupError> {
        let started = Instant::now();
        let result = probe.probe(&identity).await;
        metrics::histogram!(PROBE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let mut report = result?;
        report.summary = Some(render_summary(&key, &report));

        // 방송보다 먼저 기록해야 합류자가 깨어났을 때 캐시가 최신입니다.
        cache.insert_ready(&key, report.clone()).await;
        info!(key = %key, findings = report.finding_count(), "vulnerability test complete");

        for finding in &report.findings {
            metrics::counter!(
                ADVISORY_FINDINGS_TOTAL,
                LABEL_SEVERITY => finding.severity.to_string().to_lowercase()
            )
            .increment(1);
        }

        if !report.ok {
            metrics::counter!(ADVISORY_EVENTS_TOTAL).increment(1);
            let event = AdvisoryEvent::new(key.clone(), &report);
            if let Err(error) = advisory_tx.try_send(event) {
                warn!(key = %key, error = %error, "advisory channel full, dropping event");
            }
        }

        Ok(report)
    }

    /// 식별 캐시와 리포트 캐시를 비웁니다.
    ///
    /// 프로젝트 루트 캐시와 디바운스 슬롯은 유지됩니다. 캐시를 비워도
    /// 간격이 남은 키의 재조회는 디바운스 거절될 수 있습니다.
    pub async fn clear_caches(&self) {
        self.resolver.clear_identities();
        self.cache.clear().await;
        debug!("lookup caches cleared");
    }

    /// 복합 키의 캐시 상태를 변경 없이 조회합니다.
    pub async fn peek_cached(&self, key: &str) -> Option<ReportState> {
        self.cache.peek(key).await
    }
}

/// [`LookupService`] 빌더
///
/// locator와 probe는 필수입니다. 어드바이저리 채널은 외부 송신단을
/// 넘기거나, 생략하여 내부 생성 채널의 수신단을 돌려받습니다.
pub struct LookupServiceBuilder<M, P> {
    config: LookupServiceConfig,
    locator: Option<M>,
    probe: Option<P>,
    advisory_tx: Option<mpsc::Sender<AdvisoryEvent>>,
}

impl<M, P> Default for LookupServiceBuilder<M, P> {
    fn default() -> Self {
        Self {
            config: LookupServiceConfig::default(),
            locator: None,
            probe: None,
            advisory_tx: None,
        }
    }
}

impl<M, P> LookupServiceBuilder<M, P>
where
    M: ManifestLocator,
    P: VulnProbe,
{
    /// 기본 설정의 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 서비스 설정을 지정합니다.
    #[must_use]
    pub fn config(mut self, config: LookupServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// manifest locator를 지정합니다. (필수)
    #[must_use]
    pub fn locator(mut self, locator: M) -> Self {
        self.locator = Some(locator);
        self
    }

    /// 취약점 probe를 지정합니다. (필수)
    #[must_use]
    pub fn probe(mut self, probe: P) -> Self {
        self.probe = Some(probe);
        self
    }

    /// 외부 어드바이저리 송신단을 지정합니다. 지정하면 `build`는
    /// 수신단을 돌려주지 않습니다.
    #[must_use]
    pub fn advisory_sender(mut self, sender: mpsc::Sender<AdvisoryEvent>) -> Self {
        self.advisory_tx = Some(sender);
        self
    }

    /// 서비스를 조립합니다.
    ///
    /// # Errors
    ///
    /// 설정 검증 실패, locator/probe 누락 시 [`LookupError::Config`]를
    /// 반환합니다.
    pub fn build(
        self,
    ) -> Result<(LookupService<M, P>, Option<mpsc::Receiver<AdvisoryEvent>>), LookupError> {
        self.config.validate()?;

        let locator = self.locator.ok_or_else(|| LookupError::Config {
            field: "locator".to_owned(),
            reason: "manifest locator is required".to_owned(),
        })?;
        let probe = self.probe.ok_or_else(|| LookupError::Config {
            field: "probe".to_owned(),
            reason: "vulnerability probe is required".to_owned(),
        })?;

        let (advisory_tx, advisory_rx) = match self.advisory_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.advisory_channel_capacity);
                (tx, Some(rx))
            }
        };

        let service = LookupService {
            resolver: Arc::new(IdentityResolver::new(locator)),
            cache: ReportCache::new(),
            coalescer: TaskCoalescer::new(),
            probe: Arc::new(probe),
            advisory_tx,
            config: self.config,
        };
        Ok((service, advisory_rx))
    }
}

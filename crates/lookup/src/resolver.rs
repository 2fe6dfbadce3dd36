//! 패키지 식별
//!
//! 원시 질의([`PackageQuery`])를 정규화된 식별자([`PackageIdentity`])로
//! 변환합니다. 버전이 명시된 질의는 그대로 통과하고, 나머지는 로컬
//! 설치본에서 버전을 찾습니다:
//!
//! 1. 소스 파일에서 위로 걸어 올라가 가장 가까운 manifest의 디렉토리를
//!    프로젝트 루트로 삼습니다. 루트는 소스 경로별로 메모이즈됩니다.
//! 2. `<루트>/node_modules/<이름>` 또는 그 위의 가장 가까운 manifest를
//!    찾습니다.
//! 3. 선언된 이름이 요청된 이름으로 시작하면(대소문자 무시) 선언된
//!    이름과 버전을 쓰고, 아니면 `요청명@latest`로 둡니다.
//!
//! 참조 문자열이 있는 질의의 식별 결과는 참조별로 메모이즈됩니다. 실패는
//! 메모이즈하지 않으므로 일시적인 파일시스템 문제 후 재시도가 됩니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use depwatch_core::metrics::{RESOLVER_IDENTITY_CACHE_HITS_TOTAL, RESOLVER_RESOLUTIONS_TOTAL};

use crate::error::LookupError;
use crate::manifest::{ManifestInfo, ManifestLocator};
use crate::types::{PackageIdentity, PackageQuery};

/// 질의를 식별자로 변환하는 동기 리졸버
///
/// [`resolve`](Self::resolve)는 locator를 통해 블로킹 파일시스템 접근을
/// 하므로, 비동기 런타임에서는 `tokio::task::spawn_blocking` 안에서
/// 호출해야 합니다.
pub struct IdentityResolver<M> {
    locator: M,
    /// 참조 문자열 -> 식별 결과
    identities: Mutex<HashMap<String, PackageIdentity>>,
    /// 소스 파일 경로 -> 프로젝트 루트 디렉토리
    project_roots: Mutex<HashMap<PathBuf, PathBuf>>,
}

impl<M: ManifestLocator> IdentityResolver<M> {
    /// locator로 리졸버를 생성합니다.
    pub fn new(locator: M) -> Self {
        Self {
            locator,
            identities: Mutex::new(HashMap::new()),
            project_roots: Mutex::new(HashMap::new()),
        }
    }

    /// 질의를 식별자로 변환합니다.
    ///
    /// 버전이 명시된 질의는 캐시와 파일시스템을 모두 건너뜁니다. 참조
    /// 문자열이 있는 질의는 성공한 식별 결과를 메모이즈합니다.
    ///
    /// # Errors
    ///
    /// - `UnresolvableReference`: 버전도 소스 파일도 없는 질의
    /// - `ManifestNotFound`: 소스 파일 위로 manifest가 하나도 없음
    pub fn resolve(&self, query: &PackageQuery) -> Result<PackageIdentity, LookupError> {
        if let Some(version) = &query.version {
            return Ok(PackageIdentity::new(query.name.clone(), version.clone()));
        }

        match &query.reference {
            Some(reference) => {
                if let Some(hit) = lock(&self.identities).get(reference) {
                    metrics::counter!(RESOLVER_IDENTITY_CACHE_HITS_TOTAL).increment(1);
                    return Ok(hit.clone());
                }
                let identity = self.resolve_uncached(query)?;
                lock(&self.identities).insert(reference.clone(), identity.clone());
                Ok(identity)
            }
            None => self.resolve_uncached(query),
        }
    }

    /// 파일시스템을 통해 설치된 버전을 찾습니다.
    fn resolve_uncached(&self, query: &PackageQuery) -> Result<PackageIdentity, LookupError> {
        let source = query
            .source_file
            .as_deref()
            .ok_or_else(|| LookupError::UnresolvableReference {
                name: query.name.clone(),
            })?;

        let root = self.project_root(source)?;
        let installed = root.join("node_modules").join(&query.name);
        let identity = match self.locator.locate_up(&installed) {
            Some(info) => identity_from_manifest(&query.name, info),
            // 루트 manifest조차 다시 찾지 못하면 설치 정보가 없는 것입니다.
            None => PackageIdentity::latest(query.name.clone()),
        };

        metrics::counter!(RESOLVER_RESOLUTIONS_TOTAL).increment(1);
        debug!(name = %query.name, identity = %identity, "package resolved");
        Ok(identity)
    }

    /// 소스 파일의 프로젝트 루트를 찾습니다. 경로별로 메모이즈됩니다.
    fn project_root(&self, source: &Path) -> Result<PathBuf, LookupError> {
        if let Some(root) = lock(&self.project_roots).get(source) {
            return Ok(root.clone());
        }

        // 잠금을 쥐지 않고 걷습니다. 같은 경로의 동시 탐색은 중복 수행될
        // 수 있지만 먼저 기록한 결과가 유지됩니다.
        let info = self
            .locator
            .locate_up(source)
            .ok_or_else(|| LookupError::ManifestNotFound {
                path: source.display().to_string(),
            })?;

        let mut roots = lock(&self.project_roots);
        let root = roots
            .entry(source.to_path_buf())
            .or_insert(info.directory)
            .clone();
        Ok(root)
    }

    /// 참조별 식별 캐시를 비웁니다. 프로젝트 루트 캐시는 유지됩니다.
    pub fn clear_identities(&self) {
        lock(&self.identities).clear();
    }

    /// 메모이즈된 식별 결과 수
    pub fn identity_count(&self) -> usize {
        lock(&self.identities).len()
    }

    /// 메모이즈된 프로젝트 루트 수
    pub fn project_root_count(&self) -> usize {
        lock(&self.project_roots).len()
    }
}

/// 설치된 manifest에서 식별자를 만듭니다.
///
/// 선언된 이름이 요청된 이름으로 시작하는지 비교할 때 양쪽을 모두
/// 소문자로 바꿉니다. 선언된 manifest에 버전이 없으면 설치 정보가
/// 불완전한 것이므로 `요청명@latest`로 둡니다.
fn identity_from_manifest(requested: &str, info: ManifestInfo) -> PackageIdentity {
    let requested_lower = requested.to_lowercase();
    if let Some(declared) = info.name
        && declared.to_lowercase().starts_with(&requested_lower)
        && let Some(version) = info.version
    {
        return PackageIdentity::new(declared, version);
    }
    PackageIdentity::latest(requested)
}

fn lock<K, V>(mutex: &Mutex<HashMap<K, V>>) -> MutexGuard<'_, HashMap<K, V>> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 고정된 경로 -> manifest 매핑으로 동작하는 locator.
    /// 상위 경로로 걸어 올라가는 동작은 실제 구현과 같습니다.
    struct StaticLocator {
        hits: HashMap<PathBuf, ManifestInfo>,
        calls: Arc<AtomicU32>,
    }

    impl StaticLocator {
        fn new(entries: Vec<(&str, ManifestInfo)>) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let locator = Self {
                hits: entries
                    .into_iter()
                    .map(|(path, info)| (PathBuf::from(path), info))
                    .collect(),
                calls: Arc::clone(&calls),
            };
            (locator, calls)
        }
    }

    impl ManifestLocator for StaticLocator {
        fn locate_up(&self, start: &Path) -> Option<ManifestInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            start
                .ancestors()
                .find_map(|ancestor| self.hits.get(ancestor).cloned())
        }
    }

    fn manifest(dir: &str, name: Option<&str>, version: Option<&str>) -> ManifestInfo {
        ManifestInfo {
            directory: PathBuf::from(dir),
            name: name.map(str::to_owned),
            version: version.map(str::to_owned),
        }
    }

    fn project_with_package(
        declared: Option<&str>,
        version: Option<&str>,
    ) -> (StaticLocator, Arc<AtomicU32>) {
        StaticLocator::new(vec![
            ("/proj", manifest("/proj", Some("my-app"), Some("0.1.0"))),
            (
                "/proj/node_modules/left-pad",
                manifest("/proj/node_modules/left-pad", declared, version),
            ),
        ])
    }

    #[test]
    fn fully_specified_query_skips_locator() {
        let (locator, calls) = StaticLocator::new(vec![]);
        let resolver = IdentityResolver::new(locator);

        let identity = resolver
            .resolve(&PackageQuery::specified("left-pad", "1.3.0"))
            .unwrap();

        assert_eq!(identity, PackageIdentity::new("left-pad", "1.3.0"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn query_without_version_or_source_is_unresolvable() {
        let (locator, _) = StaticLocator::new(vec![]);
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::parse_spec("left-pad").unwrap();

        let err = resolver.resolve(&query).unwrap_err();
        assert!(matches!(
            err,
            LookupError::UnresolvableReference { name } if name == "left-pad"
        ));
    }

    #[test]
    fn missing_project_manifest_errors() {
        let (locator, _) = StaticLocator::new(vec![]);
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js");

        let err = resolver.resolve(&query).unwrap_err();
        assert!(matches!(err, LookupError::ManifestNotFound { .. }));
    }

    #[test]
    fn installed_manifest_supplies_name_and_version() {
        let (locator, _) = project_with_package(Some("left-pad"), Some("1.0.5"));
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js");

        let identity = resolver.resolve(&query).unwrap();
        assert_eq!(identity, PackageIdentity::new("left-pad", "1.0.5"));
    }

    #[test]
    fn declared_prefix_match_is_case_insensitive() {
        let (locator, _) = project_with_package(Some("Left-Pad-Fork"), Some("2.0.0"));
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js");

        let identity = resolver.resolve(&query).unwrap();
        // 선언된 이름이 요청명으로 시작하므로 선언된 쪽을 신뢰합니다.
        assert_eq!(identity, PackageIdentity::new("Left-Pad-Fork", "2.0.0"));
    }

    #[test]
    fn unrelated_declared_name_falls_back_to_latest() {
        let (locator, _) = project_with_package(Some("totally-different"), Some("9.9.9"));
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js");

        let identity = resolver.resolve(&query).unwrap();
        assert_eq!(identity, PackageIdentity::latest("left-pad"));
    }

    #[test]
    fn declared_without_version_falls_back_to_latest() {
        let (locator, _) = project_with_package(Some("left-pad"), None);
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js");

        let identity = resolver.resolve(&query).unwrap();
        assert_eq!(identity, PackageIdentity::latest("left-pad"));
    }

    #[test]
    fn missing_installed_package_falls_back_to_latest() {
        // node_modules 항목이 없으면 걷기가 루트 manifest까지 올라가는데,
        // 루트의 이름은 요청명과 무관하므로 latest가 됩니다.
        let (locator, _) = StaticLocator::new(vec![(
            "/proj",
            manifest("/proj", Some("my-app"), Some("0.1.0")),
        )]);
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js");

        let identity = resolver.resolve(&query).unwrap();
        assert_eq!(identity, PackageIdentity::latest("left-pad"));
    }

    #[test]
    fn reference_memoizes_identity() {
        let (locator, calls) = project_with_package(Some("left-pad"), Some("1.0.5"));
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js")
            .with_reference("left-pad");

        let first = resolver.resolve(&query).unwrap();
        let after_first = calls.load(Ordering::SeqCst);
        let second = resolver.resolve(&query).unwrap();

        assert_eq!(first, second);
        // 두 번째 호출은 locator를 전혀 쓰지 않습니다.
        assert_eq!(calls.load(Ordering::SeqCst), after_first);
        assert_eq!(resolver.identity_count(), 1);
    }

    #[test]
    fn no_reference_resolves_every_time() {
        let (locator, calls) = project_with_package(Some("left-pad"), Some("1.0.5"));
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js");

        // 1회차: 루트 걷기 + 설치본 걷기 = 2회
        resolver.resolve(&query).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // 2회차: 루트는 메모이즈되어 설치본 걷기만 = 1회
        resolver.resolve(&query).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(resolver.identity_count(), 0);
    }

    #[test]
    fn project_root_memoized_per_exact_path() {
        let (locator, calls) = project_with_package(Some("left-pad"), Some("1.0.5"));
        let resolver = IdentityResolver::new(locator);

        resolver
            .resolve(&PackageQuery::from_source("left-pad", "/proj/src/a.js"))
            .unwrap();
        // 같은 루트라도 소스 경로가 다르면 다시 걷습니다.
        resolver
            .resolve(&PackageQuery::from_source("left-pad", "/proj/src/b.js"))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(resolver.project_root_count(), 2);
    }

    #[test]
    fn clear_identities_keeps_project_roots() {
        let (locator, calls) = project_with_package(Some("left-pad"), Some("1.0.5"));
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js")
            .with_reference("left-pad");

        resolver.resolve(&query).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        resolver.clear_identities();
        assert_eq!(resolver.identity_count(), 0);
        assert_eq!(resolver.project_root_count(), 1);

        // 식별 캐시는 비었지만 루트 캐시는 살아 있어 설치본 걷기만 수행합니다.
        resolver.resolve(&query).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_resolution_is_not_memoized() {
        let (locator, _) = StaticLocator::new(vec![]);
        let resolver = IdentityResolver::new(locator);
        let query = PackageQuery::from_source("left-pad", "/proj/src/a.js")
            .with_reference("left-pad");

        assert!(resolver.resolve(&query).is_err());
        assert_eq!(resolver.identity_count(), 0);
        assert_eq!(resolver.project_root_count(), 0);
    }
}

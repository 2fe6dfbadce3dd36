//! Integration tests for the `depwatch check` pipeline.
//!
//! Assembles the lookup service exactly as the check command does: a real
//! advisory database directory on disk, the filesystem manifest locator,
//! and the advisory probe.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use depwatch_core::types::Severity;
use depwatch_lookup::{
    AdvisoryDb, AdvisoryDbProbe, AdvisoryEvent, FsManifestLocator, LookupService,
    LookupServiceConfig, PackageQuery,
};

const LEFT_PAD_ADVISORY: &str = r#"[
    {
        "advisory_id": "GHSA-wf5p-g6vw-rhxx",
        "package": "left-pad",
        "affected_ranges": [{ "introduced": "1.0.0", "fixed": "1.3.0" }],
        "fixed_version": "1.3.0",
        "severity": "high",
        "description": "prototype pollution"
    },
    {
        "advisory_id": "GHSA-lowl-owlo-wlow",
        "package": "minimist",
        "affected_ranges": [{ "fixed": "1.2.6" }],
        "fixed_version": "1.2.6",
        "severity": "low",
        "description": "argument injection"
    }
]"#;

fn write_advisory_db(dir: &Path) {
    fs::write(dir.join("advisories.json"), LEFT_PAD_ADVISORY).expect("should write advisory file");
}

fn build_service(
    db_dir: &Path,
    min_severity: Severity,
) -> (
    LookupService<FsManifestLocator, AdvisoryDbProbe>,
    tokio::sync::mpsc::Receiver<AdvisoryEvent>,
) {
    let db = AdvisoryDb::load_from_dir(db_dir).expect("advisory db should load");
    let probe = AdvisoryDbProbe::new(Arc::new(db), min_severity);
    let config = LookupServiceConfig {
        debounce_window_ms: 0,
        min_severity,
        ..LookupServiceConfig::default()
    };
    let (service, rx) = LookupService::builder()
        .config(config)
        .locator(FsManifestLocator::new())
        .probe(probe)
        .build()
        .expect("service should build");
    (service, rx.expect("builder should hand back the receiver"))
}

#[tokio::test]
async fn test_check_pipeline_reports_findings() {
    // Given: An advisory database with a left-pad advisory
    let db_dir = TempDir::new().expect("should create temp dir");
    write_advisory_db(db_dir.path());
    let (service, mut advisory_rx) = build_service(db_dir.path(), Severity::Info);

    // When: Checking an affected version
    let query = PackageQuery::parse_spec("left-pad@1.0.5").expect("spec should parse");
    let annotated = service
        .package_info(query)
        .await
        .expect("lookup should succeed");

    // Then: The report carries the finding and an advisory event is queued
    let vulns = annotated.vulns.expect("report should be attached");
    assert!(!vulns.ok, "affected version should not be clean");
    assert_eq!(vulns.finding_count(), 1);
    assert_eq!(vulns.findings[0].advisory_id, "GHSA-wf5p-g6vw-rhxx");
    assert_eq!(vulns.findings[0].affected_version, "1.0.5");
    let summary = vulns.summary.expect("summary should be attached");
    assert!(summary.contains("left-pad@1.0.5"));

    let event = advisory_rx.try_recv().expect("advisory event should be queued");
    assert_eq!(event.package, "left-pad@1.0.5");
    assert_eq!(event.worst_severity, Severity::High);
}

#[tokio::test]
async fn test_check_pipeline_clean_version() {
    // Given: An advisory database with a left-pad advisory fixed at 1.3.0
    let db_dir = TempDir::new().expect("should create temp dir");
    write_advisory_db(db_dir.path());
    let (service, mut advisory_rx) = build_service(db_dir.path(), Severity::Info);

    // When: Checking a version at the fix boundary
    let query = PackageQuery::parse_spec("left-pad@1.3.0").expect("spec should parse");
    let annotated = service
        .package_info(query)
        .await
        .expect("lookup should succeed");

    // Then: The report is clean and no event is emitted
    let vulns = annotated.vulns.expect("report should be attached");
    assert!(vulns.ok, "fixed version should be clean");
    assert!(
        advisory_rx.try_recv().is_err(),
        "clean lookups emit no advisory event"
    );
}

#[tokio::test]
async fn test_check_min_severity_filters_findings() {
    // Given: A low-severity minimist advisory and a High severity floor
    let db_dir = TempDir::new().expect("should create temp dir");
    write_advisory_db(db_dir.path());
    let (service, _advisory_rx) = build_service(db_dir.path(), Severity::High);

    // When: Checking an affected minimist version
    let query = PackageQuery::parse_spec("minimist@1.2.0").expect("spec should parse");
    let annotated = service
        .package_info(query)
        .await
        .expect("lookup should succeed");

    // Then: The low finding is below the floor and the report is clean
    let vulns = annotated.vulns.expect("report should be attached");
    assert!(vulns.ok, "findings below the severity floor should be dropped");
}

#[tokio::test]
async fn test_check_missing_db_dir_runs_with_empty_db() {
    // Given: A database directory that does not exist
    let db_dir = TempDir::new().expect("should create temp dir");
    let missing = db_dir.path().join("does-not-exist");
    let (service, _advisory_rx) = build_service(&missing, Severity::Info);

    // When: Checking any package
    let query = PackageQuery::parse_spec("left-pad@1.0.5").expect("spec should parse");
    let annotated = service
        .package_info(query)
        .await
        .expect("lookup should succeed");

    // Then: The empty database reports every package clean
    let vulns = annotated.vulns.expect("report should be attached");
    assert!(vulns.ok, "empty database should report clean");
}

#[tokio::test]
async fn test_check_unversioned_spec_resolves_through_project() {
    // Given: A project with left-pad 1.0.5 installed under node_modules
    let project = TempDir::new().expect("should create temp dir");
    fs::write(
        project.path().join("package.json"),
        r#"{ "name": "demo-app", "version": "0.1.0" }"#,
    )
    .expect("should write project manifest");
    fs::create_dir_all(project.path().join("src")).expect("should create src dir");
    fs::write(project.path().join("src/index.js"), "require('left-pad');")
        .expect("should write source file");
    let installed = project.path().join("node_modules/left-pad");
    fs::create_dir_all(&installed).expect("should create package dir");
    fs::write(
        installed.join("package.json"),
        r#"{ "name": "left-pad", "version": "1.0.5" }"#,
    )
    .expect("should write package manifest");

    let db_dir = TempDir::new().expect("should create temp dir");
    write_advisory_db(db_dir.path());
    let (service, _advisory_rx) = build_service(db_dir.path(), Severity::Info);

    // When: Checking an unversioned spec with a source file for context
    let query = PackageQuery::parse_spec("left-pad")
        .expect("spec should parse")
        .with_source_file(project.path().join("src/index.js"));
    let annotated = service
        .package_info(query)
        .await
        .expect("lookup should succeed");

    // Then: The installed version is resolved and matched against the db
    let identity = annotated.identity.expect("identity should resolve");
    assert_eq!(identity.version, "1.0.5");
    let vulns = annotated.vulns.expect("report should be attached");
    assert_eq!(vulns.finding_count(), 1, "installed version is affected");
}

//! `depwatch check` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use depwatch_core::types::Severity;
use depwatch_lookup::{
    AdvisoryDb, AdvisoryDbProbe, AdvisoryEvent, AnnotatedPackage, FsManifestLocator, LookupService,
    LookupServiceConfig, PackageQuery, SeverityCounts,
};

use crate::cli::CheckArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
pub async fn execute(
    args: CheckArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = super::load_config_or_default(config_path).await?;

    // Build service config from core config, then apply CLI overrides
    let mut service_config = LookupServiceConfig::from_core(&config.lookup);
    if let Some(db) = &args.db {
        service_config.advisory_db_path = db.display().to_string();
    }
    if let Some(min_severity) = &args.min_severity {
        service_config.min_severity = parse_severity(min_severity)?;
    }

    let queries = build_queries(&args)?;

    // Advisory db load is blocking file IO
    let db_path = service_config.advisory_db_path.clone();
    let db = tokio::task::spawn_blocking(move || AdvisoryDb::load_from_dir(Path::new(&db_path)))
        .await
        .map_err(|e| CliError::Command(format!("advisory db load task failed: {e}")))??;

    let probe = AdvisoryDbProbe::new(Arc::new(db), service_config.min_severity);
    let (service, advisory_rx) = LookupService::builder()
        .config(service_config)
        .locator(FsManifestLocator::new())
        .probe(probe)
        .build()?;

    let mut packages = Vec::with_capacity(queries.len());
    for query in queries {
        debug!(name = %query.name, "checking package");
        packages.push(service.package_info(query).await?);
    }

    // Lookups have completed, so every emitted event is already queued.
    let mut advisories = Vec::new();
    if let Some(mut rx) = advisory_rx {
        while let Ok(event) = rx.try_recv() {
            advisories.push(event);
        }
    }

    let report = build_check_report(packages, advisories);

    writer.render(&report)?;

    // Return error if vulnerabilities found (exit code 4)
    if report.totals.total() > 0 {
        return Err(CliError::Findings(format!(
            "found {} vulnerability findings",
            report.totals.total()
        )));
    }

    Ok(())
}

/// Parse each spec and attach the source file to specs that still need
/// project context to resolve.
fn build_queries(args: &CheckArgs) -> Result<Vec<PackageQuery>, CliError> {
    let mut queries = Vec::with_capacity(args.specs.len());
    for spec in &args.specs {
        let query = PackageQuery::parse_spec(spec).map_err(|e| CliError::Command(e.to_string()))?;
        let query = match (&args.file, query.is_fully_specified()) {
            (Some(file), false) => query.with_source_file(file.clone()),
            _ => query,
        };
        queries.push(query);
    }
    Ok(queries)
}

fn parse_severity(s: &str) -> Result<Severity, CliError> {
    Severity::from_str_loose(s).ok_or_else(|| {
        CliError::Command(format!(
            "invalid severity: {s} (expected: info, low, medium, high, critical)"
        ))
    })
}

fn build_check_report(
    packages: Vec<AnnotatedPackage>,
    advisories: Vec<AdvisoryEvent>,
) -> CheckReport {
    let mut totals = SeverityCounts::default();
    let mut unresolved = 0;
    let mut failed = 0;

    for package in &packages {
        if package.identity.is_none() {
            unresolved += 1;
            continue;
        }
        if package.error.is_some() {
            failed += 1;
        }
        if let Some(vulns) = &package.vulns {
            totals.merge(&SeverityCounts::tally(&vulns.findings));
        }
    }

    CheckReport {
        checked: packages.len(),
        unresolved,
        failed,
        totals,
        packages,
        advisories,
    }
}

#[derive(Serialize)]
pub struct CheckReport {
    pub checked: usize,
    pub unresolved: usize,
    pub failed: usize,
    pub totals: SeverityCounts,
    pub packages: Vec<AnnotatedPackage>,
    pub advisories: Vec<AdvisoryEvent>,
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Checked {} package(s)", self.checked)?;
        if self.unresolved > 0 {
            writeln!(w, "Unresolved: {}", self.unresolved.to_string().yellow())?;
        }
        if self.failed > 0 {
            writeln!(w, "Failed lookups: {}", self.failed.to_string().red())?;
        }

        let totals_str = format!(
            "{} total (C:{} H:{} M:{} L:{} I:{})",
            self.totals.total(),
            self.totals.critical,
            self.totals.high,
            self.totals.medium,
            self.totals.low,
            self.totals.info
        );
        if self.totals.total() > 0 {
            writeln!(w, "Findings: {}", totals_str.red().bold())?;
        } else {
            writeln!(w, "Findings: {}", totals_str.green().bold())?;
        }
        writeln!(w)?;

        for package in &self.packages {
            render_package(w, package)?;
        }

        Ok(())
    }
}

fn render_package(w: &mut dyn Write, package: &AnnotatedPackage) -> std::io::Result<()> {
    use colored::Colorize;

    let Some(identity) = &package.identity else {
        writeln!(
            w,
            "{}  {} (unresolved: no version and no usable source context)",
            "?".yellow().bold(),
            package.query.name
        )?;
        return Ok(());
    };

    let key = identity.composite_key();

    if let Some(error) = &package.error {
        writeln!(w, "{}  {} -- lookup failed: {}", "!".red().bold(), key.bold(), error)?;
        return Ok(());
    }

    let Some(vulns) = &package.vulns else {
        return Ok(());
    };

    if vulns.ok {
        writeln!(
            w,
            "{}  {} -- no known vulnerabilities",
            "ok".green(),
            key.bold()
        )?;
        return Ok(());
    }

    writeln!(
        w,
        "{}  {} -- {} finding(s)",
        "!!".red().bold(),
        key.bold(),
        vulns.finding_count()
    )?;
    writeln!(
        w,
        "    {:<22} {:<10} {:<12} Fixed",
        "Advisory", "Severity", "Version"
    )?;
    writeln!(w, "    {}", "-".repeat(60))?;

    for finding in &vulns.findings {
        let severity_label = finding.severity.to_string();
        let severity_colored = match finding.severity {
            Severity::Critical => severity_label.red().bold(),
            Severity::High => severity_label.red(),
            Severity::Medium => severity_label.yellow(),
            Severity::Low => severity_label.normal(),
            Severity::Info => severity_label.dimmed(),
        };

        writeln!(
            w,
            "    {:<22} {:<10} {:<12} {}",
            finding.advisory_id,
            severity_colored,
            finding.affected_version,
            finding.fixed_version.as_deref().unwrap_or("N/A")
        )?;
    }

    Ok(())
}

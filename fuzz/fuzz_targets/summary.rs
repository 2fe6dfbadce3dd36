#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use depwatch_core::types::{Severity, Vulnerability};
use depwatch_lookup::{render_summary, VulnReport};

#[derive(Arbitrary, Debug)]
struct FindingInput {
    advisory_id: String,
    package: String,
    affected_version: String,
    fixed_version: Option<String>,
    severity: u8,
    description: String,
}

fn severity(level: u8) -> Severity {
    match level % 5 {
        0 => Severity::Info,
        1 => Severity::Low,
        2 => Severity::Medium,
        3 => Severity::High,
        _ => Severity::Critical,
    }
}

fuzz_target!(|input: (String, Vec<FindingInput>)| {
    let (key, raw_findings) = input;
    let findings: Vec<Vulnerability> = raw_findings
        .into_iter()
        .map(|finding| Vulnerability {
            advisory_id: finding.advisory_id,
            package: finding.package,
            affected_version: finding.affected_version,
            fixed_version: finding.fixed_version,
            severity: severity(finding.severity),
            description: finding.description,
        })
        .collect();
    let report = VulnReport::from_findings(findings);
    let summary = render_summary(&key, &report);
    assert!(summary.contains(&key));
});

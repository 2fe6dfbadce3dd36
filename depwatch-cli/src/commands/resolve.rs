//! `depwatch resolve` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use depwatch_lookup::{FsManifestLocator, IdentityResolver, PackageQuery};

use crate::cli::ResolveArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `resolve` command.
///
/// Resolution needs no advisory database and no config, so this builds a
/// bare resolver instead of the full lookup service.
pub async fn execute(args: ResolveArgs, writer: &OutputWriter) -> Result<(), CliError> {
    let mut query =
        PackageQuery::parse_spec(&args.spec).map_err(|e| CliError::Command(e.to_string()))?;
    if let Some(version) = args.version {
        query.version = Some(version);
    }
    if let Some(file) = args.file {
        query = query.with_source_file(file);
    }

    debug!(name = %query.name, "resolving package identity");

    // Manifest walking is blocking file IO
    let resolver = Arc::new(IdentityResolver::new(FsManifestLocator::new()));
    let resolve_query = query.clone();
    let identity = tokio::task::spawn_blocking(move || resolver.resolve(&resolve_query))
        .await
        .map_err(|e| CliError::Command(format!("resolution task failed: {e}")))?
        .map_err(|e| CliError::Command(e.to_string()))?;

    let report = ResolveReport {
        requested: args.spec,
        name: identity.name.clone(),
        version: identity.version.clone(),
        key: identity.composite_key(),
    };

    writer.render(&report)?;

    Ok(())
}

#[derive(Serialize)]
pub struct ResolveReport {
    pub requested: String,
    pub name: String,
    pub version: String,
    pub key: String,
}

impl Render for ResolveReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Resolved: {}", self.requested.bold())?;
        writeln!(w, "  Name:    {}", self.name)?;
        writeln!(w, "  Version: {}", self.version)?;
        writeln!(w, "  Key:     {}", self.key.bold())?;
        Ok(())
    }
}

#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`LookupError`)
//! - [`types`]: Domain types (`PackageQuery`, `PackageIdentity`, `VulnReport`, `AnnotatedPackage`)
//! - [`config`]: Service configuration (`LookupServiceConfig`)
//! - [`manifest`]: Manifest discovery (`ManifestLocator` trait, `FsManifestLocator`)
//! - [`resolver`]: Package identity resolution (`IdentityResolver`)
//! - [`cache`]: Report cache with tagged states (`ReportCache`, `ReportState`)
//! - [`coalesce`]: Keyed task coalescing and debouncing (`TaskCoalescer`)
//! - [`probe`]: Vulnerability probe seam (`VulnProbe` trait)
//! - [`advisory`]: Local advisory database probe (`AdvisoryDb`, `AdvisoryDbProbe`)
//! - [`report`]: Summary rendering (`render_summary`, `SeverityCounts`)
//! - [`event`]: Advisory events (`AdvisoryEvent`)
//! - [`service`]: Main orchestrator (`LookupService`, `LookupServiceBuilder`)
//!
//! # Architecture
//!
//! ```text
//! PackageQuery --> IdentityResolver --> PackageIdentity (name@version)
//!                        |                     |
//!                  ManifestLocator        ReportCache -- Ready? --> AnnotatedPackage
//!                                              |
//!                                        TaskCoalescer
//!                                              |
//!                                          VulnProbe --> AdvisoryDb
//!                                              |
//!                                          VulnReport
//!                                         /          \
//!                              AnnotatedPackage   AdvisoryEvent
//!                                                      |
//!                                             mpsc --> downstream
//! ```

pub mod advisory;
pub mod cache;
pub mod coalesce;
pub mod config;
pub mod error;
pub mod event;
pub mod manifest;
pub mod probe;
pub mod report;
pub mod resolver;
pub mod service;
pub mod types;

// --- Public API Re-exports ---

// Service (main orchestrator)
pub use service::{LookupService, LookupServiceBuilder};

// Configuration
pub use config::{DEFAULT_ADVISORY_CHANNEL_CAPACITY, LookupServiceConfig};

// Error
pub use error::LookupError;

// Events
pub use event::AdvisoryEvent;

// Types
pub use types::{AnnotatedPackage, LATEST_VERSION, PackageIdentity, PackageQuery, VulnReport};

// Resolution
pub use manifest::{FsManifestLocator, ManifestInfo, ManifestLocator};
pub use resolver::IdentityResolver;

// Cache and coalescing
pub use cache::{ReportCache, ReportState};
pub use coalesce::TaskCoalescer;

// Probes
pub use advisory::{AdvisoryDb, AdvisoryDbEntry, AdvisoryDbProbe, VersionRange};
pub use probe::VulnProbe;

// Report rendering
pub use report::{SeverityCounts, render_summary};

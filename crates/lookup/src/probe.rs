//! Vulnerability probe seam.
//!
//! The pipeline does not care where findings come from. Anything that can
//! turn a resolved package identity into a [`VulnReport`] -- a local advisory
//! database, a remote audit endpoint, a fixture in tests -- plugs in behind
//! [`VulnProbe`].

use std::future::Future;

use crate::error::LookupError;
use crate::types::{PackageIdentity, VulnReport};

/// Source of vulnerability findings for a resolved package.
///
/// The returned report carries raw findings only; the pipeline attaches the
/// rendered summary itself. Implementations may freely use `async fn`:
///
/// ```
/// use depwatch_lookup::error::LookupError;
/// use depwatch_lookup::probe::VulnProbe;
/// use depwatch_lookup::types::{PackageIdentity, VulnReport};
///
/// struct AlwaysClean;
///
/// impl VulnProbe for AlwaysClean {
///     async fn probe(&self, _identity: &PackageIdentity) -> Result<VulnReport, LookupError> {
///         Ok(VulnReport::clean())
///     }
/// }
/// ```
pub trait VulnProbe: Send + Sync + 'static {
    /// Looks up known vulnerabilities for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Probe`] (or a more specific variant) when the
    /// underlying source cannot be consulted. A package with no known
    /// vulnerabilities is a success with an empty report, not an error.
    fn probe(
        &self,
        identity: &PackageIdentity,
    ) -> impl Future<Output = Result<VulnReport, LookupError>> + Send;
}

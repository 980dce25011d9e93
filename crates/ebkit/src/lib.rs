//! # ebkit
//!
//! Resource client and reconcile flows for an application platform that
//! hosts applications, application versions, environments and
//! configuration templates.
//!
//! This crate provides functionality for:
//! - Talking to the control plane through a pluggable [`Backend`]
//! - Driving each resource kind toward a desired state (create, update,
//!   delete, or nothing) and waiting until the change is observable
//! - Previewing changes without writing (check mode)
//! - Removing old application versions under a retention policy
//!
//! ## Example
//!
//! ```no_run
//! use ebkit::{ApplicationSpec, ApplyContext, Client, TargetState};
//!
//! let client = Client::new("https://control.example.com/v1").expect("bad endpoint");
//! let ctx = ApplyContext::new();
//!
//! let spec = ApplicationSpec::new("shop").with_description("storefront");
//! let outcome = client
//!     .application(&ctx, &spec, TargetState::Present)
//!     .expect("reconcile failed");
//! println!("changed: {}", outcome.changed);
//! ```
//!
//! ## Waiting
//!
//! Every mutation is followed by polling until the platform reflects it.
//! Throttling while polling is absorbed; the budget and poll interval come
//! from [`WaitConfig`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod context;
pub mod error;
pub mod reconcile;
pub mod types;

pub use context::{ApplyContext, WaitConfig};
pub use error::{Error, ErrorCategory, Result};
pub use reconcile::Outcome;
pub use types::{
    Application, ApplicationSpec, ApplicationVersion, ConfigurationSettings, Environment,
    EnvironmentHealth, EnvironmentSnapshot, EnvironmentSpec, EnvironmentStatus, ResourceKind,
    SourceBundle, TemplateSpec, Tier, TierName, VersionSpec,
};

pub use declarative::{
    Equivalence, EquivalenceTable, OptionSetting, RetentionPolicy, TargetState, WaitCallback,
};

use backend::{Backend, http::HttpBackend};
use chrono::{DateTime, Utc};

/// High-level client for platform resources.
///
/// The client wraps a backend and exposes one reconcile entry point per
/// resource kind plus the read-only listing operations.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client talking HTTP to `endpoint`.
    pub fn new(endpoint: &str) -> Result<Self> {
        let backend = HttpBackend::new(endpoint)?;
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    // =========================================================================
    // Applications
    // =========================================================================

    /// Drive an application toward `target`.
    pub fn application(
        &self,
        ctx: &ApplyContext<'_>,
        spec: &ApplicationSpec,
        target: TargetState,
    ) -> Result<Outcome> {
        reconcile::application::reconcile(self.backend(), ctx, spec, target)
    }

    /// List applications, or the one named.
    pub fn list_applications(&self, name: Option<&str>) -> Result<Outcome> {
        reconcile::application::list(self.backend(), name)
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Drive an application version toward `target`.
    pub fn version(
        &self,
        ctx: &ApplyContext<'_>,
        spec: &VersionSpec,
        target: TargetState,
        delete_source: bool,
    ) -> Result<Outcome> {
        reconcile::version::reconcile(self.backend(), ctx, spec, target, delete_source)
    }

    /// List versions of an application.
    pub fn list_versions(&self, app: &str, label: Option<&str>) -> Result<Outcome> {
        reconcile::version::list(self.backend(), app, label)
    }

    /// Remove versions outside `policy`, judged as of `now`.
    pub fn cleanup_versions(
        &self,
        ctx: &ApplyContext<'_>,
        app: &str,
        policy: RetentionPolicy,
        delete_source: bool,
        now: DateTime<Utc>,
    ) -> Result<Outcome> {
        reconcile::version::cleanup(self.backend(), ctx, app, policy, delete_source, now)
    }

    // =========================================================================
    // Environments
    // =========================================================================

    /// Drive an environment toward `target`.
    pub fn environment(
        &self,
        ctx: &ApplyContext<'_>,
        spec: &EnvironmentSpec,
        target: TargetState,
    ) -> Result<Outcome> {
        reconcile::environment::reconcile(self.backend(), ctx, spec, target)
    }

    /// List live environments of an application.
    pub fn list_environments(&self, app: &str, name: Option<&str>) -> Result<Outcome> {
        reconcile::environment::list(self.backend(), app, name)
    }

    /// Show an environment with its option settings.
    pub fn environment_details(&self, app: &str, name: &str) -> Result<Outcome> {
        reconcile::environment::details(self.backend(), app, name)
    }

    // =========================================================================
    // Configuration Templates
    // =========================================================================

    /// Drive a configuration template toward `target`.
    pub fn template(
        &self,
        ctx: &ApplyContext<'_>,
        spec: &TemplateSpec,
        target: TargetState,
    ) -> Result<Outcome> {
        reconcile::template::reconcile(self.backend(), ctx, spec, target)
    }

    /// List templates of an application, or the one named.
    pub fn list_templates(&self, app: &str, name: Option<&str>) -> Result<Outcome> {
        reconcile::template::list(self.backend(), app, name)
    }

    /// Show one template with its option settings.
    pub fn template_details(&self, app: &str, name: &str) -> Result<Outcome> {
        reconcile::template::details(self.backend(), app, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::memory::MemoryBackend;

    #[test]
    fn test_client_with_memory_backend() {
        let memory = MemoryBackend::new();
        let client = Client::with_backend(Box::new(memory.clone()));
        memory.seed_application("shop", None);

        let outcome = client.list_applications(Some("shop")).unwrap();
        assert_eq!(outcome.resources.unwrap().len(), 1);
        assert_eq!(memory.calls().len(), 1);
    }

    #[test]
    fn test_client_rejects_bad_endpoint() {
        assert!(Client::new("not a url").is_err());
    }
}

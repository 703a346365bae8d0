//! Registry clients: query one or more external registries for candidate
//! packages.
//!
//! The registries themselves, and any particular wire format they expose,
//! are out of scope; this module defines only the boundary [`Discovery`]
//! calls through, the same trait-at-the-boundary shape as
//! `vso_supervisor::install::PackageInstaller`. [`HttpRegistryClient`] is a
//! usable default for any registry exposing a simple
//! `GET <base>?q=<capability>` search API returning a JSON array of
//! package hits.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::candidate::Candidate;
use crate::error::DiscoveryError;
use crate::scoring::score_hit;

/// One external source of candidate packages.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Human-readable name used in `rationale` strings and logs.
    fn name(&self) -> &str;

    async fn query(
        &self,
        capability: &str,
        hints: Option<&str>,
    ) -> Result<Vec<Candidate>, DiscoveryError>;
}

#[derive(Debug, Deserialize)]
struct RegistryHit {
    name: String,
    version: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    downloads: u64,
}

/// Queries a registry exposing `GET <base_url>?q=<capability>[&hints=<hints>]`
/// returning `[{"name", "version"?, "description"?, "downloads"?}]`. The
/// exact shape mirrors the package hit records most registry search APIs
/// already return; a registry with a different shape supplies its own
/// [`RegistryClient`].
pub struct HttpRegistryClient {
    name: String,
    base_url: String,
    client: reqwest::Client,
}

impl HttpRegistryClient {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client: reqwest::Client::builder()
                .build()
                .expect("reqwest client construction with no custom TLS config is infallible"),
        }
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(
        &self,
        capability: &str,
        hints: Option<&str>,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        let mut request = self.client.get(&self.base_url).query(&[("q", capability)]);
        if let Some(hints) = hints {
            request = request.query(&[("hints", hints)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DiscoveryError::RegistryUnreachable(e.to_string()))?
            .error_for_status()
            .map_err(|e| DiscoveryError::RegistryUnreachable(e.to_string()))?;
        let hits: Vec<RegistryHit> = response
            .json()
            .await
            .map_err(|e| DiscoveryError::Malformed(e.to_string()))?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let score = score_hit(capability, hints, &hit.name, &hit.description, hit.downloads);
                Candidate {
                    package: hit.name,
                    version: hit.version,
                    score,
                    rationale: format!("matched via {}", self.name),
                }
            })
            .collect())
    }
}

/// A registry backed by a fixed, in-memory catalog. Useful as a default for
/// deployments that pre-provision their own capability -> package mapping
/// instead of querying a live registry, and for tests.
pub struct StaticRegistryClient {
    name: String,
    catalog: Vec<(String, String)>,
}

impl StaticRegistryClient {
    pub fn new(name: impl Into<String>, catalog: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            catalog,
        }
    }
}

#[async_trait]
impl RegistryClient for StaticRegistryClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query(
        &self,
        capability: &str,
        hints: Option<&str>,
    ) -> Result<Vec<Candidate>, DiscoveryError> {
        Ok(self
            .catalog
            .iter()
            .filter_map(|(package, description)| {
                let score = score_hit(capability, hints, package, description, 0);
                (score > 0.0).then(|| Candidate {
                    package: package.clone(),
                    version: None,
                    score,
                    rationale: format!("matched via {}", self.name),
                })
            })
            .collect())
    }
}

/// Default per-registry query deadline when none is supplied to `search`.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

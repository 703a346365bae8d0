//! `search(capability, hints?) -> [Candidate]`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::candidate::Candidate;
use crate::registry::{RegistryClient, DEFAULT_QUERY_TIMEOUT};

/// Fans a capability search out to every configured [`RegistryClient`] in
/// parallel, each bounded by its own deadline, then merges, dedups by
/// package name (keeping the highest-scoring hit), and ranks the result.
pub struct Discovery {
    registries: Vec<Arc<dyn RegistryClient>>,
    query_timeout: Duration,
}

impl Discovery {
    pub fn new(registries: Vec<Arc<dyn RegistryClient>>) -> Self {
        Self {
            registries,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Never returns an error: a registry that fails or times out simply
    /// contributes no candidates; an empty result is a valid outcome.
    /// Ordering is total and stable for a given input: by score
    /// descending, then by package name ascending to break ties.
    pub async fn search(&self, capability: &str, hints: Option<&str>) -> Vec<Candidate> {
        let capability = capability.to_string();
        let hints = hints.map(str::to_string);

        let mut queries = tokio::task::JoinSet::new();
        for registry in &self.registries {
            let registry = Arc::clone(registry);
            let capability = capability.clone();
            let hints = hints.clone();
            let timeout = self.query_timeout;
            queries.spawn(async move {
                let name = registry.name().to_string();
                match tokio::time::timeout(timeout, registry.query(&capability, hints.as_deref()))
                    .await
                {
                    Ok(Ok(candidates)) => candidates,
                    Ok(Err(e)) => {
                        tracing::warn!(registry = %name, "discovery query failed: {e}");
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::warn!(registry = %name, "discovery query timed out");
                        Vec::new()
                    }
                }
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = queries.join_next().await {
            results.push(joined.unwrap_or_default());
        }

        let mut by_package: HashMap<String, Candidate> = HashMap::new();
        for candidate in results.into_iter().flatten() {
            by_package
                .entry(candidate.package.clone())
                .and_modify(|existing| {
                    if candidate.score > existing.score {
                        *existing = candidate.clone();
                    }
                })
                .or_insert(candidate);
        }

        let mut merged: Vec<Candidate> = by_package.into_values().collect();
        merged.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.package.cmp(&b.package))
        });
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistryClient;

    #[tokio::test]
    async fn empty_registry_list_yields_empty_result() {
        let discovery = Discovery::new(vec![]);
        assert!(discovery.search("blockchain", None).await.is_empty());
    }

    #[tokio::test]
    async fn dedups_by_package_keeping_highest_score() {
        let a = Arc::new(StaticRegistryClient::new(
            "registry-a",
            vec![("blockchain-tool".into(), "blockchain".into())],
        ));
        let b = Arc::new(StaticRegistryClient::new(
            "registry-b",
            vec![("blockchain-tool".into(), "blockchain capability provider".into())],
        ));
        let discovery = Discovery::new(vec![a, b]);
        let candidates = discovery.search("blockchain", None).await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].package, "blockchain-tool");
    }

    #[tokio::test]
    async fn results_are_sorted_by_score_descending() {
        let registry = Arc::new(StaticRegistryClient::new(
            "registry",
            vec![
                ("weather-tool".into(), "forecasts weather data".into()),
                ("blockchain-tool".into(), "blockchain capability provider".into()),
            ],
        ));
        let discovery = Discovery::new(vec![registry]);
        let candidates = discovery.search("blockchain", None).await;
        assert_eq!(candidates[0].package, "blockchain-tool");
    }

    #[tokio::test]
    async fn no_matching_candidates_is_a_valid_empty_outcome() {
        let registry = Arc::new(StaticRegistryClient::new(
            "registry",
            vec![("weather-tool".into(), "forecasts weather data".into())],
        ));
        let discovery = Discovery::new(vec![registry]);
        assert!(discovery.search("blockchain", None).await.is_empty());
    }
}

//! Readiness checks against the template store and polaris

use std::collections::BTreeMap;
use std::sync::Arc;

use aquila_templates::{BlobStorage, HEALTHCHECK_BLOB};
use reqwest::Client;

/// Checks the service's collaborators are reachable
pub struct ReadinessProbe {
    store: Option<Arc<dyn BlobStorage>>,
    container: String,
    client: Client,
    polaris_host: String,
}

impl ReadinessProbe {
    /// `store` is `None` when template fetching is switched off; the store check is then skipped
    pub fn new(
        store: Option<Arc<dyn BlobStorage>>,
        container: impl Into<String>,
        client: Client,
        polaris_host: impl Into<String>,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            client,
            polaris_host: polaris_host.into(),
        }
    }

    /// Failed components mapped to a description; empty when ready
    pub async fn check(&self) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();

        if let Some(store) = &self.store {
            let failure = match store.exists(HEALTHCHECK_BLOB).await {
                Ok(true) => None,
                Ok(false) => Some("blob does not exist".to_string()),
                Err(e) => Some(e.to_string()),
            };
            if let Some(reason) = failure {
                errors.insert(
                    "blob-storage".to_string(),
                    format!(
                        "failed to retrieve '{}' from '{}': {}",
                        HEALTHCHECK_BLOB, self.container, reason
                    ),
                );
            }
        }

        let url = format!("{}/livez", self.polaris_host);
        let polaris = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status());
        if let Err(e) = polaris {
            errors.insert(
                "polaris-request".to_string(),
                format!("failed to contact polaris at {}: {}", url, e),
            );
        }

        errors
    }
}

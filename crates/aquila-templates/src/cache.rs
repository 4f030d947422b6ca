//! Process-lifetime cache of retailer templates
//!
//! The cache scans the whole container once when it is connected and again on
//! every lookup miss. Blobs are named `<retailer>/<template>.html`; anything
//! else in the container is skipped.
//!
//! Lookups read a stable snapshot under a read lock. Reloads are serialized
//! behind their own mutex, do all store I/O without touching the mapping, and
//! then merge the fresh entries in a single write-locked step, so a reader
//! never sees a half-applied reload.
//!
//! If the store cannot be listed when the cache is connected, the cache
//! switches to disabled for the rest of the process and never talks to the
//! store again.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{CacheError, Result};
use crate::storage::BlobStorage;

/// Blob used by readiness probes, never a template
pub const HEALTHCHECK_BLOB: &str = "healthz";

const TEMPLATE_EXTENSION: &str = ".html";

type RetailerTemplates = HashMap<String, HashMap<String, String>>;

/// A parsed `<retailer>/<template>.html` blob name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateName<'a> {
    pub retailer: &'a str,
    pub slug: &'a str,
}

impl<'a> TemplateName<'a> {
    /// Parse a blob name, `None` if it does not follow the naming contract
    pub fn parse(key: &'a str) -> Option<Self> {
        let stem = key.strip_suffix(TEMPLATE_EXTENSION)?;
        let (retailer, slug) = stem.split_once('/')?;
        if retailer.is_empty() || slug.is_empty() || slug.contains('/') {
            return None;
        }
        Some(Self { retailer, slug })
    }
}

/// Counts from a single container scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub loaded: usize,
    pub skipped: usize,
}

/// Retailer template cache backed by a blob container
pub struct TemplateCache {
    store: Option<Arc<dyn BlobStorage>>,
    templates: RwLock<RetailerTemplates>,
    reload_lock: Mutex<()>,
    disabled: AtomicBool,
}

impl TemplateCache {
    /// A cache that never loads anything and never touches a store
    pub fn disabled() -> Self {
        Self {
            store: None,
            templates: RwLock::new(HashMap::new()),
            reload_lock: Mutex::new(()),
            disabled: AtomicBool::new(true),
        }
    }

    /// Create a cache over `store` and run the initial scan
    ///
    /// A store that cannot be listed disables the cache permanently.
    pub async fn connect(store: Arc<dyn BlobStorage>) -> Self {
        let cache = Self {
            store: Some(store),
            templates: RwLock::new(HashMap::new()),
            reload_lock: Mutex::new(()),
            disabled: AtomicBool::new(false),
        };

        if let Err(e) = cache.reload().await {
            error!(
                error = %e,
                "Error while loading templates from blob storage, deactivating template cache and falling back to default templates"
            );
            cache.disabled.store(true, Ordering::Release);
        }

        cache
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Scan the container and merge every valid template into the cache
    pub async fn reload(&self) -> Result<ReloadSummary> {
        if self.is_disabled() {
            return Err(CacheError::Disabled);
        }
        let _guard = self.reload_lock.lock().await;
        self.reload_exclusive().await
    }

    /// Body of `slug` for `retailer`, reloading the container once on a miss
    pub async fn lookup(&self, retailer: &str, slug: &str) -> Option<String> {
        if self.is_disabled() {
            debug!(retailer, slug, "Template cache disabled, returning no template");
            return None;
        }

        if let Some(body) = self.get(retailer, slug).await {
            return Some(body);
        }

        info!(retailer, slug, "Template not found, trying to load templates again");
        if let Err(e) = self.reload().await {
            warn!(retailer, slug, error = %e, "Template reload failed");
            return None;
        }

        self.get(retailer, slug).await
    }

    /// Slugs currently cached for `retailer`, sorted
    pub async fn slugs(&self, retailer: &str) -> Vec<String> {
        let templates = self.templates.read().await;
        let mut slugs: Vec<String> = templates
            .get(retailer)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        slugs.sort();
        slugs
    }

    /// Retailers with at least one cached template, sorted
    pub async fn retailers(&self) -> Vec<String> {
        let mut retailers: Vec<String> = self.templates.read().await.keys().cloned().collect();
        retailers.sort();
        retailers
    }

    async fn get(&self, retailer: &str, slug: &str) -> Option<String> {
        self.templates
            .read()
            .await
            .get(retailer)
            .and_then(|t| t.get(slug))
            .cloned()
    }

    /// Caller must hold `reload_lock`
    async fn reload_exclusive(&self) -> Result<ReloadSummary> {
        let store = self.store.as_ref().ok_or(CacheError::Disabled)?;

        info!("Loading templates from blob storage");
        let keys = store
            .list_keys("")
            .await
            .map_err(CacheError::StoreUnavailable)?;

        let mut fresh: RetailerTemplates = HashMap::new();
        let mut summary = ReloadSummary::default();

        for key in &keys {
            if key == HEALTHCHECK_BLOB {
                continue;
            }

            let Some(name) = TemplateName::parse(key) else {
                warn!(blob = %key, "Invalid template file found in container, skipping");
                summary.skipped += 1;
                continue;
            };

            let bytes = match store.get(key).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(blob = %key, error = %e, "Failed to download template");
                    summary.skipped += 1;
                    continue;
                }
            };

            match String::from_utf8(bytes) {
                Ok(body) => {
                    fresh
                        .entry(name.retailer.to_string())
                        .or_default()
                        .insert(name.slug.to_string(), body);
                    summary.loaded += 1;
                }
                Err(e) => {
                    error!(blob = %key, error = %e, "Failed to decode template");
                    summary.skipped += 1;
                }
            }
        }

        {
            let mut templates = self.templates.write().await;
            for (retailer, slugs) in fresh {
                templates.entry(retailer).or_default().extend(slugs);
            }
        }

        info!(
            loaded = summary.loaded,
            skipped = summary.skipped,
            "Loaded templates from blob storage"
        );
        Ok(summary)
    }
}

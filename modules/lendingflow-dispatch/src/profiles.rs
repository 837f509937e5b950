//! Profile resolution against the automation catalog, with a bounded-TTL cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::RwLock;
use tracing::{info, warn};

use docai_client::{AutomationError, AutomationService};
use lendingflow_common::{DispatchError, DispatchResult, ProfileReference};

/// Max catalog lookup attempts before a transient failure is surfaced.
const LOOKUP_MAX_ATTEMPTS: u32 = 3;
/// Base backoff for catalog retries. Actual delay is base * 2^attempt + jitter.
const LOOKUP_RETRY_BASE: Duration = Duration::from_millis(200);

struct CachedProfile {
    reference: ProfileReference,
    resolved_at: Instant,
}

/// Resolves profile names to durable service-side handles.
///
/// The default profile is resolved once at construction; named lookups are
/// cached per name with a bounded TTL so a steady stream of events doesn't
/// hammer the catalog. Staleness is bounded by the TTL, not strict
/// consistency.
pub struct ProfileResolver {
    service: Arc<dyn AutomationService>,
    default_profile: Option<ProfileReference>,
    cache: RwLock<HashMap<String, CachedProfile>>,
    ttl: Duration,
}

impl ProfileResolver {
    /// Build the resolver, eagerly resolving the default profile when one is
    /// configured. A default that cannot be resolved is a startup failure.
    pub async fn new(
        service: Arc<dyn AutomationService>,
        default_profile_name: Option<&str>,
        ttl: Duration,
    ) -> DispatchResult<Self> {
        let default_profile = match default_profile_name {
            Some(name) => {
                let reference = lookup_with_retry(service.as_ref(), name).await?;
                info!(
                    profile = name,
                    handle = %reference.resolved_handle,
                    "Default profile resolved"
                );
                Some(reference)
            }
            None => None,
        };
        Ok(Self {
            service,
            default_profile,
            cache: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    /// Resolve a profile reference. `None` falls back to the configured
    /// default; no default configured is `MissingProfileConfig`.
    pub async fn resolve(&self, name: Option<&str>) -> DispatchResult<ProfileReference> {
        let Some(name) = name else {
            return self
                .default_profile
                .clone()
                .ok_or(DispatchError::MissingProfileConfig);
        };

        if let Some(cached) = self.cached(name).await {
            return Ok(cached);
        }

        match lookup_with_retry(self.service.as_ref(), name).await {
            Ok(reference) => {
                self.cache.write().await.insert(
                    name.to_string(),
                    CachedProfile {
                        reference: reference.clone(),
                        resolved_at: Instant::now(),
                    },
                );
                Ok(reference)
            }
            Err(e) => {
                // A recreated profile gets a fresh handle under the same
                // name; drop anything cached so the next event re-resolves.
                if matches!(e, DispatchError::ProfileNotFound { .. }) {
                    self.cache.write().await.remove(name);
                }
                Err(e)
            }
        }
    }

    async fn cached(&self, name: &str) -> Option<ProfileReference> {
        let cache = self.cache.read().await;
        let entry = cache.get(name)?;
        if entry.resolved_at.elapsed() < self.ttl {
            Some(entry.reference.clone())
        } else {
            None
        }
    }
}

async fn lookup_with_retry(
    service: &dyn AutomationService,
    name: &str,
) -> DispatchResult<ProfileReference> {
    let mut attempt = 0;
    loop {
        match service.find_profile(name).await {
            Ok(entry) => {
                return Ok(ProfileReference {
                    name: entry.name,
                    resolved_handle: entry.handle,
                })
            }
            Err(AutomationError::ProfileNotFound { name }) => {
                return Err(DispatchError::ProfileNotFound { name })
            }
            Err(e) if e.is_transient() && attempt + 1 < LOOKUP_MAX_ATTEMPTS => {
                warn!(
                    profile = name,
                    attempt = attempt + 1,
                    error = %e,
                    "Catalog lookup failed, retrying"
                );
                let backoff = LOOKUP_RETRY_BASE * 2u32.pow(attempt);
                let jitter = Duration::from_millis(rand::rng().random_range(0..100));
                tokio::time::sleep(backoff + jitter).await;
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                warn!(profile = name, error = %e, "Catalog lookup retries exhausted");
                return Err(DispatchError::ProfileResolutionTimeout {
                    name: name.to_string(),
                });
            }
            Err(e) => {
                return Err(DispatchError::DispatchRejected {
                    message: e.to_string(),
                })
            }
        }
    }
}

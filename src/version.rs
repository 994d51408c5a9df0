use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{FetchError, FetchResult};
use crate::model::VersionTag;
use crate::single_flight::SingleFlight;
use crate::upstream::ReferenceSource;

#[derive(Debug, Clone)]
struct ResolvedVersion {
    tag: VersionTag,
    resolved_at: DateTime<Utc>,
}

/// Tracks the current upstream version, refreshing at most once per TTL.
///
/// Never fails: a broken upstream yields the last known-good tag, or the
/// configured fallback on a cold start.
pub struct VersionResolver {
    source: Arc<dyn ReferenceSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    fallback: VersionTag,
    state: Arc<Mutex<Option<ResolvedVersion>>>,
    /// Bumped by `clear`; fetches started under an older generation do not write back.
    generation: Arc<AtomicU64>,
    flight: SingleFlight<(), FetchResult<VersionTag>>,
}

impl VersionResolver {
    pub fn new(
        source: Arc<dyn ReferenceSource>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        fallback: VersionTag,
    ) -> Self {
        Self {
            source,
            clock,
            ttl,
            fallback,
            state: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            flight: SingleFlight::new(),
        }
    }

    pub async fn current_version(&self) -> VersionTag {
        let now = self.clock.now();
        if let Some(resolved) = self.snapshot() {
            if now - resolved.resolved_at < self.ttl {
                debug!(version = %resolved.tag, "version cache hit");
                return resolved.tag;
            }
        }

        let source = Arc::clone(&self.source);
        let clock = Arc::clone(&self.clock);
        let state = Arc::clone(&self.state);
        let generation = Arc::clone(&self.generation);
        let started = generation.load(Ordering::SeqCst);
        let result = self
            .flight
            .run((), move || async move {
                let latest = source.versions().await?.into_iter().next().ok_or_else(|| {
                    FetchError::Decode {
                        url: "versions".to_string(),
                        message: "empty version list".to_string(),
                    }
                })?;
                let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                if generation.load(Ordering::SeqCst) != started {
                    debug!(version = %latest, "version resolved after clear; not stored");
                    return Ok(latest);
                }
                let previous = guard.as_ref().map(|r| r.tag.clone());
                if previous.as_ref() != Some(&latest) {
                    info!(version = %latest, previous = ?previous.as_ref().map(VersionTag::as_str), "reference data version resolved");
                }
                *guard = Some(ResolvedVersion {
                    tag: latest.clone(),
                    resolved_at: clock.now(),
                });
                Ok(latest)
            })
            .await;

        match result {
            Ok(tag) => tag,
            Err(err) => match self.last_known() {
                Some(tag) => {
                    warn!(url = err.url(), error = %err, version = %tag, "version fetch failed; keeping last known version");
                    tag
                }
                None => {
                    warn!(url = err.url(), error = %err, version = %self.fallback, "version fetch failed on cold start; using fallback");
                    self.fallback.clone()
                }
            },
        }
    }

    /// Last successfully resolved tag, regardless of age.
    pub fn last_known(&self) -> Option<VersionTag> {
        self.snapshot().map(|r| r.tag)
    }

    pub fn fallback(&self) -> &VersionTag {
        &self.fallback
    }

    /// Forgets the resolved tag. A fetch still in flight will not restore it.
    pub fn clear(&self) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *guard = None;
        drop(guard);
        self.flight.clear();
    }

    fn snapshot(&self) -> Option<ResolvedVersion> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

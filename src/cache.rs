use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use chrono::Duration;
use tracing::{debug, warn};

use crate::assets::AssetUrls;
use crate::clock::{Clock, SystemClock};
use crate::config::RefDataConfig;
use crate::error::FetchResult;
use crate::model::{
    CacheEntry, CharacterRecord, Freshness, ItemCatalog, ItemRecord, Snapshot, VersionTag,
};
use crate::normalize::{AliasTable, NameNormalizer};
use crate::roster::default_roster;
use crate::search::{self, SearchHit, SearchOptions};
use crate::single_flight::SingleFlight;
use crate::upstream::{DataDragonSource, ReferenceSource};
use crate::version::VersionResolver;

type Slot<T> = Arc<Mutex<Option<CacheEntry<T>>>>;
type Flight<T> = SingleFlight<VersionTag, FetchResult<CacheEntry<T>>>;

/// Process-lifetime cache of character and item reference data.
///
/// Each payload type is fetched lazily on first use, pinned to the version
/// reported by [`VersionResolver`], and refreshed when either the version
/// changes or the entry outlives its TTL. Concurrent callers share one fetch
/// per (payload, version). Upstream failures never escape: callers get the
/// previous entry, or an empty payload if there never was one.
pub struct ReferenceDataCache {
    versions: VersionResolver,
    source: Arc<dyn ReferenceSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    assets: AssetUrls,
    normalizer: NameNormalizer,
    roster: Arc<Vec<CharacterRecord>>,
    characters: Slot<Vec<CharacterRecord>>,
    items: Slot<ItemCatalog>,
    /// Bumped by `clear`; fetches started under an older generation do not write back.
    generation: Arc<AtomicU64>,
    character_flight: Flight<Vec<CharacterRecord>>,
    item_flight: Flight<ItemCatalog>,
}

impl ReferenceDataCache {
    pub fn new(
        source: Arc<dyn ReferenceSource>,
        clock: Arc<dyn Clock>,
        cfg: &RefDataConfig,
        normalizer: NameNormalizer,
    ) -> Self {
        let ttl = cfg.cache_ttl_chrono();
        let versions = VersionResolver::new(
            Arc::clone(&source),
            Arc::clone(&clock),
            ttl,
            cfg.fallback_version.clone(),
        );
        let roster = Arc::new(default_roster(normalizer.aliases()));
        Self {
            versions,
            source,
            clock,
            ttl,
            assets: AssetUrls::from_config(cfg),
            normalizer,
            roster,
            characters: Arc::new(Mutex::new(None)),
            items: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            character_flight: SingleFlight::new(),
            item_flight: SingleFlight::new(),
        }
    }

    /// Data Dragon over HTTP, wall clock, built-in aliases plus `RIFT_ALIAS_FILE`.
    pub fn from_config(cfg: &RefDataConfig) -> Result<Self> {
        let source: Arc<dyn ReferenceSource> = Arc::new(DataDragonSource::new(cfg)?);
        let mut aliases = AliasTable::builtin();
        if let Some(path) = cfg.alias_file.as_deref() {
            let added = aliases.extend_from_file(path)?;
            debug!(path = %path.display(), added, "loaded alias file");
        }
        Ok(Self::new(
            source,
            Arc::new(SystemClock),
            cfg,
            NameNormalizer::new(aliases),
        ))
    }

    pub async fn current_version(&self) -> VersionTag {
        self.versions.current_version().await
    }

    pub fn version_resolver(&self) -> &VersionResolver {
        &self.versions
    }

    pub fn normalizer(&self) -> &NameNormalizer {
        &self.normalizer
    }

    pub fn assets(&self) -> &AssetUrls {
        &self.assets
    }

    /// Characters for the current version, ordered by canonical id.
    pub async fn characters(&self) -> Snapshot<Vec<CharacterRecord>> {
        self.load(
            &self.characters,
            &self.character_flight,
            "characters",
            |source, version| async move { source.characters(&version).await },
        )
        .await
    }

    /// Items for the current version, keyed by numeric id.
    pub async fn items(&self) -> Snapshot<ItemCatalog> {
        self.load(
            &self.items,
            &self.item_flight,
            "items",
            |source, version| async move { source.items(&version).await },
        )
        .await
    }

    /// Cached characters, or the built-in roster when nothing could be loaded.
    pub async fn characters_or_roster(&self) -> Arc<Vec<CharacterRecord>> {
        let snapshot = self.characters().await;
        if snapshot.data.is_empty() {
            Arc::clone(&self.roster)
        } else {
            snapshot.data
        }
    }

    pub async fn resolve_canonical_id(&self, name: &str) -> Option<String> {
        let characters = self.characters_or_roster().await;
        self.normalizer.resolve_canonical_id(name, &characters)
    }

    pub async fn character(&self, name: &str) -> Option<CharacterRecord> {
        let characters = self.characters_or_roster().await;
        self.normalizer.find(name, &characters).cloned()
    }

    /// Looks a character up by its upstream numeric key.
    pub async fn character_by_key(&self, key: u32) -> Option<CharacterRecord> {
        let snapshot = self.characters().await;
        snapshot.data.iter().find(|c| c.key == Some(key)).cloned()
    }

    pub async fn search_characters(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Vec<SearchHit<CharacterRecord>> {
        let characters = self.characters_or_roster().await;
        search::search(query, characters.as_slice(), opts)
            .iter()
            .map(SearchHit::cloned)
            .collect()
    }

    pub async fn search_items(&self, query: &str, opts: &SearchOptions) -> Vec<SearchHit<ItemRecord>> {
        let snapshot = self.items().await;
        let items: Vec<ItemRecord> = snapshot.data.values().cloned().collect();
        search::search(query, items.as_slice(), opts)
            .iter()
            .map(SearchHit::cloned)
            .collect()
    }

    pub async fn item(&self, id: u32) -> Option<ItemRecord> {
        self.items().await.data.get(&id).cloned()
    }

    /// Display name, or `Item {id}` when the id is unknown to the current catalog.
    pub async fn item_label(&self, id: u32) -> String {
        let snapshot = self.items().await;
        item_label_in(&snapshot.data, id)
    }

    pub async fn build_labels(&self, build: &[u32]) -> Vec<String> {
        let snapshot = self.items().await;
        build.iter().map(|id| item_label_in(&snapshot.data, *id)).collect()
    }

    pub async fn item_image_url(&self, id: u32) -> String {
        let version = self.current_version().await;
        self.assets.item_image_url(&version, id)
    }

    pub async fn character_image_url(&self, canonical_id: &str) -> String {
        let version = self.current_version().await;
        self.assets.character_image_url(&version, canonical_id)
    }

    pub async fn character_detail_url(&self, canonical_id: &str) -> String {
        let version = self.current_version().await;
        self.assets.character_detail_url(&version, canonical_id)
    }

    /// Drops every cached entry and the resolved version. Fetches still in
    /// flight complete for their callers but are not stored.
    pub fn clear(&self) {
        self.versions.clear();
        let mut characters = lock(&self.characters);
        let mut items = lock(&self.items);
        self.generation.fetch_add(1, Ordering::SeqCst);
        *characters = None;
        *items = None;
        drop(items);
        drop(characters);
        self.character_flight.clear();
        self.item_flight.clear();
    }

    async fn load<T, F, Fut>(
        &self,
        slot: &Slot<T>,
        flight: &Flight<T>,
        kind: &'static str,
        fetch: F,
    ) -> Snapshot<T>
    where
        T: Default + Send + Sync + 'static,
        F: FnOnce(Arc<dyn ReferenceSource>, VersionTag) -> Fut,
        Fut: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let version = self.versions.current_version().await;
        let now = self.clock.now();
        let hit = lock(slot)
            .as_ref()
            .filter(|entry| entry.version == version && entry.is_fresh(now, self.ttl))
            .cloned();
        if let Some(entry) = hit {
            debug!(kind, version = %version, "reference cache hit");
            return Snapshot {
                version: entry.version,
                data: entry.payload,
                freshness: Freshness::Fresh,
            };
        }

        debug!(kind, version = %version, "reference cache miss");
        let pending = fetch(Arc::clone(&self.source), version.clone());
        let clock = Arc::clone(&self.clock);
        let store = Arc::clone(slot);
        let generation = Arc::clone(&self.generation);
        let started = generation.load(Ordering::SeqCst);
        let fetched_version = version.clone();
        let result = flight
            .run(version.clone(), move || async move {
                let payload = pending.await?;
                let entry = CacheEntry::new(fetched_version, payload, clock.now());
                let mut guard = lock(&store);
                let cleared = generation.load(Ordering::SeqCst) != started;
                let newer_cached = guard
                    .as_ref()
                    .is_some_and(|current| current.version > entry.version);
                if !cleared && !newer_cached {
                    *guard = Some(entry.clone());
                }
                Ok(entry)
            })
            .await;

        match result {
            Ok(entry) => Snapshot {
                version: entry.version,
                data: entry.payload,
                freshness: Freshness::Fresh,
            },
            Err(err) => {
                let previous = lock(slot).clone();
                match previous {
                    Some(entry) => {
                        warn!(kind, url = err.url(), error = %err, served = %entry.version, "fetch failed; serving stale reference data");
                        Snapshot {
                            version: entry.version,
                            data: entry.payload,
                            freshness: Freshness::Stale,
                        }
                    }
                    None => {
                        warn!(kind, url = err.url(), error = %err, "fetch failed with nothing cached; serving empty reference data");
                        Snapshot {
                            version,
                            data: Arc::new(T::default()),
                            freshness: Freshness::Unavailable,
                        }
                    }
                }
            }
        }
    }
}

fn item_label_in(items: &ItemCatalog, id: u32) -> String {
    items
        .get(&id)
        .map(|item| item.name.clone())
        .unwrap_or_else(|| format!("Item {id}"))
}

fn lock<T>(slot: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;

use rift_coach::cache::ReferenceDataCache;
use rift_coach::clock::{Clock, ManualClock};
use rift_coach::config::RefDataConfig;
use rift_coach::error::{FetchError, FetchResult};
use rift_coach::model::{CharacterRecord, Freshness, ItemCatalog, VersionTag};
use rift_coach::normalize::NameNormalizer;
use rift_coach::search::SearchOptions;
use rift_coach::upstream::{
    ReferenceSource, parse_characters_json, parse_items_json, parse_versions_json,
};
use rift_coach::version::VersionResolver;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn server_error() -> FetchError {
    FetchError::Status {
        url: "fake://upstream".to_string(),
        status: 500,
    }
}

/// In-memory upstream with swappable responses and per-endpoint call counters.
struct FakeSource {
    versions: Mutex<FetchResult<Vec<VersionTag>>>,
    characters: Mutex<FetchResult<Vec<CharacterRecord>>>,
    items: Mutex<FetchResult<ItemCatalog>>,
    delay: Duration,
    slow_version: Mutex<Option<(VersionTag, Duration)>>,
    version_calls: AtomicUsize,
    character_calls: AtomicUsize,
    item_calls: AtomicUsize,
}

impl FakeSource {
    fn healthy() -> Self {
        Self {
            versions: Mutex::new(Ok(parse_versions_json(&read_fixture("versions.json")).unwrap())),
            characters: Mutex::new(Ok(
                parse_characters_json(&read_fixture("champion.json")).unwrap()
            )),
            items: Mutex::new(Ok(parse_items_json(&read_fixture("item.json")).unwrap())),
            delay: Duration::ZERO,
            slow_version: Mutex::new(None),
            version_calls: AtomicUsize::new(0),
            character_calls: AtomicUsize::new(0),
            item_calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        let source = Self::healthy();
        source.fail_all();
        source
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Payload fetches for `version` take `delay` instead of the default.
    fn slow_for(&self, version: &str, delay: Duration) {
        *self.slow_version.lock().unwrap() = Some((VersionTag::new(version), delay));
    }

    fn fail_all(&self) {
        *self.versions.lock().unwrap() = Err(server_error());
        *self.characters.lock().unwrap() = Err(server_error());
        *self.items.lock().unwrap() = Err(server_error());
    }

    fn set_versions(&self, tags: &[&str]) {
        *self.versions.lock().unwrap() = Ok(tags.iter().map(|t| VersionTag::new(*t)).collect());
    }

    fn calls(&self) -> (usize, usize, usize) {
        (
            self.version_calls.load(Ordering::SeqCst),
            self.character_calls.load(Ordering::SeqCst),
            self.item_calls.load(Ordering::SeqCst),
        )
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    async fn pause_for(&self, version: &VersionTag) {
        let slow = self
            .slow_version
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(tag, _)| tag == version)
            .map(|(_, delay)| *delay);
        match slow {
            Some(delay) => tokio::time::sleep(delay).await,
            None => self.pause().await,
        }
    }
}

#[async_trait]
impl ReferenceSource for FakeSource {
    async fn versions(&self) -> FetchResult<Vec<VersionTag>> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.versions.lock().unwrap().clone()
    }

    async fn characters(&self, version: &VersionTag) -> FetchResult<Vec<CharacterRecord>> {
        self.character_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_for(version).await;
        self.characters.lock().unwrap().clone()
    }

    async fn items(&self, version: &VersionTag) -> FetchResult<ItemCatalog> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_for(version).await;
        self.items.lock().unwrap().clone()
    }
}

fn build_cache(source: &Arc<FakeSource>, clock: &Arc<ManualClock>) -> ReferenceDataCache {
    let source: Arc<dyn ReferenceSource> = Arc::clone(source) as Arc<dyn ReferenceSource>;
    let clock: Arc<dyn Clock> = Arc::clone(clock) as Arc<dyn Clock>;
    ReferenceDataCache::new(
        source,
        clock,
        &RefDataConfig::default(),
        NameNormalizer::default(),
    )
}

#[tokio::test]
async fn repeated_reads_within_ttl_hit_the_cache() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let first = cache.characters().await;
    assert_eq!(first.freshness, Freshness::Fresh);
    assert_eq!(first.version.as_str(), "14.24.1");
    assert_eq!(first.len(), 8);
    assert_eq!(source.calls(), (1, 1, 0));

    clock.advance(ChronoDuration::minutes(30));
    let second = cache.characters().await;
    assert_eq!(second.freshness, Freshness::Fresh);
    assert!(Arc::ptr_eq(&first.data, &second.data));
    assert_eq!(source.calls(), (1, 1, 0));
}

#[tokio::test]
async fn expired_entries_are_refetched() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    cache.characters().await;
    clock.advance(ChronoDuration::minutes(61));
    let snapshot = cache.characters().await;
    assert_eq!(snapshot.freshness, Freshness::Fresh);
    assert_eq!(source.calls(), (2, 2, 0));
}

#[tokio::test]
async fn concurrent_callers_share_one_fetch() {
    let source = Arc::new(FakeSource::healthy().with_delay(Duration::from_millis(20)));
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let (a, b, c, d, e) = tokio::join!(
        cache.characters(),
        cache.characters(),
        cache.characters(),
        cache.characters(),
        cache.characters(),
    );
    for snapshot in [&a, &b, &c, &d, &e] {
        assert_eq!(snapshot.freshness, Freshness::Fresh);
        assert_eq!(snapshot.len(), 8);
    }
    assert_eq!(source.calls(), (1, 1, 0));

    cache.characters().await;
    assert_eq!(source.calls(), (1, 1, 0));
}

#[tokio::test]
async fn concurrent_item_callers_share_one_fetch() {
    let source = Arc::new(FakeSource::healthy().with_delay(Duration::from_millis(20)));
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let (a, b, c, d) = tokio::join!(cache.items(), cache.items(), cache.items(), cache.items());
    for snapshot in [&a, &b, &c, &d] {
        assert_eq!(snapshot.freshness, Freshness::Fresh);
        assert_eq!(snapshot.len(), 4);
    }
    assert_eq!(source.calls(), (1, 0, 1));
}

#[tokio::test]
async fn late_fetch_for_older_version_keeps_newer_entry() {
    let source = Arc::new(FakeSource::healthy());
    source.slow_for("14.24.1", Duration::from_millis(150));
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let (old, new) = tokio::join!(cache.characters(), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        source.set_versions(&["15.1.1", "14.24.1"]);
        cache.version_resolver().clear();
        cache.characters().await
    });
    assert_eq!(old.version.as_str(), "14.24.1");
    assert_eq!(new.version.as_str(), "15.1.1");

    let after = cache.characters().await;
    assert_eq!(after.version.as_str(), "15.1.1");
    assert_eq!(after.freshness, Freshness::Fresh);
    assert_eq!(source.calls(), (2, 2, 0));
}

#[tokio::test]
async fn clear_wins_over_fetch_in_flight() {
    let source = Arc::new(FakeSource::healthy().with_delay(Duration::from_millis(100)));
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    // Version resolves at ~100ms; the character fetch runs until ~200ms.
    let (during, ()) = tokio::join!(cache.characters(), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        cache.clear();
    });
    assert_eq!(during.freshness, Freshness::Fresh);
    assert_eq!(source.calls(), (1, 1, 0));
    assert!(cache.version_resolver().last_known().is_none());

    cache.characters().await;
    assert_eq!(source.calls(), (2, 2, 0));
}

#[tokio::test]
async fn resolver_clear_discards_version_in_flight() {
    let source = Arc::new(FakeSource::healthy().with_delay(Duration::from_millis(100)));
    let resolver = VersionResolver::new(
        Arc::clone(&source) as Arc<dyn ReferenceSource>,
        Arc::new(ManualClock::default()) as Arc<dyn Clock>,
        ChronoDuration::hours(1),
        VersionTag::new("13.1.1"),
    );

    let (tag, ()) = tokio::join!(resolver.current_version(), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        resolver.clear();
    });
    assert_eq!(tag.as_str(), "14.24.1");
    assert!(resolver.last_known().is_none());
}

#[tokio::test]
async fn failure_after_success_serves_stale_data() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let fresh = cache.characters().await;
    *source.characters.lock().unwrap() = Err(server_error());
    clock.advance(ChronoDuration::hours(2));

    let stale = cache.characters().await;
    assert_eq!(stale.freshness, Freshness::Stale);
    assert_eq!(stale.version, fresh.version);
    assert_eq!(stale.len(), fresh.len());
}

#[tokio::test]
async fn cold_failure_serves_empty_payload_and_fallback_version() {
    let source = Arc::new(FakeSource::failing());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    assert_eq!(cache.current_version().await.as_str(), "14.24.1");
    assert!(cache.version_resolver().last_known().is_none());

    let characters = cache.characters().await;
    assert_eq!(characters.freshness, Freshness::Unavailable);
    assert!(characters.is_empty());

    let items = cache.items().await;
    assert_eq!(items.freshness, Freshness::Unavailable);
    assert!(items.is_empty());
    assert_eq!(cache.item_label(3031).await, "Item 3031");
}

#[tokio::test]
async fn cold_failure_still_searches_builtin_roster() {
    let source = Arc::new(FakeSource::failing());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let hits = cache.search_characters("lee", &SearchOptions::default()).await;
    assert!(hits.len() <= 10);
    let top = hits.first().expect("roster should match");
    assert_eq!(top.item.name, "Lee Sin");
    assert!(top.score >= 0.7);

    assert_eq!(cache.resolve_canonical_id("Wukong").await.as_deref(), Some("MonkeyKing"));
    assert_eq!(cache.resolve_canonical_id("Aatrox").await.as_deref(), Some("Aatrox"));
}

#[tokio::test]
async fn version_change_invalidates_cached_entries() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let before = cache.characters().await;
    assert_eq!(before.version.as_str(), "14.24.1");

    source.set_versions(&["15.1.1", "14.24.1"]);
    cache.version_resolver().clear();
    let after = cache.characters().await;
    assert_eq!(after.version.as_str(), "15.1.1");
    assert_eq!(after.freshness, Freshness::Fresh);
    assert_eq!(source.calls(), (2, 2, 0));
}

#[tokio::test]
async fn clear_forces_a_full_refetch() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    cache.characters().await;
    cache.items().await;
    assert_eq!(source.calls(), (1, 1, 1));

    cache.clear();
    cache.characters().await;
    cache.items().await;
    assert_eq!(source.calls(), (2, 2, 2));
}

#[tokio::test]
async fn item_labels_and_images() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    assert_eq!(cache.item_label(3031).await, "Infinity Edge");
    assert_eq!(cache.item_label(999_999).await, "Item 999999");
    assert_eq!(
        cache.build_labels(&[3089, 4242]).await,
        vec!["Rabadon's Deathcap".to_string(), "Item 4242".to_string()]
    );
    assert_eq!(cache.item(3157).await.map(|i| i.image), Some("3157.png".to_string()));

    let legacy = cache.item_image_url(3174).await;
    assert!(legacy.ends_with("/cdn/10.23.1/img/item/3174.png"), "{legacy}");
    let current = cache.item_image_url(3031).await;
    assert!(current.ends_with("/cdn/14.24.1/img/item/3031.png"), "{current}");

    let hits = cache.search_items("infinity", &SearchOptions::default()).await;
    assert_eq!(hits.first().map(|h| h.item.id), Some(3031));
}

#[tokio::test]
async fn character_lookups_use_cached_records() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let cache = build_cache(&source, &clock);

    let lee = cache.character("lee sin").await.expect("Lee Sin cached");
    assert_eq!(lee.id, "LeeSin");
    assert_eq!(lee.title, "the Blind Monk");

    let wukong = cache.character_by_key(62).await.expect("key 62 cached");
    assert_eq!(wukong.name, "Wukong");
    assert!(cache.character_by_key(9999).await.is_none());

    let url = cache.character_image_url("LeeSin").await;
    assert!(url.ends_with("/cdn/14.24.1/img/champion/LeeSin.png"), "{url}");
    let detail = cache.character_detail_url("LeeSin").await;
    assert!(detail.ends_with("/cdn/14.24.1/data/en_US/champion/LeeSin.json"), "{detail}");
    assert_eq!(source.calls().1, 1);
}

#[tokio::test]
async fn resolver_keeps_last_known_version_on_failure() {
    let source = Arc::new(FakeSource::healthy());
    let clock = Arc::new(ManualClock::default());
    let resolver = VersionResolver::new(
        Arc::clone(&source) as Arc<dyn ReferenceSource>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        ChronoDuration::hours(1),
        VersionTag::new("13.1.1"),
    );

    assert_eq!(resolver.current_version().await.as_str(), "14.24.1");
    source.fail_all();
    clock.advance(ChronoDuration::hours(2));
    assert_eq!(resolver.current_version().await.as_str(), "14.24.1");
    assert_eq!(source.calls().0, 2);
}

#[tokio::test]
async fn resolver_uses_fallback_for_empty_version_list() {
    let source = Arc::new(FakeSource::healthy());
    source.set_versions(&[]);
    let resolver = VersionResolver::new(
        Arc::clone(&source) as Arc<dyn ReferenceSource>,
        Arc::new(ManualClock::default()) as Arc<dyn Clock>,
        ChronoDuration::hours(1),
        VersionTag::new("13.1.1"),
    );
    assert_eq!(resolver.current_version().await.as_str(), "13.1.1");
    assert_eq!(resolver.fallback().as_str(), "13.1.1");
}

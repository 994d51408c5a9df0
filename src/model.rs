use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of one upstream reference-data snapshot, e.g. `14.24.1`.
///
/// Ordered segment-wise: numeric segments compare as numbers and any
/// non-numeric segment sorts below every numeric one, so `14.10.1` sorts
/// after `14.9.1` and legacy tags such as `lolpatch_3.7` sort oldest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment<'a> {
    Text(&'a str),
    Num(u64),
}

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        self.0.split('.').map(|seg| match seg.parse::<u64>() {
            Ok(n) => Segment::Num(n),
            Err(_) => Segment::Text(seg),
        })
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        // "14.01" and "14.1" have equal segments; the raw string keeps Ord consistent with Eq.
        self.segments()
            .cmp(other.segments())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A playable character as needed for identification and lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Asset identifier, e.g. `MonkeyKing`.
    pub id: String,
    /// Upstream numeric key, e.g. `62`. Absent for roster fallbacks.
    pub key: Option<u32>,
    /// Human-facing name, e.g. `Wukong`.
    pub name: String,
    pub title: String,
    /// Image file name relative to the versioned image directory.
    pub image: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: u32,
    pub name: String,
    pub image: String,
}

pub type ItemCatalog = BTreeMap<u32, ItemRecord>;

/// One decoded upstream payload pinned to the version it was fetched for.
///
/// Entries are replaced wholesale, never mutated in place.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub version: VersionTag,
    pub payload: Arc<T>,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(version: VersionTag, payload: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            version,
            payload: Arc::new(payload),
            fetched_at,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version.clone(),
            payload: Arc::clone(&self.payload),
            fetched_at: self.fetched_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from an entry for the current version within its TTL, or just fetched.
    Fresh,
    /// Upstream failed; served the last known-good entry.
    Stale,
    /// Upstream failed and nothing was cached yet; payload is empty.
    Unavailable,
}

/// Read-only view handed to callers of the reference cache.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub version: VersionTag,
    pub data: Arc<T>,
    pub freshness: Freshness,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            version: self.version.clone(),
            data: Arc::clone(&self.data),
            freshness: self.freshness,
        }
    }
}

impl<T> std::ops::Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

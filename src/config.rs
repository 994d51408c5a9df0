use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::VersionTag;

const DEFAULT_DDRAGON_BASE: &str = "https://ddragon.leagueoflegends.com";
const DEFAULT_LOCALE: &str = "en_US";
const DEFAULT_FALLBACK_VERSION: &str = "14.24.1";
const DEFAULT_LEGACY_ITEM_VERSION: &str = "10.23.1";
const DEFAULT_LEGACY_ITEM_IDS: &[u32] = &[3174, 3175];
const DEFAULT_PREDICTOR_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictorMode {
    Http,
    Mock,
}

#[derive(Debug, Clone)]
pub struct RefDataConfig {
    pub ddragon_base: String,
    pub locale: String,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
    pub fallback_version: VersionTag,
    pub legacy_item_version: VersionTag,
    pub legacy_item_ids: BTreeSet<u32>,
    pub alias_file: Option<PathBuf>,
    pub search_limit: usize,
    pub search_min_score: f64,
    pub predictor_url: String,
    pub predictor_key: Option<String>,
    pub predictor_mode: PredictorMode,
}

impl Default for RefDataConfig {
    fn default() -> Self {
        Self {
            ddragon_base: DEFAULT_DDRAGON_BASE.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            cache_ttl: Duration::from_secs(3600),
            http_timeout: Duration::from_secs(8),
            fallback_version: VersionTag::new(DEFAULT_FALLBACK_VERSION),
            legacy_item_version: VersionTag::new(DEFAULT_LEGACY_ITEM_VERSION),
            legacy_item_ids: DEFAULT_LEGACY_ITEM_IDS.iter().copied().collect(),
            alias_file: None,
            search_limit: 10,
            search_min_score: 0.3,
            predictor_url: DEFAULT_PREDICTOR_URL.to_string(),
            predictor_key: None,
            predictor_mode: PredictorMode::Http,
        }
    }
}

impl RefDataConfig {
    /// Reads `RIFT_*` variables, falling back to defaults for anything unset or malformed.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cache_ttl_secs = env::var("RIFT_CACHE_TTL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.cache_ttl.as_secs())
            .clamp(10, 86_400);
        let http_timeout_secs = env::var("RIFT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.http_timeout.as_secs())
            .clamp(1, 30);
        let search_limit = env::var("RIFT_SEARCH_LIMIT")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.search_limit)
            .clamp(1, 50);
        let search_min_score = env::var("RIFT_SEARCH_MIN_SCORE")
            .ok()
            .and_then(|val| val.parse::<f64>().ok())
            .filter(|val| val.is_finite())
            .unwrap_or(defaults.search_min_score)
            .clamp(0.0, 1.0);
        let legacy_item_ids = opt_env("RIFT_LEGACY_ITEM_IDS")
            .map(|raw| parse_id_list(&raw))
            .unwrap_or(defaults.legacy_item_ids);
        let predictor_mode = match opt_env("RIFT_PREDICTOR_MODE")
            .map(|val| val.to_lowercase())
            .as_deref()
        {
            Some("mock") => PredictorMode::Mock,
            _ => PredictorMode::Http,
        };

        Self {
            ddragon_base: opt_env("RIFT_DDRAGON_BASE")
                .map(|val| val.trim_end_matches('/').to_string())
                .unwrap_or(defaults.ddragon_base),
            locale: opt_env("RIFT_LOCALE").unwrap_or(defaults.locale),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            http_timeout: Duration::from_secs(http_timeout_secs),
            fallback_version: opt_env("RIFT_FALLBACK_VERSION")
                .map(VersionTag::new)
                .unwrap_or(defaults.fallback_version),
            legacy_item_version: opt_env("RIFT_LEGACY_ITEM_VERSION")
                .map(VersionTag::new)
                .unwrap_or(defaults.legacy_item_version),
            legacy_item_ids,
            alias_file: opt_env("RIFT_ALIAS_FILE").map(PathBuf::from),
            search_limit,
            search_min_score,
            predictor_url: opt_env("RIFT_PREDICTOR_URL")
                .map(|val| val.trim_end_matches('/').to_string())
                .unwrap_or(defaults.predictor_url),
            predictor_key: opt_env("RIFT_PREDICTOR_KEY"),
            predictor_mode,
        }
    }

    pub fn cache_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.cache_ttl).unwrap_or_else(|_| chrono::Duration::hours(1))
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

fn parse_id_list(raw: &str) -> BTreeSet<u32> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_skips_garbage() {
        let ids = parse_id_list(" 3174, abc ,3175,,");
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![3174, 3175]);
    }

    #[test]
    fn defaults_match_upstream_conventions() {
        let cfg = RefDataConfig::default();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.fallback_version.as_str(), "14.24.1");
        assert!(cfg.legacy_item_ids.contains(&3174));
        assert_eq!(cfg.search_limit, 10);
    }
}

use std::collections::BTreeSet;

use crate::config::RefDataConfig;
use crate::model::VersionTag;

/// Builds CDN URLs for character and item artwork.
///
/// Items removed from the game keep their art only under an old snapshot, so
/// ids listed as legacy are always pinned to `legacy_version`.
#[derive(Debug, Clone)]
pub struct AssetUrls {
    base: String,
    locale: String,
    legacy_version: VersionTag,
    legacy_items: BTreeSet<u32>,
}

impl AssetUrls {
    pub fn new(
        base: &str,
        locale: &str,
        legacy_version: VersionTag,
        legacy_items: BTreeSet<u32>,
    ) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            locale: locale.to_string(),
            legacy_version,
            legacy_items,
        }
    }

    pub fn from_config(cfg: &RefDataConfig) -> Self {
        Self::new(
            &cfg.ddragon_base,
            &cfg.locale,
            cfg.legacy_item_version.clone(),
            cfg.legacy_item_ids.clone(),
        )
    }

    pub fn is_legacy_item(&self, id: u32) -> bool {
        self.legacy_items.contains(&id)
    }

    /// The version an item's art must be fetched from.
    pub fn item_version<'a>(&'a self, id: u32, current: &'a VersionTag) -> &'a VersionTag {
        if self.is_legacy_item(id) {
            &self.legacy_version
        } else {
            current
        }
    }

    pub fn item_image_url(&self, version: &VersionTag, id: u32) -> String {
        let version = self.item_version(id, version);
        format!("{}/cdn/{version}/img/item/{id}.png", self.base)
    }

    pub fn character_image_url(&self, version: &VersionTag, canonical_id: &str) -> String {
        format!("{}/cdn/{version}/img/champion/{canonical_id}.png", self.base)
    }

    pub fn character_splash_url(&self, canonical_id: &str) -> String {
        format!("{}/cdn/img/champion/splash/{canonical_id}_0.jpg", self.base)
    }

    /// Extended per-character descriptor; only the URL is provided here.
    pub fn character_detail_url(&self, version: &VersionTag, canonical_id: &str) -> String {
        format!(
            "{}/cdn/{version}/data/{}/champion/{canonical_id}.json",
            self.base, self.locale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls() -> AssetUrls {
        AssetUrls::from_config(&RefDataConfig::default())
    }

    #[test]
    fn legacy_items_pin_to_historical_version() {
        let current = VersionTag::new("14.24.1");
        let u = urls();
        assert_eq!(
            u.item_image_url(&current, 3174),
            "https://ddragon.leagueoflegends.com/cdn/10.23.1/img/item/3174.png"
        );
        assert_eq!(
            u.item_image_url(&current, 3031),
            "https://ddragon.leagueoflegends.com/cdn/14.24.1/img/item/3031.png"
        );
    }

    #[test]
    fn splash_is_unversioned() {
        assert_eq!(
            urls().character_splash_url("MonkeyKing"),
            "https://ddragon.leagueoflegends.com/cdn/img/champion/splash/MonkeyKing_0.jpg"
        );
    }
}

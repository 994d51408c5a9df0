use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::config::RefDataConfig;
use crate::error::{FetchError, FetchResult};
use crate::http_client::http_client;
use crate::model::{CharacterRecord, ItemCatalog, ItemRecord, VersionTag};

/// Read-only upstream that publishes versioned reference data.
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// Known versions, newest first.
    async fn versions(&self) -> FetchResult<Vec<VersionTag>>;
    async fn characters(&self, version: &VersionTag) -> FetchResult<Vec<CharacterRecord>>;
    async fn items(&self, version: &VersionTag) -> FetchResult<ItemCatalog>;
}

/// Data Dragon over HTTP.
#[derive(Debug, Clone)]
pub struct DataDragonSource {
    client: Client,
    base: String,
    locale: String,
}

impl DataDragonSource {
    pub fn new(cfg: &RefDataConfig) -> Result<Self> {
        let client = http_client(cfg.http_timeout)?.clone();
        Ok(Self::with_client(client, &cfg.ddragon_base, &cfg.locale))
    }

    pub fn with_client(client: Client, base: &str, locale: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            locale: locale.to_string(),
        }
    }

    pub fn versions_url(&self) -> String {
        format!("{}/api/versions.json", self.base)
    }

    pub fn characters_url(&self, version: &VersionTag) -> String {
        format!("{}/cdn/{version}/data/{}/champion.json", self.base, self.locale)
    }

    pub fn items_url(&self, version: &VersionTag) -> String {
        format!("{}/cdn/{version}/data/{}/item.json", self.base, self.locale)
    }

    async fn get_text(&self, url: &str) -> FetchResult<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::network(url, &err))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.text().await.map_err(|err| FetchError::network(url, &err))
    }
}

#[async_trait]
impl ReferenceSource for DataDragonSource {
    async fn versions(&self) -> FetchResult<Vec<VersionTag>> {
        let url = self.versions_url();
        let body = self.get_text(&url).await?;
        parse_versions_json(&body).map_err(|err| FetchError::decode(&url, format!("{err:#}")))
    }

    async fn characters(&self, version: &VersionTag) -> FetchResult<Vec<CharacterRecord>> {
        let url = self.characters_url(version);
        let body = self.get_text(&url).await?;
        parse_characters_json(&body).map_err(|err| FetchError::decode(&url, format!("{err:#}")))
    }

    async fn items(&self, version: &VersionTag) -> FetchResult<ItemCatalog> {
        let url = self.items_url(version);
        let body = self.get_text(&url).await?;
        parse_items_json(&body).map_err(|err| FetchError::decode(&url, format!("{err:#}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct DataEnvelope<T> {
    #[serde(default)]
    data: BTreeMap<String, T>,
}

#[derive(Debug, Deserialize)]
struct ImageDto {
    full: String,
}

#[derive(Debug, Deserialize)]
struct ChampionDto {
    id: String,
    #[serde(default)]
    key: Option<String>,
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    image: Option<ImageDto>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ItemDto {
    name: String,
    #[serde(default)]
    image: Option<ImageDto>,
}

pub fn parse_versions_json(raw: &str) -> Result<Vec<VersionTag>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let versions: Vec<String> = serde_json::from_str(trimmed).context("invalid versions json")?;
    Ok(versions
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(VersionTag::new)
        .collect())
}

/// Decodes a `champion.json` payload into records ordered by canonical id.
pub fn parse_characters_json(raw: &str) -> Result<Vec<CharacterRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let envelope: DataEnvelope<ChampionDto> =
        serde_json::from_str(trimmed).context("invalid champion json")?;

    let mut out = Vec::with_capacity(envelope.data.len());
    for (_, dto) in envelope.data {
        let image = dto
            .image
            .map(|img| img.full)
            .unwrap_or_else(|| format!("{}.png", dto.id));
        out.push(CharacterRecord {
            key: dto.key.as_deref().and_then(|k| k.trim().parse::<u32>().ok()),
            image,
            name: dto.name,
            title: dto.title,
            tags: dto.tags.into_iter().collect::<BTreeSet<_>>(),
            id: dto.id,
        });
    }
    out.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(out)
}

pub fn parse_items_json(raw: &str) -> Result<ItemCatalog> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ItemCatalog::new());
    }
    let envelope: DataEnvelope<ItemDto> =
        serde_json::from_str(trimmed).context("invalid item json")?;

    let mut out = ItemCatalog::new();
    for (raw_id, dto) in envelope.data {
        let Ok(id) = raw_id.trim().parse::<u32>() else {
            tracing::debug!(item = %raw_id, "skipping non-numeric item id");
            continue;
        };
        let image = dto
            .image
            .map(|img| img.full)
            .unwrap_or_else(|| format!("{id}.png"));
        out.insert(
            id,
            ItemRecord {
                id,
                name: dto.name,
                image,
            },
        );
    }
    Ok(out)
}

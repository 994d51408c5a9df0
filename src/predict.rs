use std::sync::{Mutex, PoisonError};

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{PredictorMode, RefDataConfig};
use crate::error::{FetchError, FetchResult};
use crate::http_client::http_client;
use crate::model::CharacterRecord;
use crate::normalize::NameNormalizer;

const MATCHUP_PATH: &str = "/api/predict-champion-matchup";
const ITEMS_PATH: &str = "/api/item-recommendations";
const API_KEY_HEADER: &str = "X-INTERNAL-API-KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupDetails {
    #[serde(default)]
    pub blue_avg_winrate: f64,
    #[serde(default)]
    pub red_avg_winrate: f64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub accuracy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupPrediction {
    pub blue_win_probability: f64,
    pub red_win_probability: f64,
    pub prediction: String,
    pub confidence: String,
    #[serde(default)]
    pub details: Option<MatchupDetails>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecommendation {
    pub item_id: u32,
    pub games: u32,
    pub wins: u32,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBuild {
    pub items: Vec<u32>,
    pub games: u32,
    pub wins: u32,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecommendationResponse {
    #[serde(default)]
    pub champion: String,
    #[serde(default)]
    pub recommended_items: Vec<ItemRecommendation>,
    #[serde(default)]
    pub popular_builds: Vec<ItemBuild>,
}

/// Win-probability and build recommendations for a draft.
///
/// Unlike reference lookups these are not fail-soft; the caller decides how
/// to present a backend outage.
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict_matchup(&self, blue: &[String], red: &[String]) -> FetchResult<MatchupPrediction>;

    async fn item_recommendations(
        &self,
        champion: &str,
        enemy_team: &[String],
        top_n: usize,
    ) -> FetchResult<ItemRecommendationResponse>;
}

pub fn backend_from_config(cfg: &RefDataConfig) -> Result<Box<dyn PredictionBackend>> {
    Ok(match cfg.predictor_mode {
        PredictorMode::Http => Box::new(HttpPredictor::new(cfg)?),
        PredictorMode::Mock => Box::new(MockPredictor::from_entropy()),
    })
}

/// Client for the external prediction service.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    client: Client,
    base: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct MatchupRequest<'a> {
    blue_champions: &'a [String],
    red_champions: &'a [String],
}

#[derive(Serialize)]
struct ItemsRequest<'a> {
    champion: &'a str,
    enemy_team: &'a [String],
    top_n: usize,
}

impl HttpPredictor {
    pub fn new(cfg: &RefDataConfig) -> Result<Self> {
        let client = http_client(cfg.http_timeout)?.clone();
        Ok(Self::with_client(
            client,
            &cfg.predictor_url,
            cfg.predictor_key.clone(),
        ))
    }

    pub fn with_client(client: Client, base: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> FetchResult<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{path}", self.base);
        let mut req = self.client.post(&url).json(body);
        if let Some(key) = self.api_key.as_deref() {
            req = req.header(API_KEY_HEADER, key);
        }
        let resp = req
            .send()
            .await
            .map_err(|err| FetchError::network(&url, &err))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let raw = resp
            .text()
            .await
            .map_err(|err| FetchError::network(&url, &err))?;
        serde_json::from_str(&raw).map_err(|err| FetchError::decode(&url, err))
    }
}

#[async_trait]
impl PredictionBackend for HttpPredictor {
    async fn predict_matchup(&self, blue: &[String], red: &[String]) -> FetchResult<MatchupPrediction> {
        let body = MatchupRequest {
            blue_champions: blue,
            red_champions: red,
        };
        self.post_json(MATCHUP_PATH, &body).await
    }

    async fn item_recommendations(
        &self,
        champion: &str,
        enemy_team: &[String],
        top_n: usize,
    ) -> FetchResult<ItemRecommendationResponse> {
        let body = ItemsRequest {
            champion,
            enemy_team,
            top_n,
        };
        self.post_json(ITEMS_PATH, &body).await
    }
}

/// MOCK PREDICTOR: random numbers shaped like backend responses, for demos and
/// offline UI work. Every payload reports model `"mock"`.
#[derive(Debug)]
pub struct MockPredictor {
    rng: Mutex<StdRng>,
    item_pool: Vec<u32>,
}

pub const MOCK_MODEL: &str = "mock";

const MOCK_ITEM_POOL: &[u32] = &[
    3031, 3046, 3072, 3153, 6672, 3089, 3135, 3157, 6653, 3068, 3075, 3143, 3065, 3742, 3006,
    3020, 3047, 3111, 3158,
];

impl MockPredictor {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            item_pool: MOCK_ITEM_POOL.to_vec(),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            item_pool: MOCK_ITEM_POOL.to_vec(),
        }
    }

    pub fn with_item_pool(mut self, pool: Vec<u32>) -> Self {
        self.item_pool = pool;
        self
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut StdRng) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }
}

#[async_trait]
impl PredictionBackend for MockPredictor {
    async fn predict_matchup(&self, _blue: &[String], _red: &[String]) -> FetchResult<MatchupPrediction> {
        let (blue, blue_avg, red_avg) = self.with_rng(|rng| {
            (
                rng.gen_range(0.35..0.65),
                rng.gen_range(0.45..0.55),
                rng.gen_range(0.45..0.55),
            )
        });
        let red = 1.0 - blue;
        Ok(MatchupPrediction {
            blue_win_probability: blue,
            red_win_probability: red,
            prediction: if blue >= red { "Blue" } else { "Red" }.to_string(),
            confidence: confidence_label(blue).to_string(),
            details: Some(MatchupDetails {
                blue_avg_winrate: blue_avg,
                red_avg_winrate: red_avg,
                model: MOCK_MODEL.to_string(),
                accuracy: "n/a".to_string(),
            }),
        })
    }

    async fn item_recommendations(
        &self,
        champion: &str,
        _enemy_team: &[String],
        top_n: usize,
    ) -> FetchResult<ItemRecommendationResponse> {
        let (recommended_items, popular_builds) = self.with_rng(|rng| {
            let recommended = self
                .item_pool
                .choose_multiple(rng, top_n.min(self.item_pool.len()))
                .map(|&item_id| {
                    let games = rng.gen_range(200..5000);
                    let wins = rng.gen_range(games * 2 / 5..games * 3 / 5);
                    ItemRecommendation {
                        item_id,
                        games,
                        wins,
                        win_rate: f64::from(wins) / f64::from(games),
                    }
                })
                .collect::<Vec<_>>();
            let builds = (0..3)
                .map(|_| {
                    let items = self
                        .item_pool
                        .choose_multiple(rng, 6.min(self.item_pool.len()))
                        .copied()
                        .collect::<Vec<_>>();
                    let games = rng.gen_range(50..1500);
                    let wins = rng.gen_range(games * 2 / 5..games * 3 / 5);
                    ItemBuild {
                        items,
                        games,
                        wins,
                        win_rate: f64::from(wins) / f64::from(games),
                    }
                })
                .collect::<Vec<_>>();
            (recommended, builds)
        });
        Ok(ItemRecommendationResponse {
            champion: champion.to_string(),
            recommended_items,
            popular_builds,
        })
    }
}

fn confidence_label(p: f64) -> &'static str {
    let margin = (p - 0.5).abs();
    if margin >= 0.12 {
        "high"
    } else if margin >= 0.05 {
        "medium"
    } else {
        "low"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamResolution {
    pub resolved: Vec<String>,
    pub unresolved: Vec<String>,
}

impl TeamResolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Canonicalizes a team's names before they are sent to a backend.
pub fn resolve_team(
    normalizer: &NameNormalizer,
    characters: &[CharacterRecord],
    names: &[String],
) -> TeamResolution {
    let mut out = TeamResolution::default();
    for name in names {
        match normalizer.resolve_canonical_id(name, characters) {
            Some(id) => out.resolved.push(id),
            None => out.unresolved.push(name.clone()),
        }
    }
    out
}

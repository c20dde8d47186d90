//! Reward catalog and rarity draw.
//!
//! # Responsibility
//! - Hold the static reward table consulted when a click threshold trips.
//! - Draw one reward uniformly or by tiered rarity.
//!
//! # Invariants
//! - Tier probabilities sum to 1 (within `PROBABILITY_EPSILON`).
//! - Every tier has at least one prize.
//! - Tiers are kept ordered rarest first; the last tier is the most common.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PROBABILITY_EPSILON: f64 = 1e-6;

/// One catalog entry delivered to the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    /// Filled from the owning tier when the catalog is built.
    #[serde(default)]
    pub rarity_tier: String,
}

/// Probability band with its prize list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityTier {
    pub name: String,
    pub probability: f64,
    pub prizes: Vec<Reward>,
}

/// How a reward is picked from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    /// Every prize in every tier is equally likely.
    Uniform,
    /// Cumulative-probability walk over tiers, then uniform within the tier.
    #[default]
    WeightedRarity,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    draw_mode: DrawMode,
    tiers: Vec<RarityTier>,
}

/// Catalog construction errors.
#[derive(Debug)]
pub enum CatalogError {
    Empty,
    EmptyTier(String),
    InvalidProbability { tier: String, probability: f64 },
    ProbabilitySum(f64),
    Parse(serde_json::Error),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "reward catalog has no tiers"),
            Self::EmptyTier(name) => write!(f, "rarity tier `{name}` has no prizes"),
            Self::InvalidProbability { tier, probability } => write!(
                f,
                "rarity tier `{tier}` has invalid probability {probability}"
            ),
            Self::ProbabilitySum(sum) => {
                write!(f, "tier probabilities must sum to 1, got {sum}")
            }
            Self::Parse(err) => write!(f, "invalid reward catalog json: {err}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Validated reward table.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardCatalog {
    draw_mode: DrawMode,
    tiers: Vec<RarityTier>,
}

impl RewardCatalog {
    /// Builds a catalog, ordering tiers rarest first.
    ///
    /// # Errors
    /// - `Empty` when no tiers are given.
    /// - `EmptyTier` when a tier has no prizes.
    /// - `InvalidProbability` for probabilities outside `(0, 1]`.
    /// - `ProbabilitySum` when probabilities do not sum to 1.
    pub fn new(draw_mode: DrawMode, mut tiers: Vec<RarityTier>) -> Result<Self, CatalogError> {
        if tiers.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut sum = 0.0;
        for tier in &mut tiers {
            if tier.prizes.is_empty() {
                return Err(CatalogError::EmptyTier(tier.name.clone()));
            }
            if !tier.probability.is_finite() || tier.probability <= 0.0 || tier.probability > 1.0
            {
                return Err(CatalogError::InvalidProbability {
                    tier: tier.name.clone(),
                    probability: tier.probability,
                });
            }
            sum += tier.probability;
            for prize in &mut tier.prizes {
                prize.rarity_tier = tier.name.clone();
            }
        }
        if (sum - 1.0).abs() > PROBABILITY_EPSILON {
            return Err(CatalogError::ProbabilitySum(sum));
        }

        tiers.sort_by(|a, b| a.probability.total_cmp(&b.probability));
        Ok(Self { draw_mode, tiers })
    }

    /// Single-tier catalog where every prize is equally likely.
    pub fn flat(prizes: Vec<Reward>) -> Result<Self, CatalogError> {
        Self::new(
            DrawMode::Uniform,
            vec![RarityTier {
                name: "common".to_string(),
                probability: 1.0,
                prizes,
            }],
        )
    }

    /// Parses `{ "draw_mode": "...", "tiers": [...] }`.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Self::new(file.draw_mode, file.tiers)
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Tiers ordered rarest first.
    pub fn tiers(&self) -> &[RarityTier] {
        &self.tiers
    }

    pub fn prize_count(&self) -> usize {
        self.tiers.iter().map(|tier| tier.prizes.len()).sum()
    }

    /// Picks the tier for a uniform roll `u` in `[0, 1)`.
    ///
    /// Falls back to the most common tier when rounding leaves `u`
    /// unconsumed.
    pub fn select_tier(&self, u: f64) -> &RarityTier {
        let mut cumulative = 0.0;
        for tier in &self.tiers {
            cumulative += tier.probability;
            if u < cumulative {
                return tier;
            }
        }
        &self.tiers[self.tiers.len() - 1]
    }

    /// Draws one reward according to the catalog's draw mode.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Reward {
        match self.draw_mode {
            DrawMode::Uniform => {
                let mut index = rng.gen_range(0..self.prize_count());
                for tier in &self.tiers {
                    if index < tier.prizes.len() {
                        return tier.prizes[index].clone();
                    }
                    index -= tier.prizes.len();
                }
                self.most_common_fallback(rng)
            }
            DrawMode::WeightedRarity => {
                let u: f64 = rng.gen();
                let tier = self.select_tier(u);
                tier.prizes[rng.gen_range(0..tier.prizes.len())].clone()
            }
        }
    }

    fn most_common_fallback<R: Rng + ?Sized>(&self, rng: &mut R) -> Reward {
        let tier = &self.tiers[self.tiers.len() - 1];
        tier.prizes[rng.gen_range(0..tier.prizes.len())].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, DrawMode, RarityTier, Reward, RewardCatalog};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn prize(name: &str) -> Reward {
        Reward {
            name: name.to_string(),
            description: format!("{name} description"),
            icon: format!("{name}.png"),
            rarity_tier: String::new(),
        }
    }

    fn tiered() -> RewardCatalog {
        RewardCatalog::new(
            DrawMode::WeightedRarity,
            vec![
                RarityTier {
                    name: "common".to_string(),
                    probability: 0.7,
                    prizes: vec![prize("sticker"), prize("badge")],
                },
                RarityTier {
                    name: "legendary".to_string(),
                    probability: 0.05,
                    prizes: vec![prize("backstage pass")],
                },
                RarityTier {
                    name: "rare".to_string(),
                    probability: 0.25,
                    prizes: vec![prize("t-shirt")],
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn tiers_are_sorted_rarest_first_and_tagged() {
        let catalog = tiered();
        let names: Vec<_> = catalog.tiers().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["legendary", "rare", "common"]);
        assert_eq!(catalog.tiers()[0].prizes[0].rarity_tier, "legendary");
    }

    #[test]
    fn select_tier_walks_cumulative_bounds() {
        let catalog = tiered();
        assert_eq!(catalog.select_tier(0.0).name, "legendary");
        assert_eq!(catalog.select_tier(0.049).name, "legendary");
        assert_eq!(catalog.select_tier(0.05).name, "rare");
        assert_eq!(catalog.select_tier(0.299).name, "rare");
        assert_eq!(catalog.select_tier(0.5).name, "common");
    }

    #[test]
    fn select_tier_falls_back_to_most_common_on_drift() {
        let catalog = tiered();
        assert_eq!(catalog.select_tier(1.0).name, "common");
        assert_eq!(catalog.select_tier(1.5).name, "common");
    }

    #[test]
    fn probabilities_must_sum_to_one() {
        let err = RewardCatalog::new(
            DrawMode::WeightedRarity,
            vec![RarityTier {
                name: "common".to_string(),
                probability: 0.5,
                prizes: vec![prize("sticker")],
            }],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::ProbabilitySum(_)));
    }

    #[test]
    fn empty_catalog_and_tiers_are_rejected() {
        assert!(matches!(
            RewardCatalog::new(DrawMode::Uniform, Vec::new()),
            Err(CatalogError::Empty)
        ));
        assert!(matches!(
            RewardCatalog::flat(Vec::new()),
            Err(CatalogError::EmptyTier(_))
        ));
    }

    #[test]
    fn draw_always_returns_catalog_prize() {
        let catalog = tiered();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let reward = catalog.draw(&mut rng);
            assert!(["sticker", "badge", "backstage pass", "t-shirt"]
                .contains(&reward.name.as_str()));
        }
    }

    #[test]
    fn uniform_draw_reaches_every_prize() {
        let catalog = RewardCatalog::flat(vec![prize("a"), prize("b"), prize("c")]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..300 {
            seen.insert(catalog.draw(&mut rng).name);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn catalog_parses_from_json() {
        let catalog = RewardCatalog::from_json_str(
            r#"{
                "draw_mode": "weighted_rarity",
                "tiers": [
                    { "name": "common", "probability": 0.9, "prizes": [{ "name": "sticker" }] },
                    { "name": "rare", "probability": 0.1, "prizes": [{ "name": "poster", "icon": "poster.png" }] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.draw_mode(), DrawMode::WeightedRarity);
        assert_eq!(catalog.tiers()[0].name, "rare");
        assert_eq!(catalog.prize_count(), 2);
    }
}

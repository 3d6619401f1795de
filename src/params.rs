use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::EloError;

pub const PARAMS_VERSION: u32 = 1;

static DEFAULT_PARAMS: OnceCell<EloParams> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EloParams {
    pub version: u32,
    pub initial_rating: f64,
    // Starting rating for teams new to a carried-over season.
    pub promoted_rating: f64,
    pub base_k: f64,
    pub k_caps: Vec<KCapTier>,
    pub k_cap_floor: f64,
    pub opponent: OpponentQualityTable,
    pub venue: VenueTable,
    pub goal_diff: GoalDiffTable,
    pub form: FormTable,
    pub defensive: DefensiveTable,
    pub blowout: BlowoutBonus,
    pub calibration: CalibrationParams,
    pub prediction: PredictionParams,
    // Used only when no reference season has been calibrated.
    pub fallback_draw_rate: f64,
    pub fallback_home_advantage: f64,
}

/// Cap applied to the adjusted K while the pre-match rating is below `below`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KCapTier {
    pub below: f64,
    pub cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpponentQualityTable {
    pub upset_gap_scale: f64,
    pub upset_max: f64,
    pub favourite_gap_scale: f64,
    pub favourite_min: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VenueTable {
    pub home_win: f64,
    pub home_draw: f64,
    pub home_loss: f64,
    pub away_win: f64,
    pub away_draw: f64,
    pub away_loss: f64,
}

/// Indexed by goal margin minus one; margins past the last entry use the last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDiffTable {
    pub win: Vec<f64>,
    pub loss: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CountTier {
    pub at_least: usize,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTable {
    pub window: usize,
    // Checked in order; first match wins.
    pub win_tiers: Vec<CountTier>,
    pub losing_run: CountTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefensiveTable {
    pub clean_sheet_win: f64,
    pub win_concede_one: f64,
    pub win_concede_more: f64,
    pub shutout_loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlowoutBonus {
    pub per_goal: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    // Per-team home advantage = base + home_win_rate * slope (rating points).
    pub home_advantage_base: f64,
    pub home_advantage_slope: f64,
    pub clean_sheet_weight: f64,
    pub conceded_ceiling: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionParams {
    pub closeness_window: f64,
    pub closeness_max_bonus: f64,
    pub elite_threshold: f64,
    pub elite_bonus: f64,
    pub defensive_weight: f64,
    pub neutral_defence: f64,
    pub draw_floor: f64,
    pub draw_ceiling: f64,
    pub renormalize_tolerance: f64,
    pub single_threshold: f64,
    pub double_threshold: f64,
    pub high_confidence: f64,
    pub medium_confidence: f64,
}

impl Default for EloParams {
    fn default() -> Self {
        Self {
            version: PARAMS_VERSION,
            initial_rating: 1500.0,
            promoted_rating: 1400.0,
            base_k: 20.0,
            k_caps: vec![
                KCapTier { below: 1400.0, cap: 75.0 },
                KCapTier { below: 1500.0, cap: 60.0 },
                KCapTier { below: 1600.0, cap: 50.0 },
                KCapTier { below: 1700.0, cap: 40.0 },
            ],
            k_cap_floor: 35.0,
            opponent: OpponentQualityTable {
                upset_gap_scale: 400.0,
                upset_max: 2.0,
                favourite_gap_scale: 800.0,
                favourite_min: 0.6,
            },
            venue: VenueTable {
                home_win: 1.0,
                home_draw: 0.9,
                home_loss: 0.9,
                away_win: 1.35,
                away_draw: 1.15,
                away_loss: 1.15,
            },
            goal_diff: GoalDiffTable {
                win: vec![1.0, 1.15, 1.3, 1.5],
                loss: vec![1.0, 0.9, 0.8, 0.7],
            },
            form: FormTable {
                window: 5,
                win_tiers: vec![
                    CountTier { at_least: 5, multiplier: 1.2 },
                    CountTier { at_least: 4, multiplier: 1.15 },
                    CountTier { at_least: 3, multiplier: 1.1 },
                ],
                losing_run: CountTier { at_least: 3, multiplier: 0.85 },
            },
            defensive: DefensiveTable {
                clean_sheet_win: 1.15,
                win_concede_one: 1.0,
                win_concede_more: 0.95,
                shutout_loss: 0.9,
            },
            blowout: BlowoutBonus { per_goal: 0.1, max: 0.3 },
            calibration: CalibrationParams::default(),
            prediction: PredictionParams::default(),
            fallback_draw_rate: 0.2494,
            fallback_home_advantage: 50.0,
        }
    }
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            home_advantage_base: 30.0,
            home_advantage_slope: 40.0,
            clean_sheet_weight: 0.7,
            conceded_ceiling: 2.0,
        }
    }
}

impl Default for PredictionParams {
    fn default() -> Self {
        Self {
            closeness_window: 200.0,
            closeness_max_bonus: 0.10,
            elite_threshold: 1650.0,
            elite_bonus: 0.08,
            defensive_weight: 0.06,
            neutral_defence: 0.5,
            draw_floor: 0.15,
            draw_ceiling: 0.40,
            renormalize_tolerance: 1e-3,
            single_threshold: 0.40,
            double_threshold: 0.60,
            high_confidence: 0.6,
            medium_confidence: 0.5,
        }
    }
}

impl EloParams {
    /// Process-wide default bundle, built once.
    pub fn shared_default() -> &'static EloParams {
        DEFAULT_PARAMS.get_or_init(EloParams::default)
    }

    pub fn validate(&self) -> std::result::Result<(), EloError> {
        if self.version != PARAMS_VERSION {
            return Err(EloError::UnsupportedVersion {
                found: self.version,
                expected: PARAMS_VERSION,
            });
        }
        let mut prev: Option<KCapTier> = None;
        for tier in &self.k_caps {
            if let Some(p) = prev {
                if tier.below <= p.below {
                    return Err(invalid("k_caps thresholds must be strictly ascending"));
                }
                if tier.cap > p.cap {
                    return Err(invalid("k_caps must not increase with rating"));
                }
            }
            prev = Some(*tier);
        }
        if let Some(last) = prev {
            if self.k_cap_floor > last.cap {
                return Err(invalid("k_cap_floor exceeds the highest tier cap"));
            }
        }
        if self.base_k <= 0.0 {
            return Err(invalid("base_k must be positive"));
        }
        if self.form.window == 0 {
            return Err(invalid("form window must be at least one match"));
        }
        if self.goal_diff.win.is_empty() || self.goal_diff.loss.is_empty() {
            return Err(invalid("goal difference tables must not be empty"));
        }
        let p = &self.prediction;
        if !(0.0..=1.0).contains(&p.draw_floor) || p.draw_floor > p.draw_ceiling || p.draw_ceiling > 1.0 {
            return Err(invalid("draw band must satisfy 0 <= floor <= ceiling <= 1"));
        }
        if p.closeness_window <= 0.0 {
            return Err(invalid("closeness window must be positive"));
        }
        if !(0.0..=1.0).contains(&self.calibration.clean_sheet_weight) {
            return Err(invalid("clean_sheet_weight must lie in [0, 1]"));
        }
        if self.calibration.conceded_ceiling <= 0.0 {
            return Err(invalid("conceded_ceiling must be positive"));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read parameter bundle {}", path.display()))?;
        let params: EloParams =
            serde_json::from_str(&raw).context("parse parameter bundle")?;
        params.validate()?;
        Ok(params)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("serialize parameter bundle")?;
        fs::write(&tmp, json).context("write parameter bundle")?;
        fs::rename(&tmp, path).context("swap parameter bundle")?;
        Ok(())
    }
}

fn invalid(reason: &str) -> EloError {
    EloError::InvalidParams {
        reason: reason.to_string(),
    }
}

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calibration::Baseline;
use crate::elo::expected_home;
use crate::matches::{MatchRecord, Outcome};
use crate::params::{EloParams, PredictionParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    HomeWin,
    Draw,
    AwayWin,
    HomeOrDraw,
    AwayOrDraw,
}

impl Recommendation {
    pub fn covers(self, outcome: Outcome) -> bool {
        match self {
            Recommendation::HomeWin => outcome == Outcome::Home,
            Recommendation::Draw => outcome == Outcome::Draw,
            Recommendation::AwayWin => outcome == Outcome::Away,
            Recommendation::HomeOrDraw => outcome != Outcome::Away,
            Recommendation::AwayOrDraw => outcome != Outcome::Home,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::HomeWin => "Home Win",
            Recommendation::Draw => "Draw",
            Recommendation::AwayWin => "Away Win",
            Recommendation::HomeOrDraw => "Home/Draw",
            Recommendation::AwayOrDraw => "Away/Draw",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub home_or_draw: f64,
    pub away_or_draw: f64,
    pub recommended: Recommendation,
    pub recommended_prob: f64,
    pub confidence: Confidence,
}

/// Defensive quality scores in [0, 1] for both sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefensivePair {
    pub home: f64,
    pub away: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchForecast {
    pub match_id: u64,
    #[serde(with = "crate::matches::match_date")]
    pub date: NaiveDateTime,
    pub league: String,
    pub home: String,
    pub away: String,
    pub home_rating: f64,
    pub away_rating: f64,
    // Set when either rating fell back to the initial constant.
    pub missing_history: bool,
    pub forecast: Forecast,
}

pub fn draw_probability(
    home_rating: f64,
    away_rating: f64,
    base_draw_rate: f64,
    defence: Option<DefensivePair>,
    params: &PredictionParams,
) -> f64 {
    let gap = (home_rating - away_rating).abs().min(params.closeness_window);
    let closeness = params.closeness_max_bonus * (params.closeness_window - gap) / params.closeness_window;

    let elite = if home_rating > params.elite_threshold && away_rating > params.elite_threshold {
        params.elite_bonus
    } else {
        0.0
    };

    let defensive = defence
        .map(|d| ((d.home + d.away) / 2.0 - params.neutral_defence) * params.defensive_weight)
        .unwrap_or(0.0);

    (base_draw_rate * (1.0 + closeness + elite + defensive)).clamp(params.draw_floor, params.draw_ceiling)
}

/// Forward-looking forecast. Multipliers are deliberately absent here; they only
/// shape historical rating updates.
pub fn predict(
    home_rating: f64,
    away_rating: f64,
    home_advantage: f64,
    base_draw_rate: f64,
    defence: Option<DefensivePair>,
    params: &PredictionParams,
) -> Forecast {
    let exp_home = expected_home(home_rating, away_rating, home_advantage);
    let exp_away = 1.0 - exp_home;

    let mut draw = draw_probability(home_rating, away_rating, base_draw_rate, defence, params);
    let remaining = 1.0 - draw;
    let mut home = exp_home * remaining;
    let mut away = exp_away * remaining;

    let total = home + draw + away;
    if (total - 1.0).abs() > params.renormalize_tolerance {
        home /= total;
        draw /= total;
        away /= total;
    }

    let home_or_draw = home + draw;
    let away_or_draw = away + draw;

    let (recommended, recommended_prob) = recommend(home, draw, away, home_or_draw, away_or_draw, params);
    Forecast {
        home,
        draw,
        away,
        home_or_draw,
        away_or_draw,
        recommended,
        recommended_prob,
        confidence: confidence_label(recommended_prob, params),
    }
}

fn recommend(
    home: f64,
    draw: f64,
    away: f64,
    home_or_draw: f64,
    away_or_draw: f64,
    params: &PredictionParams,
) -> (Recommendation, f64) {
    let best_single = best_of(&[
        (Recommendation::HomeWin, home),
        (Recommendation::Draw, draw),
        (Recommendation::AwayWin, away),
    ]);
    if best_single.1 >= params.single_threshold {
        return best_single;
    }
    let best_double = best_of(&[
        (Recommendation::HomeOrDraw, home_or_draw),
        (Recommendation::AwayOrDraw, away_or_draw),
    ]);
    if best_double.1 > params.double_threshold {
        return best_double;
    }
    best_single
}

// Earlier entries win ties.
fn best_of(options: &[(Recommendation, f64)]) -> (Recommendation, f64) {
    let mut best = options[0];
    for opt in &options[1..] {
        if opt.1 > best.1 {
            best = *opt;
        }
    }
    best
}

pub fn confidence_label(prob: f64, params: &PredictionParams) -> Confidence {
    if prob > params.high_confidence {
        Confidence::High
    } else if prob > params.medium_confidence {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Forecasts every pending match from a ratings snapshot. Pure: call it again
/// to regenerate. Played matches in `pending` are skipped, as are records
/// naming the same team on both sides.
pub fn forecast_all(
    ratings: &HashMap<String, f64>,
    params: &EloParams,
    baseline: &Baseline,
    pending: &[MatchRecord],
) -> Vec<MatchForecast> {
    pending
        .par_iter()
        .filter(|m| !m.is_played() && m.home != m.away)
        .map(|m| forecast_match(ratings, params, baseline, m))
        .collect()
}

pub fn forecast_match(
    ratings: &HashMap<String, f64>,
    params: &EloParams,
    baseline: &Baseline,
    m: &MatchRecord,
) -> MatchForecast {
    let home_known = ratings.get(&m.home).copied();
    let away_known = ratings.get(&m.away).copied();
    let missing_history = home_known.is_none() || away_known.is_none();
    if missing_history {
        warn!(
            match_id = m.id,
            home = %m.home,
            away = %m.away,
            "no rating history; forecasting with the initial rating"
        );
    }
    let home_rating = home_known.unwrap_or(params.initial_rating);
    let away_rating = away_known.unwrap_or(params.initial_rating);

    let neutral = params.prediction.neutral_defence;
    let defence = DefensivePair {
        home: baseline.defensive_score(&m.home).unwrap_or(neutral),
        away: baseline.defensive_score(&m.away).unwrap_or(neutral),
    };

    let mut forecast = predict(
        home_rating,
        away_rating,
        baseline.avg_home_advantage,
        baseline.draw_rate,
        Some(defence),
        &params.prediction,
    );
    if missing_history {
        forecast.confidence = Confidence::Low;
    }

    MatchForecast {
        match_id: m.id,
        date: m.date,
        league: m.league.clone(),
        home: m.home.clone(),
        away: m.away.clone(),
        home_rating,
        away_rating,
        missing_history,
        forecast,
    }
}

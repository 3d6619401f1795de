use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::matches::{MatchRecord, Outcome};
use crate::win_prob::{Forecast, MatchForecast};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HitRate {
    pub correct: usize,
    pub total: usize,
}

impl HitRate {
    fn record(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.correct += 1;
        }
    }

    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub overall: HitRate,
    pub by_league: BTreeMap<String, HitRate>,
    pub metrics: Metrics,
}

/// Scores stored forecasts against results that have since been played.
/// Forecasts whose match is still unplayed (or unknown) are left out.
pub fn evaluate(forecasts: &[MatchForecast], results: &[MatchRecord]) -> AccuracyReport {
    let outcomes: HashMap<u64, Outcome> = results
        .iter()
        .filter_map(|m| m.outcome().map(|o| (m.id, o)))
        .collect();

    let mut report = AccuracyReport::default();
    let mut probs = Vec::new();
    let mut actual = Vec::new();

    for f in forecasts {
        let Some(outcome) = outcomes.get(&f.match_id).copied() else {
            continue;
        };
        let hit = f.forecast.recommended.covers(outcome);
        report.overall.record(hit);
        report.by_league.entry(f.league.clone()).or_default().record(hit);
        probs.push(f.forecast);
        actual.push(outcome);
    }

    report.metrics = evaluate_probs(&probs, &actual);
    report
}

pub fn evaluate_probs(predictions: &[Forecast], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::default();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let (yh, yd, ya) = one_hot(*outcome);
        brier_sum += (p.home - yh).powi(2) + (p.draw - yd).powi(2) + (p.away - ya).powi(2);

        let actual_prob = match outcome {
            Outcome::Home => p.home,
            Outcome::Draw => p.draw,
            Outcome::Away => p.away,
        }
        .clamp(1e-12, 1.0);
        log_loss_sum += -actual_prob.ln();

        if argmax(p) == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

fn argmax(p: &Forecast) -> Outcome {
    if p.home >= p.draw && p.home >= p.away {
        Outcome::Home
    } else if p.draw >= p.away {
        Outcome::Draw
    } else {
        Outcome::Away
    }
}

fn one_hot(outcome: Outcome) -> (f64, f64, f64) {
    match outcome {
        Outcome::Home => (1.0, 0.0, 0.0),
        Outcome::Draw => (0.0, 1.0, 0.0),
        Outcome::Away => (0.0, 0.0, 1.0),
    }
}

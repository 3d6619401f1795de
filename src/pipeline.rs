use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibration::{self, Baseline};
use crate::engine::{RatedMatch, RatingEngine};
use crate::matches::MatchRecord;
use crate::params::EloParams;
use crate::standings::{self, StandingsRow};
use crate::win_prob::{self, MatchForecast};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonReport {
    pub params_version: u32,
    pub baseline: Baseline,
    pub reference_ratings: BTreeMap<String, f64>,
    pub current_ratings: BTreeMap<String, f64>,
    pub promoted: Vec<String>,
    pub ledger: Vec<RatedMatch>,
    pub standings: Vec<StandingsRow>,
    pub forecasts: Vec<MatchForecast>,
}

impl SeasonReport {
    /// Current ratings best first.
    pub fn rankings(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .current_ratings
            .iter()
            .map(|(t, r)| (t.clone(), *r))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }
}

/// Calibrates on `reference`, rates it, carries the final ratings into
/// `current`, rates its played matches and forecasts the rest.
pub fn run_season(reference: &[MatchRecord], current: &[MatchRecord], params: &EloParams) -> Result<SeasonReport> {
    params.validate().context("parameter bundle rejected")?;

    let baseline = calibration::calibrate(reference, &params.calibration)
        .context("calibrate reference season")?;
    let home_advantage = baseline.avg_home_advantage;

    let mut reference_engine = RatingEngine::new(params.clone());
    reference_engine.replay(reference, home_advantage);
    let reference_ratings = reference_engine.into_ratings();

    let (mut engine, promoted) = RatingEngine::carry_over(params.clone(), &reference_ratings, current);
    let summary = engine.replay(current, home_advantage);

    let forecasts = win_prob::forecast_all(engine.ratings(), params, &baseline, current);

    let mut table = standings::compute_standings(current);
    standings::attach_rating_ranks(&mut table, &engine.rankings());

    info!(
        reference_teams = reference_ratings.len(),
        promoted = promoted.len(),
        rated = summary.rated,
        forecasts = forecasts.len(),
        "season pipeline finished"
    );

    Ok(SeasonReport {
        params_version: params.version,
        baseline,
        reference_ratings: reference_ratings.into_iter().collect(),
        current_ratings: engine
            .ratings()
            .iter()
            .map(|(t, r)| (t.clone(), *r))
            .collect(),
        promoted,
        ledger: engine.ledger().to_vec(),
        standings: table,
        forecasts,
    })
}

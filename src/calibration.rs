use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EloError, Result};
use crate::matches::{MatchRecord, Outcome};
use crate::params::{CalibrationParams, EloParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub sample_matches: usize,
    pub draw_rate: f64,
    pub home_win_rate: f64,
    pub away_win_rate: f64,
    // Rating points.
    pub avg_home_advantage: f64,
    pub team_home_advantage: BTreeMap<String, TeamVenueRecord>,
    pub team_defence: BTreeMap<String, TeamDefence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamVenueRecord {
    pub home_win_rate: f64,
    pub away_win_rate: f64,
    pub home_advantage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamDefence {
    pub clean_sheet_rate: f64,
    pub avg_goals_conceded: f64,
    pub score: f64,
}

impl Baseline {
    /// Stand-in used when no reference season is available.
    pub fn fallback(params: &EloParams) -> Self {
        Self {
            sample_matches: 0,
            draw_rate: params.fallback_draw_rate,
            home_win_rate: 0.0,
            away_win_rate: 0.0,
            avg_home_advantage: params.fallback_home_advantage,
            team_home_advantage: BTreeMap::new(),
            team_defence: BTreeMap::new(),
        }
    }

    pub fn defensive_score(&self, team: &str) -> Option<f64> {
        self.team_defence.get(team).map(|d| d.score)
    }
}

#[derive(Default)]
struct WinTally {
    wins: usize,
    matches: usize,
}

impl WinTally {
    fn record(&mut self, won: bool) {
        self.matches += 1;
        if won {
            self.wins += 1;
        }
    }

    fn rate(&self) -> f64 {
        if self.matches == 0 {
            0.0
        } else {
            self.wins as f64 / self.matches as f64
        }
    }
}

#[derive(Default)]
struct DefenceTally {
    clean_sheets: usize,
    conceded: u32,
    matches: usize,
}

impl DefenceTally {
    fn record(&mut self, conceded: u8) {
        self.matches += 1;
        self.conceded += u32::from(conceded);
        if conceded == 0 {
            self.clean_sheets += 1;
        }
    }
}

/// Aggregates a finished reference season. Unplayed rows are ignored and the
/// result does not depend on input order.
pub fn calibrate(matches: &[MatchRecord], params: &CalibrationParams) -> Result<Baseline> {
    let mut n = 0usize;
    let mut draws = 0usize;
    let mut home_wins = 0usize;
    let mut away_wins = 0usize;

    let mut home_tally: BTreeMap<&str, WinTally> = BTreeMap::new();
    let mut away_tally: BTreeMap<&str, WinTally> = BTreeMap::new();
    let mut defence_tally: BTreeMap<&str, DefenceTally> = BTreeMap::new();

    for m in matches {
        let Some((hg, ag)) = m.score() else {
            continue;
        };
        n += 1;
        let outcome = Outcome::from_score(hg, ag);
        match outcome {
            Outcome::Home => home_wins += 1,
            Outcome::Draw => draws += 1,
            Outcome::Away => away_wins += 1,
        }

        home_tally
            .entry(m.home.as_str())
            .or_default()
            .record(outcome == Outcome::Home);
        away_tally
            .entry(m.away.as_str())
            .or_default()
            .record(outcome == Outcome::Away);
        defence_tally.entry(m.home.as_str()).or_default().record(ag);
        defence_tally.entry(m.away.as_str()).or_default().record(hg);
    }

    if n == 0 {
        return Err(EloError::EmptyReferenceSeason);
    }

    let team_home_advantage: BTreeMap<String, TeamVenueRecord> = home_tally
        .iter()
        .map(|(team, home)| {
            let home_win_rate = home.rate();
            let away_win_rate = away_tally.get(team).map(WinTally::rate).unwrap_or(0.0);
            let record = TeamVenueRecord {
                home_win_rate,
                away_win_rate,
                home_advantage: home_advantage_points(home_win_rate, params),
            };
            (team.to_string(), record)
        })
        .collect();

    let avg_home_advantage = team_home_advantage
        .values()
        .map(|r| r.home_advantage)
        .sum::<f64>()
        / team_home_advantage.len() as f64;

    let team_defence = defence_tally
        .iter()
        .map(|(team, d)| {
            let clean_sheet_rate = d.clean_sheets as f64 / d.matches as f64;
            let avg_goals_conceded = f64::from(d.conceded) / d.matches as f64;
            let defence = TeamDefence {
                clean_sheet_rate,
                avg_goals_conceded,
                score: defensive_score(clean_sheet_rate, avg_goals_conceded, params),
            };
            (team.to_string(), defence)
        })
        .collect();

    let total = n as f64;
    let baseline = Baseline {
        sample_matches: n,
        draw_rate: draws as f64 / total,
        home_win_rate: home_wins as f64 / total,
        away_win_rate: away_wins as f64 / total,
        avg_home_advantage,
        team_home_advantage,
        team_defence,
    };

    info!(
        matches = n,
        draw_rate = baseline.draw_rate,
        home_win_rate = baseline.home_win_rate,
        away_win_rate = baseline.away_win_rate,
        home_advantage = baseline.avg_home_advantage,
        "calibrated reference season"
    );
    Ok(baseline)
}

/// Fixed affine heuristic; swap the constants in `CalibrationParams` to change it.
pub fn home_advantage_points(home_win_rate: f64, params: &CalibrationParams) -> f64 {
    params.home_advantage_base + home_win_rate * params.home_advantage_slope
}

pub fn defensive_score(clean_sheet_rate: f64, avg_goals_conceded: f64, params: &CalibrationParams) -> f64 {
    let w = params.clean_sheet_weight;
    let conceded_term = 1.0 - (avg_goals_conceded / params.conceded_ceiling).min(1.0);
    (w * clean_sheet_rate + (1.0 - w) * conceded_term).clamp(0.0, 1.0)
}

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::elo::{actual_score, expected_home, k_cap};
use crate::matches::{MatchRecord, TeamResult, Venue, chronological};
use crate::multipliers::{self, Multipliers, SideContext};
use crate::params::EloParams;

/// One side of a rated match, with every intermediate of the update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideUpdate {
    pub team: String,
    pub result: TeamResult,
    pub goals_for: u8,
    pub goals_against: u8,
    pub multipliers: Multipliers,
    pub expected: f64,
    pub actual: f64,
    pub k_adjusted: f64,
    pub k_cap: f64,
    pub k_applied: f64,
    pub rating_pre: f64,
    pub rating_post: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatedMatch {
    pub match_id: u64,
    #[serde(with = "crate::matches::match_date")]
    pub date: NaiveDateTime,
    pub season: String,
    pub league: String,
    pub home_advantage: f64,
    pub goal_diff: i16,
    pub home: SideUpdate,
    pub away: SideUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub match_id: u64,
    #[serde(with = "crate::matches::match_date")]
    pub date: NaiveDateTime,
    pub opponent: String,
    pub venue: Venue,
    pub result: TeamResult,
    pub rating_pre: f64,
    pub rating_post: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub rated: usize,
    pub pending: Vec<u64>,
    /// Ids of records naming the same team on both sides.
    pub rejected: Vec<u64>,
}

/// Owns one competition's evolving ratings. Matches must arrive in
/// chronological order; the engine never reorders or deduplicates what it is
/// handed through `process_match`.
#[derive(Debug, Clone)]
pub struct RatingEngine {
    params: EloParams,
    ratings: HashMap<String, f64>,
    seeds: HashMap<String, f64>,
    form: HashMap<String, VecDeque<TeamResult>>,
    ledger: Vec<RatedMatch>,
}

impl RatingEngine {
    pub fn new(params: EloParams) -> Self {
        Self {
            params,
            ratings: HashMap::new(),
            seeds: HashMap::new(),
            form: HashMap::new(),
            ledger: Vec::new(),
        }
    }

    /// Starts from explicit ratings, e.g. another season's final table.
    pub fn with_ratings(params: EloParams, ratings: &HashMap<String, f64>) -> Self {
        let mut engine = Self::new(params);
        for (team, rating) in ratings {
            engine.seed(team, *rating);
        }
        engine
    }

    /// Carries `previous` ratings into a new season. Teams in `upcoming` with no
    /// previous rating start at the promoted rating; their names are returned sorted.
    pub fn carry_over(
        params: EloParams,
        previous: &HashMap<String, f64>,
        upcoming: &[MatchRecord],
    ) -> (Self, Vec<String>) {
        let promoted_rating = params.promoted_rating;
        let mut engine = Self::with_ratings(params, previous);

        let mut promoted: Vec<String> = upcoming
            .iter()
            .flat_map(|m| [m.home.as_str(), m.away.as_str()])
            .filter(|team| !previous.contains_key(*team))
            .collect::<HashSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        promoted.sort();

        for team in &promoted {
            engine.seed(team, promoted_rating);
            info!(team = %team, rating = promoted_rating, "seeded promoted team");
        }
        (engine, promoted)
    }

    fn seed(&mut self, team: &str, rating: f64) {
        self.ratings.insert(team.to_string(), rating);
        self.seeds.insert(team.to_string(), rating);
    }

    fn rating_or_seed(&mut self, team: &str) -> f64 {
        if let Some(r) = self.ratings.get(team) {
            return *r;
        }
        let initial = self.params.initial_rating;
        self.seed(team, initial);
        initial
    }

    pub fn rating(&self, team: &str) -> Option<f64> {
        self.ratings.get(team).copied()
    }

    pub fn ratings(&self) -> &HashMap<String, f64> {
        &self.ratings
    }

    /// Rating the team entered this engine with.
    pub fn seed_rating(&self, team: &str) -> Option<f64> {
        self.seeds.get(team).copied()
    }

    /// Most recent results, oldest first.
    pub fn form(&self, team: &str) -> Vec<TeamResult> {
        self.form
            .get(team)
            .map(|w| w.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn ledger(&self) -> &[RatedMatch] {
        &self.ledger
    }

    pub fn into_ratings(self) -> HashMap<String, f64> {
        self.ratings
    }

    /// Ratings sorted best first; ties broken by name.
    pub fn rankings(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .ratings
            .iter()
            .map(|(team, r)| (team.clone(), *r))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out
    }

    pub fn team_history(&self, team: &str) -> Vec<RatingChange> {
        self.ledger
            .iter()
            .filter_map(|m| {
                let (side, opponent, venue) = if m.home.team == team {
                    (&m.home, &m.away, Venue::Home)
                } else if m.away.team == team {
                    (&m.away, &m.home, Venue::Away)
                } else {
                    return None;
                };
                Some(RatingChange {
                    match_id: m.match_id,
                    date: m.date,
                    opponent: opponent.team.clone(),
                    venue,
                    result: side.result,
                    rating_pre: side.rating_pre,
                    rating_post: side.rating_post,
                    delta: side.delta,
                })
            })
            .collect()
    }

    /// Rates one played match. Returns `None` without touching any state when
    /// either score is missing or a team is listed against itself.
    pub fn process_match(&mut self, m: &MatchRecord, home_advantage: f64) -> Option<&RatedMatch> {
        if m.home == m.away {
            warn!(match_id = m.id, team = %m.home, "team listed against itself; skipping");
            return None;
        }
        let (hg, ag) = m.score()?;

        let home_pre = self.rating_or_seed(&m.home);
        let away_pre = self.rating_or_seed(&m.away);
        let exp_home = expected_home(home_pre, away_pre, home_advantage);

        let home = self.side_update(&m.home, Venue::Home, home_pre, away_pre, hg, ag, exp_home);
        let away = self.side_update(&m.away, Venue::Away, away_pre, home_pre, ag, hg, 1.0 - exp_home);

        self.ratings.insert(m.home.clone(), home.rating_post);
        self.ratings.insert(m.away.clone(), away.rating_post);
        self.push_form(&m.home, home.result);
        self.push_form(&m.away, away.result);

        debug!(
            match_id = m.id,
            home = %m.home,
            away = %m.away,
            home_delta = home.delta,
            away_delta = away.delta,
            "rated match"
        );

        self.ledger.push(RatedMatch {
            match_id: m.id,
            date: m.date,
            season: m.season.clone(),
            league: m.league.clone(),
            home_advantage,
            goal_diff: i16::from(hg) - i16::from(ag),
            home,
            away,
        });
        self.ledger.last()
    }

    #[allow(clippy::too_many_arguments)]
    fn side_update(
        &self,
        team: &str,
        venue: Venue,
        own: f64,
        opponent: f64,
        goals_for: u8,
        goals_against: u8,
        expected: f64,
    ) -> SideUpdate {
        let result = TeamResult::from_goals(goals_for, goals_against);
        let recent: Vec<TeamResult> = self.form(team);
        let mults = multipliers::compute(
            &SideContext {
                venue,
                result,
                own_rating: own,
                opponent_rating: opponent,
                goals_for,
                goals_against,
                recent: &recent,
            },
            &self.params,
        );

        let actual = actual_score(result, goals_for.abs_diff(goals_against), &self.params.blowout);
        let k_adjusted = self.params.base_k * mults.product();
        let cap = k_cap(own, &self.params);
        let k_applied = k_adjusted.min(cap);
        let delta = k_applied * (actual - expected);

        SideUpdate {
            team: team.to_string(),
            result,
            goals_for,
            goals_against,
            multipliers: mults,
            expected,
            actual,
            k_adjusted,
            k_cap: cap,
            k_applied,
            rating_pre: own,
            rating_post: own + delta,
            delta,
        }
    }

    fn push_form(&mut self, team: &str, result: TeamResult) {
        let window = self.params.form.window;
        let entry = self.form.entry(team.to_string()).or_default();
        entry.push_back(result);
        while entry.len() > window {
            entry.pop_front();
        }
    }

    /// Sorts by (date, id) and rates every played match; pending ids are collected.
    pub fn replay(&mut self, matches: &[MatchRecord], home_advantage: f64) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        for m in chronological(matches) {
            match self.process_match(m, home_advantage) {
                Some(_) => summary.rated += 1,
                None if m.home == m.away => summary.rejected.push(m.id),
                None => summary.pending.push(m.id),
            }
        }
        info!(
            rated = summary.rated,
            pending = summary.pending.len(),
            rejected = summary.rejected.len(),
            teams = self.ratings.len(),
            "replay complete"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn game(id: u64, day: u32, home: &str, away: &str, score: Option<(u8, u8)>) -> MatchRecord {
        MatchRecord {
            id,
            date: NaiveDate::from_ymd_opt(2025, 9, day)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            season: "2025-26".to_string(),
            league: "Test League".to_string(),
            home: home.to_string(),
            away: away.to_string(),
            home_score: score.map(|s| s.0),
            away_score: score.map(|s| s.1),
        }
    }

    #[test]
    fn pending_match_is_a_no_op() {
        let mut engine = RatingEngine::new(EloParams::default());
        assert!(engine.process_match(&game(1, 1, "A", "B", None), 50.0).is_none());
        assert!(engine.ratings().is_empty());
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn home_win_between_equals() {
        let mut engine = RatingEngine::new(EloParams::default());
        let rated = engine
            .process_match(&game(1, 1, "A", "B", Some((1, 0))), 0.0)
            .unwrap()
            .clone();

        // Home: venue 1.0, opponent 1.0, gd 1.0, form 1.0, clean sheet 1.15.
        assert_relative_eq!(rated.home.k_applied, 23.0, epsilon = 1e-9);
        assert_relative_eq!(rated.home.delta, 11.5, epsilon = 1e-9);
        // Away: venue 1.15, shutout loss 0.9.
        assert_relative_eq!(rated.away.k_applied, 20.0 * 1.15 * 0.9, epsilon = 1e-9);
        assert_relative_eq!(rated.away.delta, -0.5 * 20.0 * 1.15 * 0.9, epsilon = 1e-9);
        assert_eq!(engine.rating("A"), Some(1500.0 + rated.home.delta));
        assert_eq!(engine.form("A"), vec![TeamResult::Win]);
        assert_eq!(engine.form("B"), vec![TeamResult::Loss]);
    }

    #[test]
    fn team_against_itself_is_rejected() {
        let rows = vec![
            game(1, 1, "A", "B", Some((1, 0))),
            game(2, 2, "A", "A", Some((2, 0))),
            game(3, 3, "B", "B", None),
        ];
        let mut engine = RatingEngine::new(EloParams::default());
        let summary = engine.replay(&rows, 50.0);
        assert_eq!(summary.rated, 1);
        assert_eq!(summary.rejected, vec![2, 3]);
        assert!(summary.pending.is_empty());
        assert_eq!(engine.ledger().len(), 1);

        let moved: f64 = engine.team_history("A").iter().map(|h| h.delta).sum();
        assert_relative_eq!(1500.0 + moved, engine.rating("A").unwrap(), epsilon = 1e-9);
        assert_eq!(engine.form("A"), vec![TeamResult::Win]);
    }

    #[test]
    fn deltas_are_not_zero_sum() {
        let mut engine = RatingEngine::new(EloParams::default());
        let rated = engine
            .process_match(&game(1, 1, "A", "B", Some((3, 0))), 50.0)
            .unwrap();
        assert!((rated.home.delta + rated.away.delta).abs() > 1e-6);
    }

    #[test]
    fn away_rout_by_underdog_is_capped() {
        let mut ratings = HashMap::new();
        ratings.insert("Giant".to_string(), 1700.0);
        ratings.insert("Minnow".to_string(), 1300.0);
        let mut engine = RatingEngine::with_ratings(EloParams::default(), &ratings);

        let rated = engine
            .process_match(&game(1, 1, "Giant", "Minnow", Some((0, 4))), 50.0)
            .unwrap();
        let away = &rated.away;
        assert_relative_eq!(away.multipliers.opponent, 2.0);
        assert_relative_eq!(away.multipliers.venue, 1.35);
        assert_relative_eq!(away.multipliers.goal_diff, 1.5);
        assert!(away.k_adjusted > away.k_cap);
        assert_relative_eq!(away.k_applied, 75.0);
        assert_relative_eq!(away.actual, 1.3);
        assert_relative_eq!(away.delta, 75.0 * (1.3 - away.expected), epsilon = 1e-9);
    }

    #[test]
    fn form_window_is_bounded_and_lagged() {
        let mut engine = RatingEngine::new(EloParams::default());
        for day in 1..=7 {
            engine.process_match(&game(u64::from(day), day, "A", "B", Some((2, 1))), 50.0);
        }
        assert_eq!(engine.form("A"), vec![TeamResult::Win; 5]);
        let ledger = engine.ledger();
        // Fifth match sees four prior wins; sixth sees five.
        assert_relative_eq!(ledger[4].home.multipliers.form, 1.15);
        assert_relative_eq!(ledger[5].home.multipliers.form, 1.2);
        assert_relative_eq!(ledger[0].home.multipliers.form, 1.0);
    }

    #[test]
    fn replay_orders_by_date_then_id() {
        let rows = vec![
            game(3, 2, "A", "C", Some((0, 2))),
            game(2, 1, "B", "A", Some((1, 1))),
            game(1, 1, "A", "B", Some((2, 0))),
            game(4, 3, "C", "B", None),
        ];
        let mut engine = RatingEngine::new(EloParams::default());
        let summary = engine.replay(&rows, 50.0);
        assert_eq!(summary.rated, 3);
        assert_eq!(summary.pending, vec![4]);
        let ids: Vec<u64> = engine.ledger().iter().map(|m| m.match_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn history_matches_ledger() {
        let rows = vec![
            game(1, 1, "A", "B", Some((2, 0))),
            game(2, 2, "C", "A", Some((1, 1))),
            game(3, 3, "B", "C", Some((0, 3))),
        ];
        let mut engine = RatingEngine::new(EloParams::default());
        engine.replay(&rows, 46.8);

        for team in ["A", "B", "C"] {
            let history = engine.team_history(team);
            assert_eq!(history.len(), 2);
            let sum: f64 = history.iter().map(|h| h.delta).sum();
            let seed = engine.seed_rating(team).unwrap();
            assert_relative_eq!(seed + sum, engine.rating(team).unwrap(), epsilon = 1e-9);
        }
        let a = engine.team_history("A");
        assert_eq!(a[1].venue, Venue::Away);
        assert_eq!(a[1].opponent, "C");
    }

    #[test]
    fn carry_over_seeds_promoted_teams() {
        let mut previous = HashMap::new();
        previous.insert("A".to_string(), 1620.0);
        previous.insert("B".to_string(), 1480.0);
        let upcoming = vec![
            game(1, 1, "A", "New", None),
            game(2, 2, "Fresh", "B", None),
            game(3, 3, "New", "Fresh", None),
        ];
        let (engine, promoted) = RatingEngine::carry_over(EloParams::default(), &previous, &upcoming);
        assert_eq!(promoted, vec!["Fresh".to_string(), "New".to_string()]);
        assert_eq!(engine.rating("New"), Some(1400.0));
        assert_eq!(engine.rating("A"), Some(1620.0));
        assert_eq!(engine.seed_rating("B"), Some(1480.0));
    }

    #[test]
    fn rankings_sort_best_first() {
        let mut ratings = HashMap::new();
        ratings.insert("Low".to_string(), 1400.0);
        ratings.insert("High".to_string(), 1700.0);
        ratings.insert("Mid".to_string(), 1550.0);
        let engine = RatingEngine::with_ratings(EloParams::default(), &ratings);
        let names: Vec<String> = engine.rankings().into_iter().map(|(t, _)| t).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
    }
}

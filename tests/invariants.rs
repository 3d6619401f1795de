use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use football_elo::elo::k_cap;
use football_elo::params::PredictionParams;
use football_elo::win_prob::DefensivePair;
use football_elo::{EloParams, MatchRecord, RatingEngine, predict};

const TEAMS: [&str; 6] = ["Ajax", "Bologna", "Celta", "Dortmund", "Everton", "Fiorentina"];

fn build_matches(raw: &[(usize, usize, u8, u8, i64)]) -> Vec<MatchRecord> {
    let start = NaiveDate::from_ymd_opt(2025, 8, 1)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap();
    raw.iter()
        .enumerate()
        .filter(|(_, (h, a, ..))| h != a)
        .map(|(idx, (h, a, hg, ag, day))| MatchRecord {
            id: idx as u64 + 1,
            date: start + Duration::days(*day),
            season: "2025-26".to_string(),
            league: "Prop League".to_string(),
            home: TEAMS[*h].to_string(),
            away: TEAMS[*a].to_string(),
            home_score: Some(*hg),
            away_score: Some(*ag),
        })
        .collect()
}

fn season_strategy() -> impl Strategy<Value = Vec<(usize, usize, u8, u8, i64)>> {
    prop::collection::vec((0..6usize, 0..6usize, 0..6u8, 0..6u8, 0..20i64), 1..60)
}

proptest! {
    #[test]
    fn forecast_sums_to_one_with_draw_in_band(
        home in 1000.0..2200.0f64,
        away in 1000.0..2200.0f64,
        adv in 0.0..120.0f64,
        draw_rate in 0.05..0.45f64,
        def_home in 0.0..1.0f64,
        def_away in 0.0..1.0f64,
    ) {
        let params = PredictionParams::default();
        let f = predict(home, away, adv, draw_rate, Some(DefensivePair { home: def_home, away: def_away }), &params);
        prop_assert!((f.home + f.draw + f.away - 1.0).abs() <= 1e-3);
        prop_assert!(f.draw >= 0.15 - 1e-12 && f.draw <= 0.40 + 1e-12);
        prop_assert!((f.home_or_draw - (f.home + f.draw)).abs() < 1e-12);
        prop_assert!((f.away_or_draw - (f.away + f.draw)).abs() < 1e-12);
        prop_assert!(f.recommended_prob > 0.0);
    }

    #[test]
    fn stronger_home_side_never_lowers_home_probability(
        base in 1200.0..1900.0f64,
        bump in 1.0..300.0f64,
        away in 1200.0..1900.0f64,
    ) {
        let params = PredictionParams::default();
        let weaker = predict(base, away, 50.0, 0.25, None, &params);
        let stronger = predict(base + bump, away, 50.0, 0.25, None, &params);
        let weaker_share = weaker.home / (weaker.home + weaker.away);
        let stronger_share = stronger.home / (stronger.home + stronger.away);
        prop_assert!(stronger_share >= weaker_share);
    }

    #[test]
    fn applied_k_never_exceeds_progressive_cap(raw in season_strategy()) {
        let params = EloParams::default();
        let mut engine = RatingEngine::new(params.clone());
        engine.replay(&build_matches(&raw), 50.0);
        for m in engine.ledger() {
            for side in [&m.home, &m.away] {
                prop_assert!(side.k_applied <= k_cap(side.rating_pre, &params) + 1e-12);
                prop_assert!(side.k_applied <= side.k_adjusted + 1e-12);
            }
        }
    }

    #[test]
    fn seed_plus_deltas_equals_rating(raw in season_strategy()) {
        let mut engine = RatingEngine::new(EloParams::default());
        engine.replay(&build_matches(&raw), 46.8);
        let mut totals: HashMap<&str, f64> = HashMap::new();
        for m in engine.ledger() {
            *totals.entry(m.home.team.as_str()).or_insert(0.0) += m.home.delta;
            *totals.entry(m.away.team.as_str()).or_insert(0.0) += m.away.delta;
        }
        for (team, moved) in totals {
            let seed = engine.seed_rating(team).unwrap();
            prop_assert!((seed + moved - engine.rating(team).unwrap()).abs() < 1e-6);
        }
    }

    #[test]
    fn input_order_does_not_change_replay(raw in season_strategy()) {
        let matches = build_matches(&raw);
        let mut reversed = matches.clone();
        reversed.reverse();

        let mut forward = RatingEngine::new(EloParams::default());
        forward.replay(&matches, 50.0);
        let mut backward = RatingEngine::new(EloParams::default());
        backward.replay(&reversed, 50.0);

        prop_assert_eq!(forward.ledger(), backward.ledger());
    }
}

#[test]
fn chronology_changes_the_outcome() {
    let start = NaiveDate::from_ymd_opt(2025, 8, 1)
        .unwrap()
        .and_hms_opt(20, 0, 0)
        .unwrap();
    let game = |id: u64, day: i64, home: &str, away: &str, hg: u8, ag: u8| MatchRecord {
        id,
        date: start + Duration::days(day),
        season: String::new(),
        league: String::new(),
        home: home.to_string(),
        away: away.to_string(),
        home_score: Some(hg),
        away_score: Some(ag),
    };

    let original = vec![
        game(1, 1, "A", "B", 3, 0),
        game(2, 2, "B", "C", 2, 1),
        game(3, 3, "C", "A", 1, 1),
    ];
    let swapped = vec![
        game(1, 3, "A", "B", 3, 0),
        game(2, 2, "B", "C", 2, 1),
        game(3, 1, "C", "A", 1, 1),
    ];

    let mut a = RatingEngine::new(EloParams::default());
    a.replay(&original, 50.0);
    let mut b = RatingEngine::new(EloParams::default());
    b.replay(&swapped, 50.0);
    assert!((a.rating("A").unwrap() - b.rating("A").unwrap()).abs() > 1e-6);
}

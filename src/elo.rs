use crate::matches::TeamResult;
use crate::params::{BlowoutBonus, EloParams};

/// Logistic expectation for the home side; the away expectation is `1 - expected_home`.
pub fn expected_home(home_rating: f64, away_rating: f64, home_advantage: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((away_rating - home_rating - home_advantage) / 400.0))
}

/// Winners gain a margin bonus; the loser stays at zero regardless of margin.
pub fn actual_score(result: TeamResult, margin: u8, bonus: &BlowoutBonus) -> f64 {
    match result {
        TeamResult::Win => {
            let extra = f64::from(margin.saturating_sub(1)) * bonus.per_goal;
            1.0 + extra.min(bonus.max)
        }
        TeamResult::Draw => 0.5,
        TeamResult::Loss => 0.0,
    }
}

/// Progressive ceiling on the adjusted K, keyed on the pre-match rating.
pub fn k_cap(rating: f64, params: &EloParams) -> f64 {
    params
        .k_caps
        .iter()
        .find(|tier| rating < tier.below)
        .map(|tier| tier.cap)
        .unwrap_or(params.k_cap_floor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equal_ratings_without_advantage_are_even() {
        assert_relative_eq!(expected_home(1500.0, 1500.0, 0.0), 0.5);
        assert!(expected_home(1500.0, 1500.0, 50.0) > 0.5);
    }

    #[test]
    fn blowout_bonus_steps_and_caps() {
        let b = EloParams::default().blowout;
        assert_relative_eq!(actual_score(TeamResult::Win, 1, &b), 1.0);
        assert_relative_eq!(actual_score(TeamResult::Win, 2, &b), 1.1);
        assert_relative_eq!(actual_score(TeamResult::Win, 3, &b), 1.2);
        assert_relative_eq!(actual_score(TeamResult::Win, 4, &b), 1.3);
        assert_relative_eq!(actual_score(TeamResult::Win, 7, &b), 1.3);
        assert_relative_eq!(actual_score(TeamResult::Loss, 7, &b), 0.0);
        assert_relative_eq!(actual_score(TeamResult::Draw, 0, &b), 0.5);
    }

    #[test]
    fn cap_table_edges() {
        let p = EloParams::default();
        assert_eq!(k_cap(1250.0, &p), 75.0);
        assert_eq!(k_cap(1399.99, &p), 75.0);
        assert_eq!(k_cap(1400.0, &p), 60.0);
        assert_eq!(k_cap(1500.0, &p), 50.0);
        assert_eq!(k_cap(1650.0, &p), 40.0);
        assert_eq!(k_cap(1700.0, &p), 35.0);
        assert_eq!(k_cap(2100.0, &p), 35.0);
    }

    #[test]
    fn cap_never_increases_with_rating() {
        let p = EloParams::default();
        let mut prev = f64::INFINITY;
        for r in (1000..2200).step_by(5) {
            let cap = k_cap(r as f64, &p);
            assert!(cap <= prev);
            prev = cap;
        }
    }
}

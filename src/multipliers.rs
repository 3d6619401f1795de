//! Contextual scaling factors applied to the base K before capping.
//!
//! Every function here is pure and reads its thresholds from the parameter
//! bundle, so swapping a table never touches the replay loop.

use serde::{Deserialize, Serialize};

use crate::matches::{TeamResult, Venue};
use crate::params::{
    DefensiveTable, EloParams, FormTable, GoalDiffTable, OpponentQualityTable, VenueTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    pub opponent: f64,
    pub venue: f64,
    pub goal_diff: f64,
    pub form: f64,
    pub defensive: f64,
}

impl Multipliers {
    pub fn product(&self) -> f64 {
        self.opponent * self.venue * self.goal_diff * self.form * self.defensive
    }
}

/// Everything one side of a match contributes to its multipliers.
#[derive(Debug, Clone, Copy)]
pub struct SideContext<'a> {
    pub venue: Venue,
    pub result: TeamResult,
    pub own_rating: f64,
    pub opponent_rating: f64,
    pub goals_for: u8,
    pub goals_against: u8,
    // Results before this match, oldest first.
    pub recent: &'a [TeamResult],
}

pub fn compute(ctx: &SideContext<'_>, params: &EloParams) -> Multipliers {
    let margin = ctx.goals_for.abs_diff(ctx.goals_against);
    Multipliers {
        opponent: opponent_quality(ctx.result, ctx.own_rating, ctx.opponent_rating, &params.opponent),
        venue: venue(ctx.venue, ctx.result, &params.venue),
        goal_diff: goal_difference(ctx.result, margin, &params.goal_diff),
        form: form(ctx.recent, &params.form),
        defensive: defensive(ctx.result, ctx.goals_for, ctx.goals_against, &params.defensive),
    }
}

pub fn opponent_quality(
    result: TeamResult,
    own_rating: f64,
    opponent_rating: f64,
    table: &OpponentQualityTable,
) -> f64 {
    if result != TeamResult::Win {
        return 1.0;
    }
    let gap = (own_rating - opponent_rating).abs();
    if own_rating < opponent_rating {
        (1.0 + gap / table.upset_gap_scale).min(table.upset_max)
    } else {
        (1.0 - gap / table.favourite_gap_scale).max(table.favourite_min)
    }
}

pub fn venue(venue: Venue, result: TeamResult, table: &VenueTable) -> f64 {
    match (venue, result) {
        (Venue::Home, TeamResult::Win) => table.home_win,
        (Venue::Home, TeamResult::Draw) => table.home_draw,
        (Venue::Home, TeamResult::Loss) => table.home_loss,
        (Venue::Away, TeamResult::Win) => table.away_win,
        (Venue::Away, TeamResult::Draw) => table.away_draw,
        (Venue::Away, TeamResult::Loss) => table.away_loss,
    }
}

pub fn goal_difference(result: TeamResult, margin: u8, table: &GoalDiffTable) -> f64 {
    let steps = match result {
        TeamResult::Win => &table.win,
        TeamResult::Loss => &table.loss,
        TeamResult::Draw => return 1.0,
    };
    let idx = usize::from(margin.max(1) - 1).min(steps.len().saturating_sub(1));
    steps.get(idx).copied().unwrap_or(1.0)
}

pub fn form(recent: &[TeamResult], table: &FormTable) -> f64 {
    let start = recent.len().saturating_sub(table.window);
    let window = &recent[start..];
    let wins = window.iter().filter(|r| **r == TeamResult::Win).count();
    let losses = window.iter().filter(|r| **r == TeamResult::Loss).count();

    if let Some(tier) = table.win_tiers.iter().find(|t| wins >= t.at_least) {
        return tier.multiplier;
    }
    if losses >= table.losing_run.at_least {
        return table.losing_run.multiplier;
    }
    1.0
}

pub fn defensive(result: TeamResult, goals_for: u8, goals_against: u8, table: &DefensiveTable) -> f64 {
    match result {
        TeamResult::Win => match goals_against {
            0 => table.clean_sheet_win,
            1 => table.win_concede_one,
            _ => table.win_concede_more,
        },
        TeamResult::Loss if goals_for == 0 => table.shutout_loss,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::matches::TeamResult::{Draw, Loss, Win};

    fn p() -> EloParams {
        EloParams::default()
    }

    #[test]
    fn upset_scales_to_ceiling() {
        let t = p().opponent;
        assert_relative_eq!(opponent_quality(Win, 1400.0, 1600.0, &t), 1.5);
        assert_relative_eq!(opponent_quality(Win, 1300.0, 1700.0, &t), 2.0);
        assert_relative_eq!(opponent_quality(Win, 1100.0, 1700.0, &t), 2.0);
    }

    #[test]
    fn favourite_win_shrinks_to_floor() {
        let t = p().opponent;
        assert_relative_eq!(opponent_quality(Win, 1600.0, 1400.0, &t), 0.75);
        assert_relative_eq!(opponent_quality(Win, 1900.0, 1400.0, &t), 0.6);
        assert_relative_eq!(opponent_quality(Win, 1500.0, 1500.0, &t), 1.0);
    }

    #[test]
    fn only_wins_get_opponent_scaling() {
        let t = p().opponent;
        assert_relative_eq!(opponent_quality(Draw, 1300.0, 1700.0, &t), 1.0);
        assert_relative_eq!(opponent_quality(Loss, 1700.0, 1300.0, &t), 1.0);
    }

    #[test]
    fn away_win_carries_largest_venue_bonus() {
        let t = p().venue;
        let away_win = venue(Venue::Away, Win, &t);
        for (v, r) in [
            (Venue::Away, Draw),
            (Venue::Home, Win),
            (Venue::Home, Draw),
            (Venue::Home, Loss),
        ] {
            assert!(venue(v, r, &t) < away_win);
        }
        assert!(venue(Venue::Away, Draw, &t) > venue(Venue::Home, Draw, &t));
    }

    #[test]
    fn goal_difference_tiers_cap_at_four() {
        let t = p().goal_diff;
        assert_relative_eq!(goal_difference(Win, 1, &t), 1.0);
        assert_relative_eq!(goal_difference(Win, 3, &t), 1.3);
        assert_relative_eq!(goal_difference(Win, 4, &t), 1.5);
        assert_relative_eq!(goal_difference(Win, 6, &t), 1.5);
        assert_relative_eq!(goal_difference(Loss, 2, &t), 0.9);
        assert_relative_eq!(goal_difference(Loss, 9, &t), 0.7);
        assert_relative_eq!(goal_difference(Draw, 0, &t), 1.0);
    }

    #[test]
    fn form_reads_only_last_window() {
        let t = p().form;
        assert_relative_eq!(form(&[], &t), 1.0);
        assert_relative_eq!(form(&[Win; 5], &t), 1.2);
        assert_relative_eq!(form(&[Loss, Win, Win, Win, Win], &t), 1.15);
        assert_relative_eq!(form(&[Draw, Loss, Win, Win, Win], &t), 1.1);
        assert_relative_eq!(form(&[Draw, Loss, Loss, Loss, Win], &t), 0.85);
        assert_relative_eq!(form(&[Draw, Draw, Loss, Win, Win], &t), 1.0);
        // Older wins fall out of the window.
        assert_relative_eq!(form(&[Win, Win, Win, Loss, Loss, Draw, Draw, Draw], &t), 1.0);
    }

    #[test]
    fn defensive_cases() {
        let t = p().defensive;
        assert_relative_eq!(defensive(Win, 2, 0, &t), 1.15);
        assert_relative_eq!(defensive(Win, 2, 1, &t), 1.0);
        assert_relative_eq!(defensive(Win, 4, 3, &t), 0.95);
        assert_relative_eq!(defensive(Loss, 0, 2, &t), 0.9);
        assert_relative_eq!(defensive(Loss, 1, 2, &t), 1.0);
        assert_relative_eq!(defensive(Draw, 0, 0, &t), 1.0);
    }

    #[test]
    fn away_upset_rout_hits_every_ceiling() {
        let params = p();
        let recent: [TeamResult; 0] = [];
        let m = compute(
            &SideContext {
                venue: Venue::Away,
                result: Win,
                own_rating: 1300.0,
                opponent_rating: 1700.0,
                goals_for: 4,
                goals_against: 0,
                recent: &recent,
            },
            &params,
        );
        assert_relative_eq!(m.opponent, 2.0);
        assert_relative_eq!(m.venue, 1.35);
        assert_relative_eq!(m.goal_diff, 1.5);
        assert_relative_eq!(m.form, 1.0);
        assert_relative_eq!(m.defensive, 1.15);
        assert_relative_eq!(m.product(), 2.0 * 1.35 * 1.5 * 1.15);
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::matches::{MatchRecord, TeamResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub team: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: u32,
    pub rating_rank: Option<usize>,
}

impl StandingsRow {
    fn record(&mut self, scored: u8, conceded: u8) {
        self.played += 1;
        self.goals_for += u32::from(scored);
        self.goals_against += u32::from(conceded);
        match TeamResult::from_goals(scored, conceded) {
            TeamResult::Win => {
                self.wins += 1;
                self.points += 3;
            }
            TeamResult::Draw => {
                self.draws += 1;
                self.points += 1;
            }
            TeamResult::Loss => self.losses += 1,
        }
        self.goal_difference = self.goals_for as i32 - self.goals_against as i32;
    }
}

/// League table over played matches: points, then goal difference, then goals for.
pub fn compute_standings<'a>(matches: impl IntoIterator<Item = &'a MatchRecord>) -> Vec<StandingsRow> {
    let mut table: HashMap<&str, StandingsRow> = HashMap::new();
    for m in matches {
        let Some((hg, ag)) = m.score() else {
            continue;
        };
        table
            .entry(m.home.as_str())
            .or_insert_with(|| StandingsRow {
                team: m.home.clone(),
                ..StandingsRow::default()
            })
            .record(hg, ag);
        table
            .entry(m.away.as_str())
            .or_insert_with(|| StandingsRow {
                team: m.away.clone(),
                ..StandingsRow::default()
            })
            .record(ag, hg);
    }

    let mut rows: Vec<StandingsRow> = table.into_values().collect();
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference.cmp(&a.goal_difference))
            .then(b.goals_for.cmp(&a.goals_for))
            .then_with(|| a.team.cmp(&b.team))
    });
    rows
}

/// Annotates each row with its 1-based position in `rankings` (best first).
pub fn attach_rating_ranks(rows: &mut [StandingsRow], rankings: &[(String, f64)]) {
    let positions: HashMap<&str, usize> = rankings
        .iter()
        .enumerate()
        .map(|(idx, (team, _))| (team.as_str(), idx + 1))
        .collect();
    for row in rows {
        row.rating_rank = positions.get(row.team.as_str()).copied();
    }
}

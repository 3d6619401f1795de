use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: u64,
    #[serde(with = "match_date")]
    pub date: NaiveDateTime,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub league: String,
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub home_score: Option<u8>,
    #[serde(default)]
    pub away_score: Option<u8>,
}

impl MatchRecord {
    pub fn score(&self) -> Option<(u8, u8)> {
        let (Some(home), Some(away)) = (self.home_score, self.away_score) else {
            return None;
        };
        Some((home, away))
    }

    pub fn is_played(&self) -> bool {
        self.score().is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.score().map(|(h, a)| Outcome::from_score(h, a))
    }
}

/// Match outcome from the home side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn from_score(home_goals: u8, away_goals: u8) -> Self {
        if home_goals > away_goals {
            Outcome::Home
        } else if home_goals < away_goals {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }
}

/// Result code for one side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TeamResult {
    #[serde(rename = "W")]
    Win,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "L")]
    Loss,
}

impl TeamResult {
    pub fn from_goals(scored: u8, conceded: u8) -> Self {
        if scored > conceded {
            TeamResult::Win
        } else if scored < conceded {
            TeamResult::Loss
        } else {
            TeamResult::Draw
        }
    }

    pub fn as_char(self) -> char {
        match self {
            TeamResult::Win => 'W',
            TeamResult::Draw => 'D',
            TeamResult::Loss => 'L',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
}

/// Sorts by date, breaking ties on match id so equal-date replays are stable.
pub fn chronological<'a>(matches: impl IntoIterator<Item = &'a MatchRecord>) -> Vec<&'a MatchRecord> {
    let mut out: Vec<&MatchRecord> = matches.into_iter().collect();
    out.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
    out
}

pub(crate) mod match_date {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("unrecognised date {raw:?}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::matches::MatchRecord;

pub fn load_matches(path: &Path) -> Result<Vec<MatchRecord>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read match file {}", path.display()))?;
    parse_matches(&raw).with_context(|| format!("parse match file {}", path.display()))
}

pub fn parse_matches(raw: &str) -> Result<Vec<MatchRecord>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).context("invalid match json")
}

pub fn split_by_season<'a>(matches: &'a [MatchRecord], season: &str) -> Vec<&'a MatchRecord> {
    matches.iter().filter(|m| m.season == season).collect()
}

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::engine::{RatedMatch, SideUpdate};
use crate::pipeline::SeasonReport;
use crate::standings::StandingsRow;
use crate::win_prob::MatchForecast;

pub struct ExportReport {
    pub ratings: usize,
    pub ledger: usize,
    pub forecasts: usize,
    pub standings: usize,
}

pub fn export_season_xlsx(path: &Path, report: &SeasonReport) -> Result<ExportReport> {
    let mut ratings_rows = vec![vec![
        "Rank".to_string(),
        "Team".to_string(),
        "Rating".to_string(),
        "Promoted".to_string(),
    ]];
    for (idx, (team, rating)) in report.rankings().iter().enumerate() {
        ratings_rows.push(vec![
            (idx + 1).to_string(),
            team.clone(),
            format!("{rating:.1}"),
            yes_no(report.promoted.contains(team)),
        ]);
    }

    let mut ledger_rows = vec![vec![
        "Match ID".to_string(),
        "Date".to_string(),
        "League".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Score".to_string(),
        "Home Result".to_string(),
        "Home Pre".to_string(),
        "Home Delta".to_string(),
        "Home K".to_string(),
        "Home K Cap".to_string(),
        "Away Result".to_string(),
        "Away Pre".to_string(),
        "Away Delta".to_string(),
        "Away K".to_string(),
        "Away K Cap".to_string(),
    ]];
    ledger_rows.extend(report.ledger.iter().map(ledger_row));

    let mut forecast_rows = vec![vec![
        "Match ID".to_string(),
        "Date".to_string(),
        "League".to_string(),
        "Home".to_string(),
        "Away".to_string(),
        "Home Rating".to_string(),
        "Away Rating".to_string(),
        "Home Win".to_string(),
        "Draw".to_string(),
        "Away Win".to_string(),
        "Home/Draw".to_string(),
        "Away/Draw".to_string(),
        "Recommended".to_string(),
        "Probability".to_string(),
        "Confidence".to_string(),
        "Missing History".to_string(),
    ]];
    forecast_rows.extend(report.forecasts.iter().map(forecast_row));

    let mut standings_rows = vec![vec![
        "Pos".to_string(),
        "Team".to_string(),
        "P".to_string(),
        "W".to_string(),
        "D".to_string(),
        "L".to_string(),
        "GF".to_string(),
        "GA".to_string(),
        "GD".to_string(),
        "Pts".to_string(),
        "Rating Rank".to_string(),
    ]];
    standings_rows.extend(
        report
            .standings
            .iter()
            .enumerate()
            .map(|(idx, row)| standings_row(idx + 1, row)),
    );

    let mut workbook = Workbook::new();
    for (name, rows) in [
        ("Ratings", &ratings_rows),
        ("Ledger", &ledger_rows),
        ("Forecasts", &forecast_rows),
        ("Standings", &standings_rows),
    ] {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(name)
            .with_context(|| format!("name worksheet {name}"))?;
        write_rows(sheet, rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;

    Ok(ExportReport {
        ratings: ratings_rows.len() - 1,
        ledger: ledger_rows.len() - 1,
        forecasts: forecast_rows.len() - 1,
        standings: standings_rows.len() - 1,
    })
}

fn ledger_row(m: &RatedMatch) -> Vec<String> {
    let mut row = vec![
        m.match_id.to_string(),
        m.date.format("%Y-%m-%d").to_string(),
        m.league.clone(),
        m.home.team.clone(),
        m.away.team.clone(),
        format!("{}-{}", m.home.goals_for, m.away.goals_for),
    ];
    row.extend(side_cells(&m.home));
    row.extend(side_cells(&m.away));
    row
}

fn side_cells(side: &SideUpdate) -> [String; 5] {
    [
        side.result.as_char().to_string(),
        format!("{:.1}", side.rating_pre),
        format!("{:+.2}", side.delta),
        format!("{:.2}", side.k_applied),
        format!("{:.0}", side.k_cap),
    ]
}

fn forecast_row(f: &MatchForecast) -> Vec<String> {
    let p = &f.forecast;
    vec![
        f.match_id.to_string(),
        f.date.format("%Y-%m-%d %H:%M").to_string(),
        f.league.clone(),
        f.home.clone(),
        f.away.clone(),
        format!("{:.1}", f.home_rating),
        format!("{:.1}", f.away_rating),
        pct(p.home),
        pct(p.draw),
        pct(p.away),
        pct(p.home_or_draw),
        pct(p.away_or_draw),
        p.recommended.to_string(),
        pct(p.recommended_prob),
        p.confidence.to_string(),
        yes_no(f.missing_history),
    ]
}

fn standings_row(pos: usize, row: &StandingsRow) -> Vec<String> {
    vec![
        pos.to_string(),
        row.team.clone(),
        row.played.to_string(),
        row.wins.to_string(),
        row.draws.to_string(),
        row.losses.to_string(),
        row.goals_for.to_string(),
        row.goals_against.to_string(),
        row.goal_difference.to_string(),
        row.points.to_string(),
        row.rating_rank.map(|r| r.to_string()).unwrap_or_default(),
    ]
}

fn pct(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

fn yes_no(flag: bool) -> String {
    let label = if flag { "Yes" } else { "No" };
    label.to_string()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

pub mod accuracy;
pub mod calibration;
pub mod dataset;
pub mod elo;
pub mod engine;
pub mod error;
pub mod export;
pub mod matches;
pub mod multipliers;
pub mod params;
pub mod pipeline;
pub mod standings;
pub mod win_prob;

pub use calibration::{Baseline, calibrate};
pub use engine::{RatedMatch, RatingEngine, ReplaySummary};
pub use error::EloError;
pub use matches::{MatchRecord, Outcome, TeamResult, Venue};
pub use params::EloParams;
pub use win_prob::{Confidence, Forecast, MatchForecast, Recommendation, forecast_all, predict};

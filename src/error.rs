use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EloError {
    #[error("reference season has no completed matches")]
    EmptyReferenceSeason,

    #[error("invalid parameter bundle: {reason}")]
    InvalidParams { reason: String },

    #[error("unsupported parameter bundle version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

pub type Result<T> = std::result::Result<T, EloError>;

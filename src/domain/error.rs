//! Domain error types.
//!
//! Soft "insufficient data" conditions are not represented here: they travel
//! through the pipeline as `None` values or documented fallbacks.

/// Top-level error type for invquant.
#[derive(Debug, thiserror::Error)]
pub enum InvquantError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("malformed series {series}: {reason}")]
    MalformedSeries { series: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("store error: {reason}")]
    Store { reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InvquantError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        InvquantError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(series: impl Into<String>, reason: impl Into<String>) -> Self {
        InvquantError::MalformedSeries {
            series: series.into(),
            reason: reason.into(),
        }
    }
}

impl InvquantError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            InvquantError::Io(_) | InvquantError::Csv(_) => 1,
            InvquantError::ConfigParse { .. }
            | InvquantError::ConfigMissing { .. }
            | InvquantError::ConfigInvalid { .. } => 2,
            InvquantError::Store { .. } => 3,
            InvquantError::InvalidParameter { .. } => 4,
            InvquantError::MalformedSeries { .. } => 5,
        }
    }
}

impl From<&InvquantError> for std::process::ExitCode {
    fn from(err: &InvquantError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

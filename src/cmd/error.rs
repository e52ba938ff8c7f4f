//! Error taxonomy for a single `tile-tool` invocation.
//!
//! Every failure travels back to `main` as a `ToolError`; `main` prints it
//! once and turns it into the process exit code.

use thiserror::Error;

use super::validate::Field;
use crate::tile38::TransportError;

#[derive(Debug, Error)]
pub enum ToolError {
    /// A `--nearby` / `--setpoint` value that is not `<lon>,<lat>`.
    #[error("malformed coordinates '{raw}' (expected <lon>,<lat>)")]
    MalformedCoordinate { raw: String },

    /// Required parameters absent for the selected operation (all of them).
    #[error("missing required parameter(s): {}", join_fields(.0))]
    MissingFields(Vec<Field>),

    /// More than one operation flag supplied.
    #[error("conflicting operations selected: {} (choose exactly one)", .0.join(", "))]
    ConflictingOperation(Vec<&'static str>),

    #[error("invalid server address '{raw}': {reason}")]
    InvalidAddress { raw: String, reason: String },

    /// Connection, protocol or server-side failure. Displayed verbatim.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Local setup failure (runtime creation and the like).
    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::ConflictingOperation(_) | ToolError::InvalidAddress { .. } => 2,
            _ => 1,
        }
    }

    /// Lines written to stderr for this error.
    pub fn report_lines(&self) -> Vec<String> {
        match self {
            ToolError::MissingFields(fields) => fields
                .iter()
                .map(|f| format!("Missing required '{f}' parameter."))
                .collect(),
            other => vec![format!("Error: {other}")],
        }
    }
}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

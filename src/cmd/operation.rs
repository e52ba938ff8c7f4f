/*!
operation.rs

The six mutually exclusive operations and the selection step that picks one
from the option set.

Selection rules:
  - no operation flag  -> `Ok(None)` (idle, nothing to do)
  - one operation flag -> required fields checked, coordinates parsed
  - two or more        -> `ToolError::ConflictingOperation` naming every flag

Everything that can fail on user input fails here, before any connection to
the server is opened.
*/

use std::fmt;

use super::coords::Coordinate;
use super::error::ToolError;
use super::options::{Options, non_blank};
use super::validate::{Field, ensure_required};

/// Operation without its arguments; used for selection and messages.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum OperationKind {
    Scan,
    Search,
    Stats,
    Delete,
    SetPoint,
    Nearby,
}

impl OperationKind {
    /// All kinds (order matters for conflict messages).
    pub const fn variants() -> &'static [OperationKind] {
        &[
            OperationKind::Scan,
            OperationKind::Search,
            OperationKind::Stats,
            OperationKind::Delete,
            OperationKind::SetPoint,
            OperationKind::Nearby,
        ]
    }

    /// Long flag name selecting this operation.
    pub const fn flag(&self) -> &'static str {
        match self {
            OperationKind::Scan => "--scan",
            OperationKind::Search => "--search",
            OperationKind::Stats => "--stats",
            OperationKind::Delete => "--delete",
            OperationKind::SetPoint => "--setpoint",
            OperationKind::Nearby => "--nearby",
        }
    }

    pub const fn required(&self) -> &'static [Field] {
        match self {
            OperationKind::Scan | OperationKind::Search | OperationKind::Delete => &[Field::Key],
            OperationKind::Stats => &[],
            OperationKind::SetPoint => &[Field::Id, Field::Key],
            OperationKind::Nearby => &[Field::Key, Field::Nearby],
        }
    }

    /// Whether the option set carries this operation's flag.
    pub fn is_selected(&self, options: &Options) -> bool {
        match self {
            OperationKind::Scan => options.scan,
            OperationKind::Search => options.search,
            OperationKind::Stats => options.stats,
            OperationKind::Delete => options.delete,
            OperationKind::SetPoint => options.setpoint.is_some(),
            OperationKind::Nearby => options.nearby.is_some(),
        }
    }

    /// Mutates or removes data on the server.
    pub fn is_destructive(&self) -> bool {
        matches!(self, OperationKind::Delete | OperationKind::SetPoint)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag().trim_start_matches('-'))
    }
}

/// A fully validated operation ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// All objects stored under `key` (passed literally).
    Scan { key: String },
    /// Key names matching `pattern` (`all` already translated to `*`).
    Search { pattern: String },
    Stats { key: Option<String> },
    /// Single record when `id` is set, otherwise the whole key.
    Delete { key: String, id: Option<String> },
    SetPoint {
        key: String,
        id: String,
        point: Coordinate,
    },
    Nearby {
        key: String,
        point: Coordinate,
        radius: Option<String>,
    },
}

impl Operation {
    /// Pick the single operation requested by `options`.
    pub fn select(options: &Options) -> Result<Option<Operation>, ToolError> {
        let selected: Vec<OperationKind> = OperationKind::variants()
            .iter()
            .copied()
            .filter(|k| k.is_selected(options))
            .collect();

        match selected.as_slice() {
            [] => Ok(None),
            [kind] => Operation::build(*kind, options).map(Some),
            many => Err(ToolError::ConflictingOperation(
                many.iter().map(|k| k.flag()).collect(),
            )),
        }
    }

    fn build(kind: OperationKind, options: &Options) -> Result<Operation, ToolError> {
        ensure_required(kind.required(), options)?;

        // ensure_required guarantees these are non-blank where required
        let key = non_blank(&options.key).unwrap_or_default();
        let id = non_blank(&options.id);

        let op = match kind {
            OperationKind::Scan => Operation::Scan { key },
            OperationKind::Search => Operation::Search {
                pattern: search_pattern(&key),
            },
            OperationKind::Stats => Operation::Stats {
                key: non_blank(&options.key),
            },
            OperationKind::Delete => Operation::Delete { key, id },
            OperationKind::SetPoint => {
                let raw = options.setpoint.as_deref().unwrap_or_default();
                Operation::SetPoint {
                    key,
                    id: id.unwrap_or_default(),
                    point: Coordinate::parse(raw)?,
                }
            }
            OperationKind::Nearby => {
                let raw = options.nearby.as_deref().unwrap_or_default();
                Operation::Nearby {
                    key,
                    point: Coordinate::parse(raw)?,
                    radius: non_blank(&options.radius),
                }
            }
        };
        Ok(op)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Scan { .. } => OperationKind::Scan,
            Operation::Search { .. } => OperationKind::Search,
            Operation::Stats { .. } => OperationKind::Stats,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::SetPoint { .. } => OperationKind::SetPoint,
            Operation::Nearby { .. } => OperationKind::Nearby,
        }
    }
}

/// `all` lists every key.
fn search_pattern(key: &str) -> String {
    if key == "all" {
        "*".to_string()
    } else {
        key.to_string()
    }
}

/* --------------------------------- Tests ---------------------------------- */

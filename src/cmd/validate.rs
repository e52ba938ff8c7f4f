/*!
validate.rs

Required-parameter checks for the selected operation.

`ensure_field` checks a single field; `ensure_required` walks the whole list
and reports every missing field at once rather than stopping at the first.
*/

use std::fmt;

use super::error::ToolError;
use super::options::Options;

/// Named CLI parameters an operation may require.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Field {
    Id,
    Key,
    Nearby,
    Setpoint,
}

impl Field {
    /// The value supplied for this field, if any.
    fn lookup(self, options: &Options) -> Option<&str> {
        match self {
            Field::Id => options.id.as_deref(),
            Field::Key => options.key.as_deref(),
            Field::Nearby => options.nearby.as_deref(),
            Field::Setpoint => options.setpoint.as_deref(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Field::Id => "id",
            Field::Key => "key",
            Field::Nearby => "nearby",
            Field::Setpoint => "setpoint",
        };
        f.write_str(s)
    }
}

/// A single absent field.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct MissingField(pub Field);

/// Present means supplied and not blank.
pub fn ensure_field(field: Field, options: &Options) -> Result<(), MissingField> {
    match field.lookup(options) {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(MissingField(field)),
    }
}

/// Check every field in `required`, collecting all that are missing.
pub fn ensure_required(required: &[Field], options: &Options) -> Result<(), ToolError> {
    let missing: Vec<Field> = required
        .iter()
        .filter_map(|f| ensure_field(*f, options).err())
        .map(|MissingField(f)| f)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::MissingFields(missing))
    }
}

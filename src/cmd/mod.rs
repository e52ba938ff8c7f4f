/*!
Command layer: option set -> operation selection -> dispatch -> rendering.

Layout:
  src/cmd/
    mod.rs        (this file; module declarations + re-exports)
    options.rs    (Options, DisplayMode)
    validate.rs   (Field, ensure_field / ensure_required)
    coords.rs     (Coordinate::parse)
    operation.rs  (OperationKind, Operation::select)
    dispatch.rs   (execute / run_operation / report_lines)
    render.rs     (payload -> lines)
    format.rs     (table / color primitives)
    error.rs      (ToolError + exit codes)

Conventions:
  - User input is fully validated by `Operation::select` before any
    connection is opened.
  - Functions return `Result<_, ToolError>`; only `main` prints errors and
    chooses the exit code.
*/

pub mod coords;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod operation;
pub mod options;
pub mod render;
pub mod validate;

pub use dispatch::execute;
pub use error::ToolError;
pub use operation::Operation;
pub use options::{DisplayMode, Options};

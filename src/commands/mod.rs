// ABOUTME: Command module aggregator for the bluegreen CLI.
// ABOUTME: Re-exports pre, swap, and status command handlers.

mod pre;
mod status;
mod swap;

pub use pre::pre;
pub use status::status;
pub use swap::swap;

use bluegreen::diagnostics::Diagnostics;
use bluegreen::output::Output;

/// Print every collected warning.
fn emit_warnings(diag: &Diagnostics, output: &Output) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}

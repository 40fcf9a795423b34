//! Command: list the available steps.
use std::fmt::Write as _;

use crate::steps::StepId;

/// Render every step id and name, one per line, in pipeline order.
#[must_use]
pub fn catalogue() -> String {
    let width = StepId::ALL
        .iter()
        .map(|id| id.as_str().len())
        .max()
        .unwrap_or(0);
    StepId::ALL.iter().fold(String::new(), |mut out, id| {
        let _ = writeln!(out, "{:<width$}  {}", id.as_str(), id.name());
        out
    })
}

/// Print the step catalogue to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    print!("{}", catalogue());
}

//! Signal name parsing.

use crate::errors::{RuncError, RuncResult};
use nix::sys::signal::Signal;
use std::str::FromStr;

/// Parse a signal given as `SIGTERM`, `TERM`, `term` or `15`.
pub fn parse_signal(raw: &str) -> RuncResult<Signal> {
    let raw = raw.trim();

    if let Ok(number) = raw.parse::<i32>() {
        return Signal::try_from(number)
            .map_err(|_| RuncError::InvalidArgument(format!("unknown signal number {}", number)));
    }

    let upper = raw.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };

    Signal::from_str(&name)
        .map_err(|_| RuncError::InvalidArgument(format!("unknown signal '{}'", raw)))
}

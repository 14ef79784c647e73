#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` maps rsync's traditional `-v`/`-q` verbosity counting onto a
//! [`tracing`] subscriber, so every other crate in the workspace can log
//! through ordinary `tracing::{info,debug,trace,warn,error}!` macros without
//! caring how verbosity was configured.
//!
//! # Design
//!
//! [`Verbosity`] is the small value type CLIs and daemons build from their
//! own flag parsing (out of scope here); [`init`] installs a
//! [`tracing_subscriber::fmt`] subscriber filtered to the resulting level.
//! Tests and examples that need to assert on emitted messages should
//! install their own subscriber instead of calling [`init`], since a
//! process-global subscriber can only be set once.
//!
//! # Errors
//!
//! [`init`] returns an error if a global subscriber has already been
//! installed; callers that may run inside a larger process (tests, embedded
//! use) should treat that as non-fatal.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Verbosity requested by the user, counted the way rsync counts `-v` flags.
///
/// `--quiet` and `-v`/`-vv`/`-vvv` are mutually exclusive in upstream rsync;
/// this type models that by making quiet a distinct variant rather than a
/// negative count.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Verbosity {
    /// Suppress all but error output.
    Quiet,
    /// Default verbosity: warnings and errors only.
    #[default]
    Normal,
    /// One or more `-v` flags; higher counts enable more detail.
    Verbose(u8),
}

impl Verbosity {
    /// Builds a verbosity level from a `-v` flag count and a `--quiet` flag,
    /// the way a CLI argument parser would.
    #[must_use]
    pub const fn from_flags(verbose_count: u8, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose_count == 0 {
            Verbosity::Normal
        } else {
            Verbosity::Verbose(verbose_count)
        }
    }

    /// Maps this verbosity onto a [`LevelFilter`].
    #[must_use]
    pub const fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::WARN,
            Verbosity::Verbose(1) => LevelFilter::INFO,
            Verbosity::Verbose(2) => LevelFilter::DEBUG,
            Verbosity::Verbose(_) => LevelFilter::TRACE,
        }
    }
}

/// Installs a process-global [`tracing`] subscriber filtered to `verbosity`.
///
/// Respects `RSYNC_LOG` in the environment as an [`EnvFilter`] override (for
/// example `RSYNC_LOG=engine=debug,transfer=trace`), falling back to the
/// level implied by `verbosity` when unset or invalid.
///
/// # Errors
///
/// Returns an error if a global default subscriber was already installed.
pub fn init(verbosity: Verbosity) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_env("RSYNC_LOG")
        .unwrap_or_else(|_| EnvFilter::new(verbosity.level_filter().to_string()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_flag_overrides_verbose_count() {
        assert_eq!(Verbosity::from_flags(3, true), Verbosity::Quiet);
    }

    #[test]
    fn zero_verbose_flags_is_normal() {
        assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
    }

    #[test]
    fn verbosity_level_filters_increase_monotonically() {
        let levels = [
            Verbosity::Quiet.level_filter(),
            Verbosity::Normal.level_filter(),
            Verbosity::Verbose(1).level_filter(),
            Verbosity::Verbose(2).level_filter(),
            Verbosity::Verbose(3).level_filter(),
        ];
        for pair in levels.windows(2) {
            assert!(pair[0] <= pair[1], "{:?} should not exceed {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn high_verbose_counts_cap_at_trace() {
        assert_eq!(Verbosity::Verbose(10).level_filter(), LevelFilter::TRACE);
    }
}

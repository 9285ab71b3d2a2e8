//! Diagnostic logging on stderr.
//!
//! User-facing progress goes to stdout through the command layer; this
//! subscriber only carries `tracing` events, filtered by the `-v` count.

use std::io::{self, IsTerminal};

use tracing::Level;

/// Maximum level shown for a given number of `-v` flags.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber.
///
/// Returns `false` if one was already installed; the existing one is kept.
pub fn init(verbosity: u8) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(level_for(0), Level::WARN);
        assert_eq!(level_for(1), Level::INFO);
        assert_eq!(level_for(2), Level::DEBUG);
        assert_eq!(level_for(7), Level::TRACE);
    }

    #[test]
    fn second_init_keeps_first_subscriber() {
        init(0);
        assert!(!init(2));
    }
}

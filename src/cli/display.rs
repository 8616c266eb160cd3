//! Display utilities for the Tabata timer CLI.
//!
//! Replies from the daemon are printed verbatim on stdout; local failures go
//! to stderr.

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Prints a reply line from the daemon.
    pub fn show_reply(reply: &str) {
        println!("{}", reply);
    }

    /// Prints a local error.
    pub fn show_error(message: &str) {
        eprintln!("{}", Self::format_error(message));
    }

    fn format_error(message: &str) -> String {
        format!("tabata: {}", message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error() {
        assert_eq!(
            Display::format_error("Cannot connect to daemon"),
            "tabata: Cannot connect to daemon"
        );
    }
}

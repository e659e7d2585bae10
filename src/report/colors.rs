//! Terminal capability detection.

use colored::control;
use std::io::IsTerminal;

/// Whether colours and cursor control may be used on stdout.
///
/// `NO_COLOR` (any value) wins; otherwise stdout must be a terminal.
pub fn ansi_enabled(no_color: bool) -> bool {
    !no_color && std::io::stdout().is_terminal()
}

/// Configure `colored` for the whole process.
pub fn init_colors(ansi: bool) {
    control::set_override(ansi);
}

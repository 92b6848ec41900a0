//! Terminal output helpers
//!
//! Every helper has a `_to` variant that writes to any `Write` so the
//! formatting can be tested.

use std::io::{self, Write};

use dialoguer::console::style;
use keychat::validator::{KeyStatus, ValidationResult};

/// Prints a success message with a green checkmark.
pub fn print_success_to<W: Write>(w: &mut W, message: &str) -> io::Result<()> {
    writeln!(w, "{} {}", style("✓").green().bold(), style(message).green())
}

/// Prints a warning message with a yellow marker.
pub fn print_warning_to<W: Write>(w: &mut W, message: &str) -> io::Result<()> {
    writeln!(w, "{} {}", style("!").yellow().bold(), style(message).yellow())
}

/// Prints an error message with a red X.
pub fn print_error_to<W: Write>(w: &mut W, message: &str) -> io::Result<()> {
    writeln!(w, "{} {}", style("✗").red().bold(), style(message).red())
}

/// Prints an error message to stderr.
pub fn print_error(message: &str) {
    let _ = print_error_to(&mut io::stderr(), message);
}

/// Prints a dimmed informational line.
pub fn print_notice_to<W: Write>(w: &mut W, message: &str) -> io::Result<()> {
    writeln!(w, "{}", style(message).dim())
}

/// Prints a validation outcome: headline, hint and response preview.
pub fn print_validation_to<W: Write>(w: &mut W, result: &ValidationResult) -> io::Result<()> {
    let label = result.label();
    match result.status {
        KeyStatus::Valid => print_success_to(w, &label)?,
        KeyStatus::RateLimited => print_warning_to(w, &label)?,
        _ => print_error_to(w, &label)?,
    }

    if let Some(error) = &result.error {
        if error != &label {
            writeln!(w, "  {}", error)?;
        }
    }

    if let Some(hint) = result.status.hint() {
        writeln!(w, "  {} {}", style("hint:").dim(), hint)?;
    }

    if let Some(preview) = &result.body_preview {
        let heading = if result.ok {
            "Response preview"
        } else {
            "Server response (preview)"
        };
        writeln!(w)?;
        writeln!(w, "{}", style(heading).bold())?;
        let pretty = serde_json::to_string_pretty(&preview.to_json())
            .unwrap_or_else(|_| "<unprintable>".to_string());
        writeln!(w, "{}", pretty)?;
    }

    Ok(())
}

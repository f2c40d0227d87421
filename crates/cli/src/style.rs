//! Shared styling utilities for progress output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold).
pub fn header(msg: &str) -> String {
    Style::new().bold().apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    Style::new().dim().apply_to(msg).to_string()
}

/// Branch name label (cyan, bold).
pub fn branch(name: &str) -> String {
    Style::new().cyan().bold().apply_to(name).to_string()
}

/// Abbreviated commit id (yellow).
pub fn commit(id: &str) -> String {
    let short = id.get(..10).unwrap_or(id);
    Style::new().yellow().apply_to(short).to_string()
}

/// Sync state: clean (green dot).
pub fn state_clean() -> String {
    let style = Style::new().green();
    format!("{} Clean", style.apply_to("●"))
}

/// Sync state: conflict pending (red dot).
pub fn state_conflict() -> String {
    let style = Style::new().red();
    format!("{} Conflict pending", style.apply_to("●"))
}

//! Compact formatting for log output

use std::time::Duration;

/// Format a duration as `HH:MM:SS`; hours may exceed 24
pub fn format_hms(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Abbreviate large amounts: `1500` -> `1.5K`, `2_000_000` -> `2.0M`
pub fn compact_amount(amount: f64) -> String {
    let abs = amount.abs();
    if abs >= 1_000_000_000.0 {
        format!("{:.1}B", amount / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("{:.1}M", amount / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", amount / 1_000.0)
    } else if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{:.2}", amount)
    }
}

/// Display name for a drop key: `material-dragon-scale` -> `dragon-scale`
pub fn material_name(key: &str) -> &str {
    key.strip_prefix("material-").unwrap_or(key)
}

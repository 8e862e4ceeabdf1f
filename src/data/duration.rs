//! Uptime formatting for display.

/// Format whole seconds of uptime as day/hour/minute tiers.
///
/// Renders `"{d}d {h}h {m}m"` once at least a day has passed,
/// `"{h}h {m}m"` once at least an hour has passed, and `"{m}m"` otherwise.
/// There is no seconds component at any tier.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

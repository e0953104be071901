//! Number and label formatting shared by the console and one-shot output.

use ratatui::style::Color;

use cwai_protocol::ThreatLevel;

/// `2.3` → `+2.3°C`, `-0.4` → `-0.4°C`, `0` → `0°C`.
pub fn format_temperature(value: f64) -> String {
    if value > 0.0 {
        format!("+{value}°C")
    } else {
        format!("{value}°C")
    }
}

/// `15` → `+15%`, `-15` → `-15%`.
pub fn format_percentage(value: f64) -> String {
    if value > 0.0 {
        format!("+{value}%")
    } else {
        format!("{value}%")
    }
}

/// `1234` → `1.2K`, `3_400_000` → `3.4M`; smaller values unchanged.
pub fn format_large_number(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value}")
    }
}

/// Confidence scores arrive as a 0..1 fraction or already as a percentage.
pub fn format_confidence(value: f64) -> String {
    let percent = if value <= 1.0 { value * 100.0 } else { value };
    format!("{percent:.0}%")
}

pub fn threat_color(level: ThreatLevel) -> Color {
    match level {
        ThreatLevel::Low => Color::Green,
        ThreatLevel::Medium => Color::Yellow,
        ThreatLevel::High => Color::LightRed,
        ThreatLevel::Critical => Color::Red,
    }
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

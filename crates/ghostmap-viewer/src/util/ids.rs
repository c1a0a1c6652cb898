const MAX_LABEL: usize = 42;

/// Clips long node labels for the canvas.
pub fn short_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL {
        return label.to_string();
    }
    let clipped: String = label.chars().take(MAX_LABEL).collect();
    format!("{clipped}...")
}

pub fn display_time(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "Unknown time",
    }
}

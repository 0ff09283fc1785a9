use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use eframe::egui::Color32;

/// Deterministic pseudo-random pair in `[-1, 1]` derived from an id.
pub fn stable_pair(id: &str) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

/// Maps `value` into `[0, 1]` on a log scale between `min` and `max`.
pub fn normalize_log(value: f64, min: f64, max: f64) -> f32 {
    let min = min.max(f64::MIN_POSITIVE);
    let max = max.max(min);
    let value = value.max(min);

    let denominator = max.ln() - min.ln();
    if denominator.abs() < f64::EPSILON {
        return 0.5;
    }

    ((value.ln() - min.ln()) / denominator).clamp(0.0, 1.0) as f32
}

pub fn normalize_linear(value: f64, min: f64, max: f64) -> f32 {
    if !value.is_finite() || (max - min).abs() < f64::EPSILON {
        return 0.5;
    }

    ((value - min) / (max - min)).clamp(0.0, 1.0) as f32
}

pub fn lerp_color(from: Color32, to: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let inverse = 1.0 - t;

    Color32::from_rgb(
        ((from.r() as f32 * inverse) + (to.r() as f32 * t)).round() as u8,
        ((from.g() as f32 * inverse) + (to.g() as f32 * t)).round() as u8,
        ((from.b() as f32 * inverse) + (to.b() as f32 * t)).round() as u8,
    )
}

pub fn color_to_hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

/// Parses `#rgb` or `#rrggbb`. Anything else yields `None`.
pub fn parse_hex_color(text: &str) -> Option<Color32> {
    let hex = text.trim().strip_prefix('#')?;
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();

    match hex.len() {
        6 => Some(Color32::from_rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => {
            let r = channel(0..1)?;
            let g = channel(1..2)?;
            let b = channel(2..3)?;
            Some(Color32::from_rgb(r * 17, g * 17, b * 17))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let first = stable_pair("ENSG00000075624");
        let second = stable_pair("ENSG00000075624");
        assert_eq!(first, second);
        assert!((-1.0..=1.0).contains(&first.0));
        assert!((-1.0..=1.0).contains(&first.1));
    }

    #[test]
    fn hex_colors_round_trip_through_color32() {
        let color = parse_hex_color("#1a2b3c").expect("valid hex");
        assert_eq!(color_to_hex(color), "#1a2b3c");
        assert_eq!(parse_hex_color("#fff"), Some(Color32::WHITE));
        assert_eq!(parse_hex_color("teal"), None);
    }

    #[test]
    fn normalisation_handles_flat_ranges() {
        assert_eq!(normalize_log(5.0, 5.0, 5.0), 0.5);
        assert_eq!(normalize_linear(2.0, 2.0, 2.0), 0.5);
        assert_eq!(normalize_linear(1000.0, 0.0, 1000.0), 1.0);
        assert!(normalize_log(10.0, 1.0, 100.0) > 0.49 && normalize_log(10.0, 1.0, 100.0) < 0.51);
    }
}

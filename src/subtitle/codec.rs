//! Timestamp and color codecs shared by the preview and burn-in builders.

use crate::model::HexColor;

/// Format seconds as a preview (WebVTT) timestamp: `HH:MM:SS.mmm`
pub fn format_preview_time(seconds: f64) -> String {
    let total_millis = to_units(seconds, 1000.0);
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let secs = (total_millis % 60_000) / 1_000;
    let millis = total_millis % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}

/// Format seconds as a burn-in (ASS) timestamp: `H:MM:SS.cc`
pub fn format_burn_in_time(seconds: f64) -> String {
    let total_centis = to_units(seconds, 100.0);
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let secs = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
}

/// Parse either timestamp flavour back to seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Burn-in alpha for a CSS opacity: 1 (opaque) maps to `00`, 0 (transparent) to `FF`.
pub fn alpha_hex(opacity: f64) -> String {
    let opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
    format!("{:02X}", ((1.0 - opacity) * 255.0).round() as u8)
}

/// Convert a CSS color and opacity to the burn-in `&HAABBGGRR` form.
pub fn ass_color(color: HexColor, opacity: f64) -> String {
    format!(
        "&H{}{:02X}{:02X}{:02X}",
        alpha_hex(opacity),
        color.blue,
        color.green,
        color.red
    )
}

/// Convert a color and opacity to a CSS `rgba()` value.
pub fn css_rgba(color: HexColor, opacity: f64) -> String {
    format!(
        "rgba({}, {}, {}, {})",
        color.red,
        color.green,
        color.blue,
        format_number(opacity.clamp(0.0, 1.0))
    )
}

/// Print a number without a trailing `.0` and with at most two decimals.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        let text = format!("{:.2}", rounded);
        text.trim_end_matches('0').to_string()
    }
}

fn to_units(seconds: f64, per_second: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * per_second).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_preview_time() {
        assert_eq!(format_preview_time(0.0), "00:00:00.000");
        assert_eq!(format_preview_time(90.5), "00:01:30.500");
        assert_eq!(format_preview_time(3661.123), "01:01:01.123");
        assert_eq!(format_preview_time(0.3), "00:00:00.300");
    }

    #[test]
    fn test_format_burn_in_time() {
        assert_eq!(format_burn_in_time(0.0), "0:00:00.00");
        assert_eq!(format_burn_in_time(90.5), "0:01:30.50");
        assert_eq!(format_burn_in_time(3661.126), "1:01:01.13");
        assert_eq!(format_burn_in_time(36000.0), "10:00:00.00");
    }

    #[test]
    fn test_negative_and_nan_times_clamp_to_zero() {
        assert_eq!(format_preview_time(-4.0), "00:00:00.000");
        assert_eq!(format_burn_in_time(f64::NAN), "0:00:00.00");
    }

    #[test]
    fn test_parse_timestamp_accepts_both_flavours() {
        assert_eq!(parse_timestamp("00:01:30.500"), Some(90.5));
        assert_eq!(parse_timestamp("0:01:30.50"), Some(90.5));
        assert_eq!(parse_timestamp("0:61:00.00"), None);
        assert_eq!(parse_timestamp("garbage"), None);
    }

    #[test]
    fn test_alpha_inverts_opacity() {
        assert_eq!(alpha_hex(1.0), "00");
        assert_eq!(alpha_hex(0.0), "FF");
        assert_eq!(alpha_hex(0.5), "80");
    }

    #[test]
    fn test_ass_color_reverses_channels() {
        let orange = HexColor::parse("#FF8000").unwrap();
        assert_eq!(ass_color(orange, 1.0), "&H000080FF");
        assert_eq!(&ass_color(orange, 1.0)[2..4], "00");
        assert_eq!(&ass_color(orange, 0.0)[2..4], "FF");
        assert_eq!(ass_color(HexColor::parse("#123456").unwrap(), 1.0), "&H00563412");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(64.0), "64");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33");
    }
}

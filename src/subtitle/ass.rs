use super::animation::{Anchor, AnimationTag, MARGIN_V};
use super::codec::{ass_color, format_burn_in_time, format_number};
use crate::model::{SubtitleChunk, SubtitleStyle, VideoSize};

/// Style name referenced by every dialogue line.
pub const STYLE_NAME: &str = "Default";

const MARGIN_H: u32 = 10;
const BACK_COLOUR: &str = "&H80000000";
const DEFAULT_ALIGNMENT: u8 = 2;

/// Build the burn-in subtitle document consumed by the compositor.
pub fn build_burn_in_track(chunks: &[SubtitleChunk], style: &SubtitleStyle, size: VideoSize) -> String {
    let anchor = Anchor::for_position(style.position, size);
    let animation = AnimationTag::new(style.animation, anchor, style.text_opacity);

    let mut ass = String::new();
    ass.push_str(&script_info(size));
    ass.push_str(&styles_section(style));
    ass.push_str("[Events]\n");
    ass.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    for chunk in chunks {
        ass.push_str(&dialogue_line(chunk, &anchor, &animation));
        ass.push('\n');
    }

    ass
}

fn script_info(size: VideoSize) -> String {
    format!(
        "[Script Info]\n; Script generated by reelgen\nScriptType: v4.00+\nPlayResX: {}\nPlayResY: {}\nWrapStyle: 0\nScaledBorderAndShadow: yes\n\n",
        size.width, size.height
    )
}

fn styles_section(style: &SubtitleStyle) -> String {
    let primary = ass_color(style.color, style.text_opacity);
    let outline = ass_color(style.stroke_color, 1.0);

    format!(
        "[V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: {},{},{},{},{},{},{},{},0,0,0,100,100,0,0,1,{},0,{},{},{},{},1\n\n",
        STYLE_NAME,
        style.font_family.replace(',', " "),
        format_number(style.font_size),
        primary,
        primary,
        outline,
        BACK_COLOUR,
        if style.is_bold() { -1 } else { 0 },
        format_number(style.stroke_width),
        DEFAULT_ALIGNMENT,
        MARGIN_H,
        MARGIN_H,
        MARGIN_V,
    )
}

fn dialogue_line(chunk: &SubtitleChunk, anchor: &Anchor, animation: &AnimationTag) -> String {
    let text = escape(chunk.text.trim());
    format!(
        "Dialogue: 0,{},{},{},,0,0,0,,{{{}{}}}{}",
        format_burn_in_time(chunk.start()),
        format_burn_in_time(chunk.end()),
        STYLE_NAME,
        anchor.tag(),
        animation.leading_tags(),
        animation.body(&text)
    )
}

/// Braces open override blocks, so literal ones become parentheses; newlines become hard breaks.
/// A literal backslash would start an escape like `\n`, so it is swapped for a look-alike.
fn escape(text: &str) -> String {
    text.replace('\\', "\u{29F5}")
        .replace('{', "(")
        .replace('}', ")")
        .replace("\r\n", "\\N")
        .replace('\n', "\\N")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Animation, HexColor, Position};

    fn chunks() -> Vec<SubtitleChunk> {
        vec![
            SubtitleChunk::new(" Hello", 0.0, 0.5),
            SubtitleChunk::new(" world.", 0.5, 90.5),
        ]
    }

    #[test]
    fn test_script_info_declares_canvas() {
        let ass = build_burn_in_track(&chunks(), &SubtitleStyle::default(), VideoSize::default());
        assert!(ass.starts_with("[Script Info]\n"));
        assert!(ass.contains("PlayResX: 1080\nPlayResY: 1920\n"));
    }

    #[test]
    fn test_style_line_uses_color_codec() {
        let style = SubtitleStyle {
            color: HexColor::parse("#FF8000").unwrap(),
            text_opacity: 0.0,
            ..SubtitleStyle::default()
        };
        let ass = build_burn_in_track(&[], &style, VideoSize::default());
        assert!(ass.contains(
            "Style: Default,Arial,64,&HFF0080FF,&HFF0080FF,&H00000000,&H80000000,-1,0,0,0,100,100,0,0,1,3,0,2,10,10,80,1\n"
        ));
    }

    #[test]
    fn test_one_dialogue_per_chunk_in_order() {
        let ass = build_burn_in_track(&chunks(), &SubtitleStyle::default(), VideoSize::default());
        let dialogues: Vec<&str> = ass.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert_eq!(dialogues.len(), 2);
        assert_eq!(dialogues[0], "Dialogue: 0,0:00:00.00,0:00:00.50,Default,,0,0,0,,{\\an2\\fad(300,300)}Hello");
        assert_eq!(dialogues[1], "Dialogue: 0,0:00:00.50,0:01:30.50,Default,,0,0,0,,{\\an2\\fad(300,300)}world.");
    }

    #[test]
    fn test_position_and_no_animation() {
        let style = SubtitleStyle {
            position: Position::Top,
            animation: Animation::None,
            ..SubtitleStyle::default()
        };
        let ass = build_burn_in_track(&chunks(), &style, VideoSize::default());
        assert!(ass.contains(",,{\\an8}Hello\n"));
    }

    #[test]
    fn test_typewriter_dialogue() {
        let style = SubtitleStyle {
            position: Position::Center,
            animation: Animation::Typewriter,
            ..SubtitleStyle::default()
        };
        let chunk = SubtitleChunk::new("Hi there", 1.0, 2.0);
        let ass = build_burn_in_track(&[chunk], &style, VideoSize::default());
        assert!(ass.contains(
            "{\\an5}{\\alpha&HFF&\\t(0,1,\\alpha&H00&)}Hi {\\alpha&HFF&\\t(200,201,\\alpha&H00&)}there\n"
        ));
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(escape("a {b}\nc"), "a (b)\\Nc");
    }

    #[test]
    fn test_backslashes_cannot_form_control_codes() {
        let escaped = escape("C:\\new\\Hard");
        assert_eq!(escaped, "C:\u{29F5}new\u{29F5}Hard");
        assert!(!escaped.contains('\\'));
        assert_eq!(escape("line\nbreak"), "line\\Nbreak");
    }
}

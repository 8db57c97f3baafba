use super::codec::{css_rgba, format_number, format_preview_time};
use crate::model::{Position, SubtitleChunk, SubtitleStyle};

/// Build the WebVTT preview track: a global `::cue` style block followed by one cue per chunk.
pub fn build_preview_track(chunks: &[SubtitleChunk], style: &SubtitleStyle) -> String {
    let mut vtt = String::from("WEBVTT\n\n");
    vtt.push_str(&style_block(style));

    let settings = cue_settings(style.position);
    for (index, chunk) in chunks.iter().enumerate() {
        vtt.push_str(&format!(
            "{}\n{} --> {} {}\n{}\n\n",
            index + 1,
            format_preview_time(chunk.start()),
            format_preview_time(chunk.end()),
            settings,
            emphasize_middle_word(&chunk.text)
        ));
    }

    vtt
}

fn style_block(style: &SubtitleStyle) -> String {
    format!(
        "STYLE\n::cue {{\n  font-family: \"{}\", sans-serif;\n  font-size: {}px;\n  font-weight: {};\n  color: {};\n  -webkit-text-stroke: {}px {};\n  paint-order: stroke fill;\n  background-color: transparent;\n}}\n\n",
        style.font_family.replace('"', ""),
        format_number(style.font_size),
        style.font_weight,
        css_rgba(style.color, style.text_opacity),
        format_number(style.stroke_width),
        style.stroke_color.to_css()
    )
}

fn cue_settings(position: Position) -> &'static str {
    match position {
        Position::Top => "line:10% align:center",
        Position::Center => "line:50% align:center",
        Position::Bottom => "line:90% align:center",
    }
}

/// Wrap the middle word (index `len / 2`) of the cue text in `<b>`.
pub fn emphasize_middle_word(text: &str) -> String {
    let words: Vec<String> = text.split_whitespace().map(escape).collect();
    if words.is_empty() {
        return String::new();
    }

    let middle = words.len() / 2;
    words
        .iter()
        .enumerate()
        .map(|(index, word)| {
            if index == middle {
                format!("<b>{}</b>", word)
            } else {
                word.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

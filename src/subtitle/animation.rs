//! Burn-in animation strategies.
//!
//! Each [`Animation`] maps to one [`AnimationTag`] variant; the variant decides
//! which override tags lead the dialogue line and how the text body is written.

use super::codec::alpha_hex;
use crate::model::{Animation, Position, VideoSize};

/// Fade in/out window used by every animated style.
pub const FADE_MS: u32 = 300;
/// Distance a sliding line travels before coming to rest.
pub const SLIDE_DISTANCE_PX: i64 = 50;
/// Peak scale reached by the pop animation.
pub const POP_PEAK_PERCENT: u32 = 120;
/// Reading speed assumed by the typewriter reveal: one character per 100ms.
pub const TYPEWRITER_CHARS_PER_SECOND: f64 = 10.0;

/// Default vertical margin applied to top and bottom anchored lines.
pub const MARGIN_V: u32 = 80;

/// Where a dialogue line rests on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Numpad alignment used by `\an`
    pub alignment: u8,
    pub x: i64,
    pub y: i64,
}

impl Anchor {
    pub fn for_position(position: Position, size: VideoSize) -> Self {
        let x = i64::from(size.width / 2);
        let height = i64::from(size.height);
        let margin = i64::from(MARGIN_V);

        match position {
            Position::Top => Self { alignment: 8, x, y: margin },
            Position::Center => Self { alignment: 5, x, y: height / 2 },
            Position::Bottom => Self { alignment: 2, x, y: height - margin },
        }
    }

    pub fn tag(&self) -> String {
        format!("\\an{}", self.alignment)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationTag {
    None,
    Fade { fade_ms: u32 },
    Slide { fade_ms: u32, from: (i64, i64), to: (i64, i64) },
    Pop { fade_ms: u32, peak_percent: u32 },
    /// Word-by-word reveal; `alpha` is the resting text alpha the words are revealed to.
    Typewriter { alpha: String },
}

impl AnimationTag {
    pub fn new(animation: Animation, anchor: Anchor, text_opacity: f64) -> Self {
        match animation {
            Animation::None => AnimationTag::None,
            Animation::Fade => AnimationTag::Fade { fade_ms: FADE_MS },
            Animation::Slide => AnimationTag::Slide {
                fade_ms: FADE_MS,
                from: (anchor.x, anchor.y + SLIDE_DISTANCE_PX),
                to: (anchor.x, anchor.y),
            },
            Animation::Pop => AnimationTag::Pop {
                fade_ms: FADE_MS,
                peak_percent: POP_PEAK_PERCENT,
            },
            Animation::Typewriter => AnimationTag::Typewriter {
                alpha: alpha_hex(text_opacity),
            },
        }
    }

    /// Tags that belong in the leading override block of the line.
    pub fn leading_tags(&self) -> String {
        match self {
            AnimationTag::None | AnimationTag::Typewriter { .. } => String::new(),
            AnimationTag::Fade { fade_ms } => fade(*fade_ms),
            AnimationTag::Slide { fade_ms, from, to } => format!(
                "\\move({},{},{},{},0,{}){}",
                from.0,
                from.1,
                to.0,
                to.1,
                fade_ms,
                fade(*fade_ms)
            ),
            AnimationTag::Pop { fade_ms, peak_percent } => {
                let half = fade_ms / 2;
                format!(
                    "{}\\t(0,{},\\fscx{}\\fscy{})\\t({},{},\\fscx100\\fscy100)",
                    fade(*fade_ms),
                    half,
                    peak_percent,
                    peak_percent,
                    half,
                    fade_ms
                )
            }
        }
    }

    /// Text body, already escaped for the burn-in format.
    pub fn body(&self, text: &str) -> String {
        match self {
            AnimationTag::Typewriter { alpha } => typewriter_body(text, alpha),
            _ => text.to_string(),
        }
    }
}

/// Estimated time to speak `word`: `chars / 10` seconds, in milliseconds.
///
/// This is a reading-speed heuristic, not a measurement of the narration, so
/// the reveal only approximates the spoken pace.
pub fn estimated_word_ms(word: &str) -> u64 {
    (word.chars().count() as f64 / TYPEWRITER_CHARS_PER_SECOND * 1000.0).round() as u64
}

/// Reveal delay of every word, accumulated from the estimated durations of the words before it.
pub fn typewriter_delays(text: &str) -> Vec<u64> {
    let mut elapsed = 0;
    text.split_whitespace()
        .map(|word| {
            let delay = elapsed;
            elapsed += estimated_word_ms(word);
            delay
        })
        .collect()
}

fn typewriter_body(text: &str, alpha: &str) -> String {
    text.split_whitespace()
        .zip(typewriter_delays(text))
        .map(|(word, delay)| {
            format!(
                "{{\\alpha&HFF&\\t({},{},\\alpha&H{}&)}}{}",
                delay,
                delay + 1,
                alpha,
                word
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fade(ms: u32) -> String {
    format!("\\fad({},{})", ms, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bottom_anchor() -> Anchor {
        Anchor::for_position(Position::Bottom, VideoSize::default())
    }

    #[test]
    fn test_anchor_alignment_by_position() {
        let size = VideoSize::default();
        assert_eq!(Anchor::for_position(Position::Top, size).alignment, 8);
        assert_eq!(Anchor::for_position(Position::Center, size).alignment, 5);
        let bottom = Anchor::for_position(Position::Bottom, size);
        assert_eq!(bottom.alignment, 2);
        assert_eq!((bottom.x, bottom.y), (540, 1840));
        assert_eq!(bottom.tag(), "\\an2");
    }

    #[test]
    fn test_none_adds_nothing() {
        let tag = AnimationTag::new(Animation::None, bottom_anchor(), 1.0);
        assert_eq!(tag.leading_tags(), "");
        assert_eq!(tag.body("hello there"), "hello there");
    }

    #[test]
    fn test_fade_uses_fixed_window() {
        let tag = AnimationTag::new(Animation::Fade, bottom_anchor(), 1.0);
        assert_eq!(tag.leading_tags(), "\\fad(300,300)");
    }

    #[test]
    fn test_slide_moves_fifty_pixels_into_place() {
        let tag = AnimationTag::new(Animation::Slide, bottom_anchor(), 1.0);
        assert_eq!(tag.leading_tags(), "\\move(540,1890,540,1840,0,300)\\fad(300,300)");
    }

    #[test]
    fn test_pop_scales_up_and_back() {
        let tag = AnimationTag::new(Animation::Pop, bottom_anchor(), 1.0);
        assert_eq!(
            tag.leading_tags(),
            "\\fad(300,300)\\t(0,150,\\fscx120\\fscy120)\\t(150,300,\\fscx100\\fscy100)"
        );
    }

    #[test]
    fn test_typewriter_delays_accumulate() {
        assert_eq!(typewriter_delays("Hi there, you"), vec![0, 200, 800]);
        assert_eq!(estimated_word_ms("chocolates"), 1000);
        assert!(typewriter_delays("   ").is_empty());
    }

    #[test]
    fn test_typewriter_body_reveals_each_word() {
        let tag = AnimationTag::new(Animation::Typewriter, bottom_anchor(), 1.0);
        assert_eq!(tag.leading_tags(), "");
        assert_eq!(
            tag.body("Hi there"),
            "{\\alpha&HFF&\\t(0,1,\\alpha&H00&)}Hi {\\alpha&HFF&\\t(200,201,\\alpha&H00&)}there"
        );
    }
}

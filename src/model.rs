use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ReelError, Result};

/// Narration pace used to estimate a script's spoken length.
const WORDS_PER_SECOND: f64 = 2.5;

/// Narration text for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Script(String);

impl Script {
    pub fn new<S: Into<String>>(text: S) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ReelError::InvalidInput("Script must not be empty".to_string()));
        }
        Ok(Self(text))
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    /// `ceil(word_count / 2.5)`
    pub fn estimated_duration_seconds(&self) -> u64 {
        (self.word_count() as f64 / WORDS_PER_SECOND).ceil() as u64
    }
}

impl TryFrom<String> for Script {
    type Error = ReelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Script> for String {
    fn from(script: Script) -> Self {
        script.0
    }
}

/// Narration voices understood by the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Voice {
    #[default]
    AfHeart,
    AfBella,
    AfNicole,
    AmMichael,
    BfEmma,
    BmGeorge,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::AfHeart,
        Voice::AfBella,
        Voice::AfNicole,
        Voice::AmMichael,
        Voice::BfEmma,
        Voice::BmGeorge,
    ];

    /// Identifier passed verbatim to the synthesizer engine
    pub fn id(&self) -> &'static str {
        match self {
            Voice::AfHeart => "af_heart",
            Voice::AfBella => "af_bella",
            Voice::AfNicole => "af_nicole",
            Voice::AmMichael => "am_michael",
            Voice::BfEmma => "bf_emma",
            Voice::BmGeorge => "bm_george",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Voice::AfHeart => "American Female (Heart)",
            Voice::AfBella => "American Female (Bella)",
            Voice::AfNicole => "American Female (Nicole)",
            Voice::AmMichael => "American Male (Michael)",
            Voice::BfEmma => "British Female (Emma)",
            Voice::BmGeorge => "British Male (George)",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Voice {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self> {
        Voice::ALL
            .iter()
            .copied()
            .find(|voice| voice.id() == s.trim().to_lowercase())
            .ok_or_else(|| ReelError::InvalidInput(format!("Unknown voice '{}'", s)))
    }
}

/// Compute device requested from the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceHint {
    Cpu,
    #[default]
    Gpu,
}

impl DeviceHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceHint::Cpu => "cpu",
            DeviceHint::Gpu => "gpu",
        }
    }
}

/// Mono PCM audio as produced by the synthesizer
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(ReelError::InvalidInput("Sample rate must be positive".to_string()));
        }
        if sample_rate > crate::wav::MAX_SAMPLE_RATE {
            return Err(ReelError::InvalidInput(format!("Sample rate {} is too high for a WAV header", sample_rate)));
        }
        Ok(Self { samples, sample_rate })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// A transcribed span of text with its start and end time in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleChunk {
    pub text: String,
    pub timestamp: [f64; 2],
}

impl SubtitleChunk {
    pub fn new<S: Into<String>>(text: S, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            timestamp: [start, end],
        }
    }

    pub fn start(&self) -> f64 {
        self.timestamp[0]
    }

    pub fn end(&self) -> f64 {
        self.timestamp[1]
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start() && time <= self.end()
    }
}

/// `#RRGGBB` color, parsed once so the subtitle codecs never fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl HexColor {
    pub const WHITE: HexColor = HexColor { red: 0xFF, green: 0xFF, blue: 0xFF };
    pub const BLACK: HexColor = HexColor { red: 0, green: 0, blue: 0 };

    /// Accepts `#RRGGBB`, `RRGGBB` and the `#RGB` shorthand.
    pub fn parse(value: &str) -> Result<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ReelError::InvalidInput(format!("Invalid hex color '{}'", value)));
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(ReelError::InvalidInput(format!("Invalid hex color '{}'", value))),
        };

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&expanded[range], 16)
                .map_err(|_| ReelError::InvalidInput(format!("Invalid hex color '{}'", value)))
        };

        Ok(Self {
            red: channel(0..2)?,
            green: channel(2..4)?,
            blue: channel(4..6)?,
        })
    }

    pub fn to_css(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ReelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_css()
    }
}

impl FromStr for HexColor {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Top,
    Center,
    #[default]
    Bottom,
}

impl FromStr for Position {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(Position::Top),
            "center" => Ok(Position::Center),
            "bottom" => Ok(Position::Bottom),
            _ => Err(ReelError::InvalidInput(format!(
                "Invalid position '{}'. Valid positions: top, center, bottom",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Animation {
    None,
    #[default]
    Fade,
    Slide,
    Pop,
    Typewriter,
}

impl FromStr for Animation {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Animation::None),
            "fade" => Ok(Animation::Fade),
            "slide" => Ok(Animation::Slide),
            "pop" => Ok(Animation::Pop),
            "typewriter" => Ok(Animation::Typewriter),
            _ => Err(ReelError::InvalidInput(format!(
                "Invalid animation '{}'. Valid animations: none, fade, slide, pop, typewriter",
                s
            ))),
        }
    }
}

/// Visual style shared by the preview overlay and the burned-in subtitles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleStyle {
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u16,
    pub color: HexColor,
    /// 0 = transparent, 1 = opaque
    pub text_opacity: f64,
    pub stroke_width: f64,
    pub stroke_color: HexColor,
    pub position: Position,
    pub animation: Animation,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 64.0,
            font_weight: 700,
            color: HexColor::WHITE,
            text_opacity: 1.0,
            stroke_width: 3.0,
            stroke_color: HexColor::BLACK,
            position: Position::Bottom,
            animation: Animation::Fade,
        }
    }
}

impl SubtitleStyle {
    pub fn validate(&self) -> Result<()> {
        if self.font_family.trim().is_empty() {
            return Err(ReelError::InvalidInput("Font family must not be empty".to_string()));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ReelError::InvalidInput(format!(
                "Font size must be positive, got {}",
                self.font_size
            )));
        }
        if !(0.0..=1.0).contains(&self.text_opacity) {
            return Err(ReelError::InvalidInput(format!(
                "Text opacity must be within [0, 1], got {}",
                self.text_opacity
            )));
        }
        if !(self.stroke_width.is_finite() && self.stroke_width >= 0.0) {
            return Err(ReelError::InvalidInput(format!(
                "Stroke width must not be negative, got {}",
                self.stroke_width
            )));
        }
        Ok(())
    }

    pub fn is_bold(&self) -> bool {
        self.font_weight >= 600
    }
}

/// Output canvas, chosen from [`VideoSize::PRESETS`] and serialized by its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
    pub aspect_ratio_label: &'static str,
}

impl VideoSize {
    pub const PRESETS: [VideoSize; 4] = [
        VideoSize { width: 1080, height: 1920, aspect_ratio_label: "9:16" },
        VideoSize { width: 1080, height: 1080, aspect_ratio_label: "1:1" },
        VideoSize { width: 1080, height: 1350, aspect_ratio_label: "4:5" },
        VideoSize { width: 1920, height: 1080, aspect_ratio_label: "16:9" },
    ];
}

impl Default for VideoSize {
    fn default() -> Self {
        VideoSize::PRESETS[0]
    }
}

impl TryFrom<String> for VideoSize {
    type Error = ReelError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<VideoSize> for String {
    fn from(size: VideoSize) -> Self {
        size.aspect_ratio_label.to_string()
    }
}

impl FromStr for VideoSize {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self> {
        VideoSize::PRESETS
            .iter()
            .copied()
            .find(|size| size.aspect_ratio_label == s.trim())
            .ok_or_else(|| {
                let labels: Vec<&str> = VideoSize::PRESETS.iter().map(|p| p.aspect_ratio_label).collect();
                ReelError::InvalidInput(format!(
                    "Unknown video size '{}'. Valid sizes: {}",
                    s,
                    labels.join(", ")
                ))
            })
    }
}

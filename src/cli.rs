use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::model::{Animation, HexColor, Position, SubtitleStyle, VideoSize, Voice};
use crate::wav::MAX_SAMPLE_RATE;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Turn a script into narration, subtitles and (with a background video) a reel
    Generate {
        /// Script text
        #[arg(short, long, conflicts_with = "script_file", required_unless_present = "script_file")]
        script: Option<String>,

        /// Read the script from a file
        #[arg(long)]
        script_file: Option<PathBuf>,

        /// Narration voice (see `voices`)
        #[arg(long, default_value = "af_heart")]
        voice: Voice,

        /// Output canvas preset (see `sizes`)
        #[arg(long, default_value = "9:16")]
        size: VideoSize,

        /// Background video to burn the subtitles into
        #[arg(short, long)]
        background: Option<PathBuf>,

        /// Output directory for generated files
        #[arg(short, long, default_value = "reel-output")]
        output_dir: PathBuf,

        #[command(flatten)]
        style: StyleOverrides,
    },

    /// Build the preview and burn-in tracks from a chunk JSON file
    Subtitles {
        /// Chunk file (`[{"text": ..., "timestamp": [start, end]}]`)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value = "9:16")]
        size: VideoSize,

        /// Output directory for the .vtt and .ass files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        style: StyleOverrides,
    },

    /// Show the overlay for one playback instant
    Preview {
        /// Chunk file
        #[arg(short, long)]
        input: PathBuf,

        /// Playback time in seconds
        #[arg(short, long)]
        time: f64,

        /// Width the video is rendered at, in pixels
        #[arg(short, long, default_value = "1080")]
        width: f64,

        #[arg(long, default_value = "9:16")]
        size: VideoSize,

        #[command(flatten)]
        style: StyleOverrides,
    },

    /// Encode raw little-endian f32 mono PCM into a WAV file
    EncodeWav {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(
            short = 'r',
            long,
            default_value = "24000",
            value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_SAMPLE_RATE))
        )]
        sample_rate: u32,
    },

    /// List available narration voices
    Voices,

    /// List available video size presets
    Sizes,

    /// List available whisper models and their status
    Models {
        /// Download the named model, or every missing one with no name
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        download: Option<String>,
    },

    /// Write the default configuration
    InitConfig {
        #[arg(short, long, default_value = "reelgen.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// What a Ctrl-C does during `generate`, by how many have arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Cancel the run; the composite stops, other steps finish
    Cancel,
    /// Leave immediately
    Quit,
}

impl Interrupt {
    pub fn nth(count: usize) -> Self {
        if count <= 1 { Interrupt::Cancel } else { Interrupt::Quit }
    }
}

/// Subtitle style flags shared by the commands that render subtitles
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct StyleOverrides {
    #[arg(long)]
    pub font: Option<String>,

    #[arg(long)]
    pub font_size: Option<f64>,

    #[arg(long)]
    pub font_weight: Option<u16>,

    /// Text color, #RRGGBB
    #[arg(long)]
    pub color: Option<HexColor>,

    /// Text opacity in [0, 1]
    #[arg(long)]
    pub opacity: Option<f64>,

    #[arg(long)]
    pub stroke_width: Option<f64>,

    #[arg(long)]
    pub stroke_color: Option<HexColor>,

    /// top, center or bottom
    #[arg(long)]
    pub position: Option<Position>,

    /// none, fade, slide, pop or typewriter
    #[arg(long)]
    pub animation: Option<Animation>,
}

impl StyleOverrides {
    /// Apply the given flags on top of `base`.
    pub fn apply(&self, base: &SubtitleStyle) -> SubtitleStyle {
        let mut style = base.clone();
        if let Some(font) = &self.font {
            style.font_family = font.clone();
        }
        if let Some(size) = self.font_size {
            style.font_size = size;
        }
        if let Some(weight) = self.font_weight {
            style.font_weight = weight;
        }
        if let Some(color) = self.color {
            style.color = color;
        }
        if let Some(opacity) = self.opacity {
            style.text_opacity = opacity;
        }
        if let Some(width) = self.stroke_width {
            style.stroke_width = width;
        }
        if let Some(color) = self.stroke_color {
            style.stroke_color = color;
        }
        if let Some(position) = self.position {
            style.position = position;
        }
        if let Some(animation) = self.animation {
            style.animation = animation;
        }
        style
    }
}

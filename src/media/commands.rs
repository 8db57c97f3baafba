use crate::config::MediaConfig;

/// Names of the files staged into a compositor session workspace
pub const BACKGROUND_VIDEO: &str = "input.mp4";
pub const NARRATION_AUDIO: &str = "audio.wav";
pub const BURN_IN_SUBTITLES: &str = "subtitles.ass";
pub const FONTS_DIR: &str = "fonts";
pub const OUTPUT_VIDEO: &str = "output.mp4";

/// Abstract media processing command representation
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCommand {
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S: Into<String>>(description: S) -> Self {
        Self {
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<S: Into<String>>(self, path: S) -> Self {
        self.arg("-i").arg(path)
    }

    pub fn output<S: Into<String>>(self, path: S) -> Self {
        self.arg(path)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Select a stream, e.g. `0:v`
    pub fn map<S: Into<String>>(self, stream: S) -> Self {
        self.arg("-map").arg(stream)
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Stop at the end of the shortest input
    pub fn shortest(self) -> Self {
        self.arg("-shortest")
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

/// `subtitles` filter burning in the staged markup, optionally with a staged font directory
pub fn subtitles_filter(with_fonts: bool) -> String {
    if with_fonts {
        format!("subtitles={}:fontsdir={}", BURN_IN_SUBTITLES, FONTS_DIR)
    } else {
        format!("subtitles={}", BURN_IN_SUBTITLES)
    }
}

/// Build the composite command: video from input 1, audio from input 2,
/// subtitles burned in, trimmed to the shorter input.
pub fn composite_command(config: &MediaConfig, with_fonts: bool) -> MediaCommand {
    MediaCommand::new("Burn-in composite")
        .overwrite()
        .input(BACKGROUND_VIDEO)
        .input(NARRATION_AUDIO)
        .video_filter(subtitles_filter(with_fonts))
        .map("0:v")
        .map("1:a")
        .video_codec(config.video_codec.as_str())
        .preset(config.preset.as_str())
        .audio_codec(config.audio_codec.as_str())
        .shortest()
        .args(config.extra_options.iter().cloned())
        .output(OUTPUT_VIDEO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_composite_command_layout() {
        let args = composite_command(&Config::default().media, true).into_args();
        assert_eq!(
            args.join(" "),
            "-y -i input.mp4 -i audio.wav -vf subtitles=subtitles.ass:fontsdir=fonts \
             -map 0:v -map 1:a -c:v libx264 -preset ultrafast -c:a aac -shortest output.mp4"
        );
    }

    #[test]
    fn test_extra_options_precede_output() {
        let mut media = Config::default().media;
        media.extra_options = vec!["-crf".to_string(), "23".to_string()];
        let args = composite_command(&media, false).into_args();

        assert!(args.contains(&"subtitles=subtitles.ass".to_string()));
        let n = args.len();
        assert_eq!(&args[n - 3..], &["-crf", "23", "output.mp4"]);
    }
}

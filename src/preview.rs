use serde::Serialize;

use crate::model::{HexColor, Position, SubtitleChunk, SubtitleStyle, VideoSize};

/// Playback element driving the overlay; passed in explicitly by the caller.
pub trait PlaybackSurface {
    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Width the video is rendered at on screen, in pixels
    fn rendered_width(&self) -> f64;
}

/// Fixed surface state, for callers that poll their player themselves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSnapshot {
    pub time: f64,
    pub rendered_width: f64,
}

impl PlaybackSurface for SurfaceSnapshot {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn rendered_width(&self) -> f64 {
        self.rendered_width
    }
}

/// Style metrics for the on-screen overlay, scaled to the rendered surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayStyle {
    pub font_family: String,
    pub font_size: f64,
    pub font_weight: u16,
    pub color: HexColor,
    pub text_opacity: f64,
    pub stroke_width: f64,
    pub stroke_color: HexColor,
    pub position: Position,
    pub scale: f64,
}

/// What the overlay should show at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayFrame {
    pub time: f64,
    pub chunk_index: Option<usize>,
    pub text: Option<String>,
    pub style: OverlayStyle,
}

pub struct PreviewSynchronizer<'a> {
    chunks: &'a [SubtitleChunk],
    style: &'a SubtitleStyle,
    video_size: VideoSize,
}

impl<'a> PreviewSynchronizer<'a> {
    pub fn new(chunks: &'a [SubtitleChunk], style: &'a SubtitleStyle, video_size: VideoSize) -> Self {
        Self { chunks, style, video_size }
    }

    /// Chunk whose `[start, end]` contains `time`; the first match wins.
    pub fn active_chunk(&self, time: f64) -> Option<(usize, &'a SubtitleChunk)> {
        if !time.is_finite() {
            return None;
        }
        let chunks: &'a [SubtitleChunk] = self.chunks;
        chunks
            .iter()
            .enumerate()
            .take_while(|(_, chunk)| chunk.start() <= time)
            .find(|(_, chunk)| chunk.contains(time))
    }

    /// `rendered_width / video_width`, or `None` when that is not a positive finite number.
    pub fn scale_factor(&self, rendered_width: f64) -> Option<f64> {
        let scale = rendered_width / f64::from(self.video_size.width);
        (scale.is_finite() && scale > 0.0).then_some(scale)
    }

    pub fn overlay_style(&self, rendered_width: f64) -> OverlayStyle {
        let scale = self.scale_factor(rendered_width).unwrap_or(1.0);
        OverlayStyle {
            font_family: self.style.font_family.clone(),
            font_size: self.style.font_size * scale,
            font_weight: self.style.font_weight,
            color: self.style.color,
            text_opacity: self.style.text_opacity,
            stroke_width: self.style.stroke_width * scale,
            stroke_color: self.style.stroke_color,
            position: self.style.position,
            scale,
        }
    }

    pub fn frame<S: PlaybackSurface + ?Sized>(&self, surface: &S) -> OverlayFrame {
        let time = surface.current_time();
        let active = self.active_chunk(time);
        OverlayFrame {
            time,
            chunk_index: active.map(|(index, _)| index),
            text: active.map(|(_, chunk)| chunk.text.trim().to_string()),
            style: self.overlay_style(surface.rendered_width()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<SubtitleChunk> {
        vec![
            SubtitleChunk::new(" Life", 0.0, 0.4),
            SubtitleChunk::new(" is", 0.4, 0.6),
            SubtitleChunk::new(" like", 1.0, 1.3),
        ]
    }

    #[test]
    fn test_active_chunk_lookup() {
        let chunks = chunks();
        let style = SubtitleStyle::default();
        let sync = PreviewSynchronizer::new(&chunks, &style, VideoSize::default());

        assert_eq!(sync.active_chunk(0.2).map(|(i, _)| i), Some(0));
        assert_eq!(sync.active_chunk(0.5).map(|(i, _)| i), Some(1));
        assert_eq!(sync.active_chunk(0.8), None);
        assert_eq!(sync.active_chunk(1.3).map(|(i, _)| i), Some(2));
        assert_eq!(sync.active_chunk(5.0), None);
        assert_eq!(sync.active_chunk(f64::NAN), None);
    }

    #[test]
    fn test_first_match_wins_on_shared_boundary() {
        let chunks = chunks();
        let style = SubtitleStyle::default();
        let sync = PreviewSynchronizer::new(&chunks, &style, VideoSize::default());
        assert_eq!(sync.active_chunk(0.4).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn test_style_scales_with_rendered_width() {
        let chunks = chunks();
        let style = SubtitleStyle::default();
        let sync = PreviewSynchronizer::new(&chunks, &style, VideoSize::default());

        let overlay = sync.overlay_style(540.0);
        assert_eq!(overlay.scale, 0.5);
        assert_eq!(overlay.font_size, 32.0);
        assert_eq!(overlay.stroke_width, 1.5);
    }

    #[test]
    fn test_unscaled_fallback() {
        let chunks = chunks();
        let style = SubtitleStyle::default();
        let sync = PreviewSynchronizer::new(&chunks, &style, VideoSize::default());

        for width in [0.0, -100.0, f64::NAN, f64::INFINITY] {
            let overlay = sync.overlay_style(width);
            assert_eq!(overlay.scale, 1.0);
            assert_eq!(overlay.font_size, style.font_size);
            assert_eq!(overlay.stroke_width, style.stroke_width);
        }
    }

    #[test]
    fn test_frame_reads_surface() {
        let chunks = chunks();
        let style = SubtitleStyle::default();
        let sync = PreviewSynchronizer::new(&chunks, &style, VideoSize::default());

        let frame = sync.frame(&SurfaceSnapshot { time: 1.1, rendered_width: 270.0 });
        assert_eq!(frame.chunk_index, Some(2));
        assert_eq!(frame.text.as_deref(), Some("like"));
        assert_eq!(frame.style.font_size, 16.0);
    }
}

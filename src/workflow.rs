use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::artifacts::GeneratedArtifacts;
use crate::config::Config;
use crate::error::{ReelError, Result};
use crate::media::{
    composite_command, find_font, Compositor, CompositorFactory, CompositorSession, BACKGROUND_VIDEO,
    BURN_IN_SUBTITLES, FONTS_DIR, NARRATION_AUDIO, OUTPUT_VIDEO,
};
use crate::model::{Script, SubtitleStyle, VideoSize, Voice};
use crate::progress::{GenerationStep, StepId, StepTracker};
use crate::subtitle::build_tracks;
use crate::synthesize::{SpeechSynthesizer, SynthesizerFactory};
use crate::transcribe::{AudioHandle, TranscribeOptions, Transcriber, TranscriberFactory};
use crate::wav::encode_buffer;

const NARRATION_FILE: &str = "narration.wav";

/// Inputs of one generation run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub script: Script,
    pub voice: Voice,
    pub style: SubtitleStyle,
    pub video_size: VideoSize,
    /// Encoded background video; without it the run only produces audio and subtitles
    pub background_video: Option<Vec<u8>>,
}

/// Runs the audio → subtitles → processing → finalizing pipeline.
///
/// One run at a time: a second `generate` while a run is active fails with
/// [`ReelError::Busy`], so a compositor session is never shared.
pub struct Workflow {
    config: Config,
    synthesizer: Box<dyn SpeechSynthesizer>,
    transcriber: Box<dyn Transcriber>,
    compositor: Box<dyn Compositor>,
    tracker: StepTracker,
    run_lock: Mutex<()>,
    cancel: watch::Sender<bool>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let synthesizer = SynthesizerFactory::create_default(config.synthesizer.clone());
        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
        let compositor = CompositorFactory::create_compositor(config.media.clone());
        Ok(Self::with_adapters(config, synthesizer, transcriber, compositor))
    }

    pub fn with_adapters(
        config: Config,
        synthesizer: Box<dyn SpeechSynthesizer>,
        transcriber: Box<dyn Transcriber>,
        compositor: Box<dyn Compositor>,
    ) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            config,
            synthesizer,
            transcriber,
            compositor,
            tracker: StepTracker::new(),
            run_lock: Mutex::new(()),
            cancel,
        }
    }

    /// Check dependencies up front; the compositor only matters when compositing.
    pub async fn check_availability(&self, with_compositor: bool) -> Result<()> {
        self.synthesizer.check_availability().await?;
        self.transcriber.check_availability().await?;
        if with_compositor {
            self.compositor.check_availability().await?;
        }
        Ok(())
    }

    /// Step snapshots of the current (or last) run
    pub fn subscribe(&self) -> watch::Receiver<Vec<GenerationStep>> {
        self.tracker.subscribe()
    }

    pub fn steps(&self) -> Vec<GenerationStep> {
        self.tracker.snapshot()
    }

    /// Stop the active run at the compositor boundary.
    ///
    /// A running composite is killed and a processing step that has not
    /// started yet never starts. Synthesis and transcription run to completion.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel.send_replace(true);
    }

    pub async fn generate(&self, request: GenerationRequest) -> Result<GeneratedArtifacts> {
        let _run = self.run_lock.try_lock().map_err(|_| ReelError::Busy)?;
        request.style.validate()?;

        self.cancel.send_replace(false);
        self.tracker.reset();

        let run_id = Uuid::new_v4();
        let span = info_span!("generation", run_id = %run_id);
        self.run(run_id, &request).instrument(span).await
    }

    async fn run(&self, run_id: Uuid, request: &GenerationRequest) -> Result<GeneratedArtifacts> {
        info!(
            "Starting generation: {} words (~{}s), voice {}, size {}",
            request.script.word_count(),
            request.script.estimated_duration_seconds(),
            request.voice,
            request.video_size.aspect_ratio_label
        );

        let mut session: Option<Box<dyn CompositorSession>> = None;
        let outcome = self.run_steps(run_id, request, &mut session).await;

        // Released whatever the outcome
        if let Some(mut session) = session.take() {
            if let Err(e) = session.terminate().await {
                warn!("Failed to release compositor session: {}", e);
            }
        }

        match &outcome {
            Ok(artifacts) => info!("Generation finished, primary artifact {}", artifacts.primary_download().file_name),
            Err(e) => error!("Generation failed: {}", e),
        }
        outcome
    }

    async fn run_steps(
        &self,
        run_id: Uuid,
        request: &GenerationRequest,
        session: &mut Option<Box<dyn CompositorSession>>,
    ) -> Result<GeneratedArtifacts> {
        let workdir = tempfile::Builder::new().prefix("reelgen-run-").tempdir()?;
        let narration_path = workdir.path().join(NARRATION_FILE);

        let (audio_wav, audio) = self
            .step(StepId::Audio, async {
                let buffer = self
                    .synthesizer
                    .synthesize(
                        request.script.text(),
                        request.voice,
                        self.config.synthesizer.device,
                        self.tracker.reporter(StepId::Audio),
                    )
                    .await?;
                let wav = encode_buffer(&buffer);
                tokio::fs::write(&narration_path, &wav).await?;
                info!("Narration: {:.2}s, {} bytes of WAV", buffer.duration_seconds(), wav.len());

                let handle = AudioHandle {
                    path: narration_path.clone(),
                    duration_seconds: buffer.duration_seconds(),
                };
                Ok::<_, ReelError>((wav, handle))
            })
            .await?;

        let (chunks, tracks) = self
            .step(StepId::Subtitles, async {
                let chunks = self
                    .transcriber
                    .transcribe(
                        &audio,
                        TranscribeOptions::from_config(&self.config.transcriber),
                        self.tracker.reporter(StepId::Subtitles),
                    )
                    .await?;
                if chunks.is_empty() {
                    warn!("Transcriber returned no chunks; subtitle tracks will be empty");
                }
                let tracks = build_tracks(&chunks, &request.style, request.video_size);
                Ok::<_, ReelError>((chunks, tracks))
            })
            .await?;

        let final_video = match &request.background_video {
            Some(video) => {
                if *self.cancel.borrow() {
                    return Err(ReelError::Cancelled);
                }
                let composite = self
                    .step(StepId::Processing, async {
                        let session = session.insert(self.compositor.load().await?);
                        session.on_progress(self.tracker.reporter(StepId::Processing));
                        session.stage_file(BACKGROUND_VIDEO, video).await?;
                        session.stage_file(NARRATION_AUDIO, &audio_wav).await?;
                        session.stage_file(BURN_IN_SUBTITLES, tracks.burn_in.as_bytes()).await?;
                        let with_fonts = self.stage_font(&mut **session).await?;

                        let args = composite_command(&self.config.media, with_fonts).into_args();
                        let mut cancelled = self.cancel.subscribe();
                        tokio::select! {
                            result = session.run(&args, OUTPUT_VIDEO) => result,
                            _ = cancelled.wait_for(|cancel| *cancel) => {
                                warn!("Composite interrupted");
                                Err(ReelError::Cancelled)
                            }
                        }
                    })
                    .await?;
                Some(composite)
            }
            None => {
                info!("No background video; skipping compositing");
                None
            }
        };

        self.step(StepId::Finalizing, async {
            tokio::time::sleep(Duration::from_millis(self.config.pipeline.finalize_settle_ms)).await;
            Ok::<_, ReelError>(())
        })
        .await?;

        Ok(GeneratedArtifacts {
            run_id,
            created_at: Utc::now(),
            video_size: request.video_size,
            audio_wav,
            audio_duration_seconds: audio.duration_seconds,
            chunks,
            tracks,
            final_video,
        })
    }

    /// Run one step, recording its start and its outcome.
    async fn step<T>(&self, id: StepId, work: impl Future<Output = Result<T>>) -> Result<T> {
        info!("Step {}: {}", id, id.name());
        self.tracker.start(id);
        match work.await {
            Ok(value) => {
                self.tracker.complete(id);
                Ok(value)
            }
            Err(e) => {
                self.tracker.fail(id);
                error!("Step {} failed: {}", id, e);
                Err(e)
            }
        }
    }

    /// Stage the configured font, if any; returns whether one was staged.
    async fn stage_font(&self, session: &mut dyn CompositorSession) -> Result<bool> {
        let Some(dir) = &self.config.media.fonts_dir else {
            return Ok(false);
        };
        let Some(font) = find_font(dir) else {
            return Ok(false);
        };
        let name = font
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ReelError::InvalidInput(format!("Unusable font file name: {}", font.display())))?;

        let bytes = tokio::fs::read(&font).await?;
        session.stage_file(&format!("{}/{}", FONTS_DIR, name), &bytes).await?;
        info!("Staged font {}", name);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AudioBuffer, SubtitleChunk};
    use crate::progress::{ProgressFn, StepStatus};
    use crate::synthesize::MockSpeechSynthesizer;
    use crate::transcribe::MockTranscriber;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio_test::assert_ok;

    #[derive(Default)]
    struct FakeState {
        loads: usize,
        staged: Vec<String>,
        args: Vec<String>,
        terminations: usize,
    }

    #[derive(Clone, Copy, PartialEq)]
    enum RunBehavior {
        Succeed,
        Fail,
        Hang,
    }

    struct FakeCompositor {
        state: Arc<StdMutex<FakeState>>,
        behavior: RunBehavior,
    }

    struct FakeSession {
        state: Arc<StdMutex<FakeState>>,
        behavior: RunBehavior,
        progress: Option<ProgressFn>,
    }

    #[async_trait]
    impl Compositor for FakeCompositor {
        async fn load(&self) -> Result<Box<dyn CompositorSession>> {
            self.state.lock().unwrap().loads += 1;
            Ok(Box::new(FakeSession {
                state: self.state.clone(),
                behavior: self.behavior,
                progress: None,
            }))
        }

        async fn check_availability(&self) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl CompositorSession for FakeSession {
        async fn stage_file(&mut self, virtual_path: &str, _bytes: &[u8]) -> Result<()> {
            self.state.lock().unwrap().staged.push(virtual_path.to_string());
            Ok(())
        }

        fn on_progress(&mut self, callback: ProgressFn) {
            self.progress = Some(callback);
        }

        async fn run(&mut self, args: &[String], _output: &str) -> Result<Vec<u8>> {
            self.state.lock().unwrap().args = args.to_vec();
            if let Some(progress) = &self.progress {
                progress(0.5);
            }
            match self.behavior {
                RunBehavior::Succeed => Ok(b"mp4".to_vec()),
                RunBehavior::Fail => Err(ReelError::Media("encoder crashed".to_string())),
                RunBehavior::Hang => std::future::pending().await,
            }
        }

        async fn terminate(&mut self) -> Result<()> {
            self.state.lock().unwrap().terminations += 1;
            Ok(())
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.pipeline.finalize_settle_ms = 0;
        config
    }

    fn word_chunks() -> Vec<SubtitleChunk> {
        vec![
            SubtitleChunk::new(" Hello", 0.0, 0.4),
            SubtitleChunk::new(" world,", 0.4, 0.9),
            SubtitleChunk::new(" this", 1.0, 1.2),
            SubtitleChunk::new(" is", 1.2, 1.3),
            SubtitleChunk::new(" a", 1.3, 1.4),
            SubtitleChunk::new(" test.", 1.4, 2.0),
        ]
    }

    fn synthesizer() -> MockSpeechSynthesizer {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().returning(|_, _, _, progress| {
            progress(1.0);
            AudioBuffer::new(vec![0.0; 32000], 16000)
        });
        synthesizer
    }

    fn transcriber(chunks: Vec<SubtitleChunk>) -> MockTranscriber {
        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().returning(move |audio, options, _| {
            assert!(audio.path.exists());
            assert_eq!(audio.duration_seconds, 2.0);
            assert_eq!(options.max_chunk_seconds, 30.0);
            Ok(chunks.clone())
        });
        transcriber
    }

    fn workflow(
        transcriber: MockTranscriber,
        behavior: RunBehavior,
    ) -> (Workflow, Arc<StdMutex<FakeState>>) {
        let state = Arc::new(StdMutex::new(FakeState::default()));
        let compositor = FakeCompositor { state: state.clone(), behavior };
        let workflow = Workflow::with_adapters(
            test_config(),
            Box::new(synthesizer()),
            Box::new(transcriber),
            Box::new(compositor),
        );
        (workflow, state)
    }

    fn request(background_video: Option<Vec<u8>>) -> GenerationRequest {
        GenerationRequest {
            script: Script::new("Hello world, this is a test.").unwrap(),
            voice: Voice::AfHeart,
            style: SubtitleStyle::default(),
            video_size: VideoSize::default(),
            background_video,
        }
    }

    fn statuses(workflow: &Workflow) -> Vec<StepStatus> {
        workflow.steps().iter().map(|s| s.status).collect()
    }

    #[tokio::test]
    async fn test_without_background_only_audio_is_produced() {
        let (workflow, state) = workflow(transcriber(word_chunks()), RunBehavior::Succeed);
        let artifacts = assert_ok!(workflow.generate(request(None)).await);

        assert_eq!(
            statuses(&workflow),
            vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Pending, StepStatus::Completed]
        );
        assert!(artifacts.final_video.is_none());
        assert_eq!(artifacts.primary_download().file_name, "generated-reel-audio.wav");
        assert_eq!(artifacts.audio_wav.len(), 44 + 2 * 32000);
        assert_eq!(state.lock().unwrap().loads, 0);
    }

    #[tokio::test]
    async fn test_with_background_all_steps_complete() {
        let (workflow, state) = workflow(transcriber(word_chunks()), RunBehavior::Succeed);
        let artifacts = assert_ok!(workflow.generate(request(Some(b"background".to_vec()))).await);

        assert!(statuses(&workflow).iter().all(|s| *s == StepStatus::Completed));
        assert_eq!(artifacts.final_video.as_deref(), Some(&b"mp4"[..]));
        assert_eq!(artifacts.primary_download().file_name, "generated-reel.mp4");
        assert_eq!(artifacts.tracks.dialogue_count(), artifacts.chunks.len());

        let state = state.lock().unwrap();
        assert_eq!(state.staged, vec!["input.mp4", "audio.wav", "subtitles.ass"]);
        assert!(state.args.contains(&"-shortest".to_string()));
        assert_eq!(state.terminations, 1);
    }

    #[tokio::test]
    async fn test_transcriber_failure_stops_the_run() {
        let mut failing = MockTranscriber::new();
        failing
            .expect_transcribe()
            .returning(|_, _, _| Err(ReelError::Transcription("model crashed".to_string())));
        let (workflow, state) = workflow(failing, RunBehavior::Succeed);

        let err = workflow.generate(request(Some(b"background".to_vec()))).await.unwrap_err();
        assert!(matches!(err, ReelError::Transcription(_)));
        assert_eq!(
            statuses(&workflow),
            vec![StepStatus::Completed, StepStatus::Error, StepStatus::Pending, StepStatus::Pending]
        );
        let state = state.lock().unwrap();
        assert_eq!(state.loads, 0);
        assert_eq!(state.terminations, 0);
    }

    #[tokio::test]
    async fn test_compositor_failure_still_terminates_once() {
        let (workflow, state) = workflow(transcriber(word_chunks()), RunBehavior::Fail);

        let err = workflow.generate(request(Some(b"background".to_vec()))).await.unwrap_err();
        assert!(matches!(err, ReelError::Media(_)));
        assert_eq!(workflow.steps()[2].status, StepStatus::Error);
        assert_eq!(workflow.steps()[2].progress, 50.0);
        assert_eq!(workflow.steps()[3].status, StepStatus::Pending);
        assert_eq!(state.lock().unwrap().terminations, 1);
    }

    #[tokio::test]
    async fn test_empty_transcription_is_a_degenerate_success() {
        let (workflow, _) = workflow(transcriber(Vec::new()), RunBehavior::Succeed);
        let artifacts = assert_ok!(workflow.generate(request(None)).await);
        assert_eq!(artifacts.tracks.cue_count(), 0);
        assert!(artifacts.tracks.preview.starts_with("WEBVTT"));
    }

    #[tokio::test]
    async fn test_cancel_before_processing_never_loads_compositor() {
        // The transcriber requests cancellation while the subtitles step is still running
        let handle: Arc<std::sync::OnceLock<std::sync::Weak<Workflow>>> = Arc::default();
        let mut cancelling = MockTranscriber::new();
        {
            let handle = handle.clone();
            cancelling.expect_transcribe().returning(move |_, _, _| {
                if let Some(workflow) = handle.get().and_then(std::sync::Weak::upgrade) {
                    workflow.cancel();
                }
                Ok(word_chunks())
            });
        }
        let (workflow, state) = workflow(cancelling, RunBehavior::Succeed);
        let workflow = Arc::new(workflow);
        handle.set(Arc::downgrade(&workflow)).unwrap();

        let result = workflow.generate(request(Some(b"background".to_vec()))).await;
        assert!(matches!(result, Err(ReelError::Cancelled)));
        assert_eq!(
            statuses(&workflow),
            vec![StepStatus::Completed, StepStatus::Completed, StepStatus::Pending, StepStatus::Pending]
        );
        let state = state.lock().unwrap();
        assert_eq!(state.loads, 0);
        assert_eq!(state.terminations, 0);
    }

    #[tokio::test]
    async fn test_concurrent_run_is_rejected_and_cancel_kills_composite() {
        let (workflow, state) = workflow(transcriber(word_chunks()), RunBehavior::Hang);
        let workflow = Arc::new(workflow);
        let mut steps = workflow.subscribe();

        let running = {
            let workflow = workflow.clone();
            tokio::spawn(async move { workflow.generate(request(Some(b"background".to_vec()))).await })
        };

        steps
            .wait_for(|steps| steps[2].status == StepStatus::Processing && steps[2].progress == 50.0)
            .await
            .unwrap();

        let second = workflow.generate(request(None)).await;
        assert!(matches!(second, Err(ReelError::Busy)));

        workflow.cancel();
        let first = running.await.unwrap();
        assert!(matches!(first, Err(ReelError::Cancelled)));
        assert_eq!(workflow.steps()[2].status, StepStatus::Error);
        assert_eq!(state.lock().unwrap().terminations, 1);

        // The lock is released once the run ends
        assert!(workflow.generate(request(None)).await.is_ok());
    }
}

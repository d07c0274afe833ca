use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Instant,
};

use futures::{StreamExt, TryStreamExt, stream};

use crate::{
    audio::{self, Audio, AudioFormat, MAX_DURATION_SECONDS, Placement, Span},
    error::{Result, TtsError},
    provider::{SpeechEngine, SynthesizerOptions},
    script::{Script, chunk_text},
    types::{AudioResult, AudioSegment},
};

/// Relative overshoot of the target duration tolerated without a re-take
const FIT_TOLERANCE: f64 = 0.05;

/// Script-to-file steps shared by every provider
#[derive(Debug)]
pub(crate) struct Pipeline {
    output_dir: PathBuf,
    max_concurrent_requests: usize,
}

impl Pipeline {
    /// Create the output directory and capture the shared options
    pub(crate) fn new(options: &SynthesizerOptions) -> Result<Self> {
        if options.max_concurrent_requests == 0 {
            return Err(TtsError::Configuration(
                "max_concurrent_requests must be greater than 0".to_string(),
            ));
        }

        std::fs::create_dir_all(&options.output_dir).map_err(|e| TtsError::storage(&options.output_dir, e))?;

        Ok(Self {
            output_dir: options.output_dir.clone(),
            max_concurrent_requests: options.max_concurrent_requests,
        })
    }

    pub(crate) fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub(crate) async fn run<E>(&self, engine: &E, script_path: &Path, target_duration: Option<f64>) -> Result<AudioResult>
    where
        E: SpeechEngine,
    {
        let started = Instant::now();
        let provider = engine.provider();

        if let Some(target) = target_duration
            && !(target.is_finite() && target > 0.0 && target <= MAX_DURATION_SECONDS)
        {
            return Err(TtsError::Configuration(format!(
                "target duration must be between 0 and {MAX_DURATION_SECONDS} seconds, got {target}"
            )));
        }

        let script = read_script(script_path).await?;

        if let Some(cue) = script
            .cues
            .iter()
            .find(|cue| cue.timing.is_some_and(|t| t.start > MAX_DURATION_SECONDS))
        {
            return Err(TtsError::InvalidScript(format!(
                "cue {} starts more than {MAX_DURATION_SECONDS} seconds in",
                cue.sequence
            )));
        }

        tracing::info!(
            provider,
            cues = script.cues.len(),
            timed = script.is_timed(),
            "starting synthesis for {}",
            script_path.display()
        );

        let mut speed = engine.base_speed();
        let (mut track, mut spans) = self.render(engine, &script, speed).await?;

        if let Some(target) = target_duration {
            let natural = track.duration();

            if natural > target * (1.0 + FIT_TOLERANCE)
                && let Some(range) = engine.speed_range()
            {
                let adjusted = (speed * natural / target).clamp(*range.start(), *range.end());

                if adjusted > speed {
                    tracing::info!(provider, natural, target, speed = adjusted, "re-synthesizing faster to fit target");
                    speed = adjusted;
                    (track, spans) = self.render(engine, &script, speed).await?;
                }
            }

            let shortfall = target - track.duration();
            if shortfall > 0.0 {
                tracing::debug!("padding {shortfall:.2}s of silence to reach target");
                track.append_silence(shortfall);
            } else if track.duration() > target * (1.0 + FIT_TOLERANCE) {
                tracing::warn!(
                    provider,
                    actual = track.duration(),
                    target,
                    "audio is longer than the target duration"
                );
            }
        }

        let duration_seconds = track.duration();
        let audio_path = self.output_path(script_path, track.format());
        let bytes = track.into_bytes()?;

        write_atomically(&audio_path, &bytes).await?;

        let segments = script
            .cues
            .iter()
            .zip(spans)
            .map(|(cue, span)| AudioSegment {
                sequence: cue.sequence,
                text: cue.text.clone(),
                start_seconds: span.start,
                end_seconds: span.end,
                duration_seconds: span.end - span.start,
            })
            .collect();

        let generation_time = started.elapsed();

        tracing::info!(
            provider,
            duration_seconds,
            bytes = bytes.len(),
            "synthesis completed in {:.2}s: {}",
            generation_time.as_secs_f64(),
            audio_path.display()
        );

        Ok(AudioResult {
            audio_path,
            duration_seconds,
            provider_metadata: engine.metadata(speed),
            segments,
            file_size_bytes: bytes.len() as u64,
            generation_time,
            model: engine.model().to_string(),
        })
    }

    /// Synthesize every cue and lay the clips out on one track
    async fn render<E>(&self, engine: &E, script: &Script, speed: f64) -> Result<(Audio, Vec<Span>)>
    where
        E: SpeechEngine,
    {
        let format = engine.format();
        let chunked: Vec<Vec<String>> = script
            .cues
            .iter()
            .map(|cue| chunk_text(&cue.text, engine.max_input_chars()))
            .collect();

        let requests: Vec<_> = chunked
            .iter()
            .flatten()
            .map(|text| synthesize_chunk(engine, format, text, speed))
            .collect();

        let clips: Vec<Audio> = stream::iter(requests)
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let mut clips = clips.into_iter();
        let mut placements = Vec::with_capacity(script.cues.len());

        for (cue, chunks) in script.cues.iter().zip(&chunked) {
            let mut pieces = clips.by_ref().take(chunks.len());
            let Some(mut audio) = pieces.next() else {
                return Err(TtsError::InvalidAudio(format!("no audio produced for cue {}", cue.sequence)));
            };

            for piece in pieces {
                audio.append(piece)?;
            }

            placements.push(Placement {
                start: cue.timing.map(|t| t.start),
                audio,
            });
        }

        audio::assemble(placements)
    }

    fn output_path(&self, script_path: &Path, format: AudioFormat) -> PathBuf {
        let stem = script_path
            .file_stem()
            .map_or_else(|| "script".into(), |s| s.to_string_lossy());
        let timestamp = jiff::Zoned::now().strftime("%Y%m%d_%H%M%S");

        self.output_dir
            .join(format!("{stem}_audio_{timestamp}.{}", format.extension()))
    }
}

async fn synthesize_chunk<E>(engine: &E, format: AudioFormat, text: &str, speed: f64) -> Result<Audio>
where
    E: SpeechEngine,
{
    tracing::debug!(
        provider = engine.provider(),
        chars = text.chars().count(),
        "synthesizing chunk: {}",
        text.chars().take(50).collect::<String>()
    );

    let bytes = engine.speak(text, speed).await?;
    Audio::decode(format, &bytes)
}

/// Write `bytes` under a temporary name and rename it into place
///
/// A failed write leaves nothing at `path`.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = match tokio::fs::write(&partial, bytes).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(TtsError::storage(path, e));
    }

    Ok(())
}

async fn read_script(path: &Path) -> Result<Script> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => TtsError::NotFound(path.to_path_buf()),
        _ => TtsError::InvalidScript(format!("cannot read {}: {e}", path.display())),
    })?;

    Script::parse(&content)
}

#[cfg(test)]
mod tests {
    use std::{
        ops::RangeInclusive,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use indoc::indoc;

    use super::*;
    use crate::{
        audio::silent_mp3,
        types::{MetadataValue, ProviderMetadata},
    };

    const FRAME: f64 = 1152.0 / 44_100.0;

    /// Speaks 50 ms per character, scaled by speed
    struct FakeEngine {
        requests: AtomicUsize,
        speed_range: Option<RangeInclusive<f64>>,
        fail_with: Option<u16>,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                requests: AtomicUsize::new(0),
                speed_range: Some(0.25..=4.0),
                fail_with: None,
            }
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeechEngine for FakeEngine {
        fn provider(&self) -> &'static str {
            "fake"
        }

        fn format(&self) -> AudioFormat {
            AudioFormat::Mp3
        }

        fn max_input_chars(&self) -> usize {
            20
        }

        fn model(&self) -> &str {
            "fake-1"
        }

        fn base_speed(&self) -> f64 {
            1.0
        }

        fn speed_range(&self) -> Option<RangeInclusive<f64>> {
            self.speed_range.clone()
        }

        fn metadata(&self, speed: f64) -> ProviderMetadata {
            ProviderMetadata::from([("speed".to_string(), speed.into())])
        }

        async fn speak(&self, text: &str, speed: f64) -> Result<Vec<u8>> {
            self.requests.fetch_add(1, Ordering::SeqCst);

            if let Some(status) = self.fail_with {
                return Err(TtsError::ProviderApi {
                    provider: "fake",
                    status: Some(status),
                    message: "slow down".to_string(),
                });
            }

            #[allow(clippy::cast_precision_loss)]
            let seconds = text.chars().count() as f64 * 0.05 / speed;
            Ok(silent_mp3(seconds))
        }
    }

    fn setup(script: &str) -> (tempfile::TempDir, PathBuf, Pipeline) {
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("lesson.srt");
        std::fs::write(&script_path, script).unwrap();
        let pipeline = Pipeline::new(&SynthesizerOptions::new(dir.path().join("out"))).unwrap();
        (dir, script_path, pipeline)
    }

    fn speed_of(result: &AudioResult) -> f64 {
        match result.provider_metadata["speed"] {
            MetadataValue::Number(speed) => speed,
            ref other => panic!("unexpected speed value {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_is_spoken_back_to_back() {
        let (_dir, script, pipeline) = setup("Hello there.\nSecond line.\n");
        let engine = FakeEngine::new();

        let result = pipeline.run(&engine, &script, None).await.unwrap();

        assert_eq!(engine.requests(), 2);
        assert_eq!(result.segments.len(), 2);
        assert!((result.segments[1].start_seconds - result.segments[0].end_seconds).abs() < f64::EPSILON);
        assert!((result.duration_seconds - 1.2).abs() < 2.0 * FRAME);
        assert_eq!(result.model, "fake-1");

        let name = result.audio_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("lesson_audio_"), "{name}");
        assert!(name.ends_with(".mp3"), "{name}");
        assert!(result.audio_path.starts_with(pipeline.output_dir()));
        assert_eq!(std::fs::metadata(&result.audio_path).unwrap().len(), result.file_size_bytes);
        assert_eq!(std::fs::read_dir(pipeline.output_dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn timed_cues_start_at_their_timestamps() {
        let (_dir, script, pipeline) = setup(indoc! {"
            1
            00:00:00,000 --> 00:00:01,000
            Hi.

            2
            00:00:03,000 --> 00:00:04,000
            Bye.
        "});
        let engine = FakeEngine::new();

        let result = pipeline.run(&engine, &script, None).await.unwrap();

        assert_eq!(result.segments[1].sequence, 2);
        assert!((result.segments[1].start_seconds - 3.0).abs() < FRAME);
    }

    #[tokio::test]
    async fn long_cues_are_chunked_and_rejoined() {
        let (_dir, script, pipeline) = setup("One two three. Four five six.\n");
        let engine = FakeEngine::new();

        let result = pipeline.run(&engine, &script, None).await.unwrap();

        assert_eq!(engine.requests(), 2);
        assert_eq!(result.segments.len(), 1);
    }

    #[tokio::test]
    async fn short_audio_is_padded_to_target() {
        let (_dir, script, pipeline) = setup("Hello there.\n");
        let engine = FakeEngine::new();

        let result = pipeline.run(&engine, &script, Some(5.0)).await.unwrap();

        assert!((result.duration_seconds - 5.0).abs() < FRAME);
        assert_eq!(engine.requests(), 1);
    }

    #[tokio::test]
    async fn long_audio_is_resynthesized_faster() {
        let (_dir, script, pipeline) = setup("Twenty characters!!\nTwenty characters!!\n");
        let engine = FakeEngine::new();

        let result = pipeline.run(&engine, &script, Some(1.0)).await.unwrap();

        assert_eq!(engine.requests(), 4);
        assert!(speed_of(&result) > 1.8);
        assert!((result.duration_seconds - 1.0).abs() < 0.1);
    }

    #[tokio::test]
    async fn without_speed_control_long_audio_is_kept() {
        let (_dir, script, pipeline) = setup("Twenty characters!!\nTwenty characters!!\n");
        let engine = FakeEngine {
            speed_range: None,
            ..FakeEngine::new()
        };

        let result = pipeline.run(&engine, &script, Some(1.0)).await.unwrap();

        assert_eq!(engine.requests(), 2);
        assert!(result.duration_seconds > 1.5);
    }

    #[tokio::test]
    async fn invalid_target_fails_before_any_request() {
        let (_dir, script, pipeline) = setup("Hello there.\n");
        let engine = FakeEngine::new();

        for target in [0.0, -3.0, f64::NAN, f64::INFINITY, 1e300] {
            let err = pipeline.run(&engine, &script, Some(target)).await.unwrap_err();
            assert!(matches!(err, TtsError::Configuration(_)));
        }

        assert_eq!(engine.requests(), 0);
    }

    #[tokio::test]
    async fn missing_script_is_not_found() {
        let (dir, _script, pipeline) = setup("Hello there.\n");
        let engine = FakeEngine::new();
        let missing = dir.path().join("missing.srt");

        let err = pipeline.run(&engine, &missing, None).await.unwrap_err();

        assert!(matches!(err, TtsError::NotFound(ref path) if *path == missing));
        assert_eq!(engine.requests(), 0);
    }

    #[tokio::test]
    async fn vendor_failure_writes_nothing() {
        let (_dir, script, pipeline) = setup("Hello there.\nSecond line.\n");
        let engine = FakeEngine {
            fail_with: Some(429),
            ..FakeEngine::new()
        };

        let err = pipeline.run(&engine, &script, None).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(std::fs::read_dir(pipeline.output_dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cue_starting_past_a_day_is_rejected() {
        let (_dir, script, pipeline) = setup(indoc! {"
            1
            00:00:00,000 --> 00:00:01,000
            Hi.

            2
            90:00:00,000 --> 90:00:01,000
            Much later.
        "});
        let engine = FakeEngine::new();

        let err = pipeline.run(&engine, &script, None).await.unwrap_err();

        assert!(matches!(err, TtsError::InvalidScript(_)));
        assert_eq!(engine.requests(), 0);
    }

    #[tokio::test]
    async fn unwritable_output_is_a_storage_error_and_leaves_nothing() {
        let (dir, script, pipeline) = setup("Hello there.\n");
        let engine = FakeEngine::new();
        std::fs::remove_dir(pipeline.output_dir()).unwrap();
        std::fs::write(dir.path().join("out"), b"not a directory").unwrap();

        let err = pipeline.run(&engine, &script, None).await.unwrap_err();

        assert!(matches!(err, TtsError::Storage { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn run_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let (_dir, script, pipeline) = setup("Hello there.\n");
        let engine = FakeEngine::new();

        assert_send(&pipeline.run(&engine, &script, None));
    }

    #[test]
    fn uncreatable_output_dir_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = Pipeline::new(&SynthesizerOptions::new(blocker.join("audio"))).unwrap_err();

        assert!(matches!(err, TtsError::Storage { .. }));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let options = SynthesizerOptions::new(dir.path()).with_max_concurrent_requests(0);

        assert!(matches!(Pipeline::new(&options), Err(TtsError::Configuration(_))));
    }
}

use std::path::PathBuf;

use clap::Parser;

/// Turn a subtitle script into one narration audio file
#[derive(Debug, Parser)]
#[command(name = "narrate", about = "Synthesize narration audio from a subtitle script")]
pub struct Args {
    /// Path to configuration file; `narrate.toml` is used when present
    #[arg(short, long, env = "NARRATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the TTS provider (`elevenlabs` or `openai`)
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Override the directory receiving audio files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Aim for this many seconds of audio
    #[arg(short, long, value_name = "SECS")]
    pub target_duration: Option<f64>,

    /// Subtitle-style script to synthesize
    pub script: PathBuf,
}

//! Shared helpers for the end-to-end synthesis tests
#![allow(dead_code)]

pub mod config;
pub mod mock_tts;

use std::path::{Path, PathBuf};

/// Three timed cues with gaps between them
pub const THREE_CUE_SRT: &str = "\
1
00:00:00,000 --> 00:00:02,000
Welcome to the course.

2
00:00:02,500 --> 00:00:05,000
Today we cover ownership.

3
00:00:05,500 --> 00:00:08,000
Let's get started.
";

/// Write `content` to `dir/name` and return the path
pub fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write script");
    path
}

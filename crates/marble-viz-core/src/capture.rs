//! Frame capture bookkeeping.
//!
//! The presenter writes the pixels; this only hands out numbered frame paths
//! inside a capture directory and remembers what was written.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const DEFAULT_CAPTURE_FPS: u32 = 60;

#[derive(Clone, Debug, PartialEq)]
pub struct CaptureSummary {
    pub dir: PathBuf,
    pub frames: usize,
    /// Playback length of the sequence at the capture fps
    pub duration_secs: f32,
}

#[derive(Debug)]
pub struct CaptureSession {
    dir: PathBuf,
    fps: u32,
    frame_limit: Option<usize>,
    frames: Vec<PathBuf>,
    active: bool,
}

impl CaptureSession {
    /// Create `dir/frames` and start handing out frame paths.
    /// `max_seconds` bounds the capture length.
    pub fn start(dir: impl AsRef<Path>, fps: u32, max_seconds: Option<f32>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(dir.join("frames"))?;

        let fps = fps.max(1);
        let frame_limit = max_seconds.map(|s| (s.max(0.0) * fps as f32).ceil() as usize);

        tracing::info!(dir = %dir.display(), fps, ?frame_limit, "capture started");
        Ok(Self {
            dir,
            fps,
            frame_limit,
            frames: Vec::new(),
            active: true,
        })
    }

    /// Path for the next frame, or `None` once stopped or the limit is hit
    pub fn next_frame_path(&mut self) -> Option<PathBuf> {
        if !self.active || self.is_finished() {
            return None;
        }
        let path = self
            .dir
            .join("frames")
            .join(format!("frame_{:06}.png", self.frames.len()));
        self.frames.push(path.clone());
        Some(path)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_finished(&self) -> bool {
        self.frame_limit
            .is_some_and(|limit| self.frames.len() >= limit)
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Simulation step that keeps output cadence at the capture fps
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.fps as f32
    }

    pub fn audio_path(&self) -> PathBuf {
        self.dir.join("audio.wav")
    }

    /// Frame paths handed out so far, in order
    pub fn chunks(&self) -> &[PathBuf] {
        &self.frames
    }

    pub fn stop(&mut self) -> CaptureSummary {
        if self.active {
            tracing::info!(frames = self.frames.len(), "capture stopped");
        }
        self.active = false;
        CaptureSummary {
            dir: self.dir.clone(),
            frames: self.frames.len(),
            duration_secs: self.frames.len() as f32 / self.fps as f32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("marble-viz-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_frame_limit_and_summary() {
        let dir = temp_dir("limit");
        let mut capture = CaptureSession::start(&dir, 30, Some(0.1)).unwrap();
        assert!(dir.join("frames").is_dir());

        let mut paths = Vec::new();
        while let Some(p) = capture.next_frame_path() {
            paths.push(p);
        }
        assert_eq!(paths.len(), 3);
        assert!(capture.is_finished());
        assert!(paths[0].ends_with("frames/frame_000000.png"));
        assert_eq!(capture.chunks(), paths.as_slice());

        let summary = capture.stop();
        assert_eq!(summary.frames, 3);
        assert!((summary.duration_secs - 0.1).abs() < 1e-6);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_no_frames_after_stop() {
        let dir = temp_dir("stop");
        let mut capture = CaptureSession::start(&dir, 60, None).unwrap();
        assert!(capture.next_frame_path().is_some());
        capture.stop();
        assert!(capture.next_frame_path().is_none());
        assert!(!capture.is_active());
        assert_eq!(capture.chunks().len(), 1);

        fs::remove_dir_all(&dir).ok();
    }
}

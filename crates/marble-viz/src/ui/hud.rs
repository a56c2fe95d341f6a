//! Status line and transient notifications.

use nannou::prelude::*;

const NOTIFICATION_FRAMES: u32 = 180; // ~3 seconds at 60fps

/// What the status line shows this frame
pub struct HudStatus {
    pub track: Option<String>,
    pub current_time: f32,
    pub duration: f32,
    pub playing: bool,
    pub marbles: usize,
    pub synth_volume: f32,
    pub auto_spawn: bool,
    pub recording: bool,
}

impl HudStatus {
    pub fn line(&self) -> String {
        let transport = if self.playing { ">" } else { "||" };
        let track = self.track.as_deref().unwrap_or("no track");
        let mut line = format!(
            "{} {}  {} / {}   marbles {}   notes {:.0}%{}",
            transport,
            track,
            format_time(self.current_time),
            format_time(self.duration),
            self.marbles,
            self.synth_volume * 100.0,
            if self.auto_spawn { "   auto" } else { "" },
        );
        if self.recording {
            line.push_str("   REC");
        }
        line
    }
}

/// `m:ss`
pub fn format_time(seconds: f32) -> String {
    let total = seconds.max(0.0) as u32;
    format!("{}:{:02}", total / 60, total % 60)
}

#[derive(Default)]
pub struct Hud {
    notification_text: Option<String>,
    notification_frames: u32,
}

impl Hud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a notification message for 3 seconds
    pub fn show_notification(&mut self, text: impl Into<String>) {
        self.notification_text = Some(text.into());
        self.notification_frames = NOTIFICATION_FRAMES;
    }

    /// Age the notification by one frame
    pub fn tick(&mut self) {
        if self.notification_frames > 0 {
            self.notification_frames -= 1;
            if self.notification_frames == 0 {
                self.notification_text = None;
            }
        }
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification_text.as_deref()
    }

    pub fn draw(&self, draw: &Draw, bounds: Rect, status: &HudStatus) {
        draw.text(&status.line())
            .x_y(0.0, bounds.bottom() + 20.0)
            .w(bounds.w() - 40.0)
            .left_justify()
            .color(rgba(1.0, 1.0, 1.0, 0.6))
            .font_size(14);

        if let Some(ref text) = self.notification_text {
            let alpha = (self.notification_frames as f32 / NOTIFICATION_FRAMES as f32).min(1.0);
            draw.text(text)
                .x_y(0.0, bounds.top() - 30.0)
                .color(rgba(1.0, 1.0, 1.0, alpha))
                .font_size(24);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn test_notification_expires() {
        let mut hud = Hud::new();
        hud.show_notification("Wave on");
        for _ in 0..NOTIFICATION_FRAMES - 1 {
            hud.tick();
        }
        assert_eq!(hud.notification(), Some("Wave on"));
        hud.tick();
        assert!(hud.notification().is_none());
    }

    #[test]
    fn test_status_line() {
        let status = HudStatus {
            track: Some("song.mp3".into()),
            current_time: 61.0,
            duration: 180.0,
            playing: true,
            marbles: 7,
            synth_volume: 0.5,
            auto_spawn: false,
            recording: true,
        };
        assert_eq!(
            status.line(),
            "> song.mp3  1:01 / 3:00   marbles 7   notes 50%   REC"
        );
    }
}

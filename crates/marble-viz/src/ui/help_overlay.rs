//! Help overlay showing keyboard shortcuts.

use nannou::prelude::*;

const SHORTCUTS: &[(&str, &str)] = &[
    ("h", "Toggle this help"),
    ("q", "Quit"),
    ("", ""),
    ("--- Playback ---", ""),
    ("Space", "Play / pause"),
    ("s", "Stop"),
    ("+ / -", "Marble note volume"),
    ("r", "Start / stop recording"),
    ("", ""),
    ("--- Marbles ---", ""),
    ("m", "Drop a marble"),
    ("c", "Clear marbles"),
    ("a", "Toggle spawning from the bass"),
    ("", ""),
    ("--- Effects ---", ""),
    ("1", "Wave"),
    ("2", "Particles"),
    ("3", "Geometric"),
    ("4", "Fluid"),
    ("5", "Neural"),
    ("0", "Marble xylophone"),
];

/// Manages help overlay visibility
pub struct HelpOverlay {
    pub visible: bool,
}

impl HelpOverlay {
    pub fn new() -> Self {
        Self { visible: false }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn draw(&self, draw: &Draw, _bounds: Rect) {
        if !self.visible {
            return;
        }

        let padding = 25.0;
        let line_height = 24.0;
        let font_size = 18;

        let overlay_height = line_height * (SHORTCUTS.len() as f32) + padding * 2.0;
        let overlay_width = 520.0;
        let key_col_width = 120.0;
        let desc_width = overlay_width - key_col_width - padding * 2.0 - 15.0;

        draw.rect()
            .x_y(0.0, 0.0)
            .w_h(overlay_width, overlay_height)
            .color(rgba(0.0, 0.0, 0.0, 0.9));

        draw.rect()
            .x_y(0.0, 0.0)
            .w_h(overlay_width, overlay_height)
            .stroke(rgba(1.0, 1.0, 1.0, 0.3))
            .stroke_weight(1.0)
            .no_fill();

        let start_y = overlay_height / 2.0 - padding - line_height / 2.0;
        let left_edge = -overlay_width / 2.0 + padding;

        for (i, (key, desc)) in SHORTCUTS.iter().enumerate() {
            let y = start_y - (i as f32) * line_height;

            if key.is_empty() {
                continue;
            }

            if key.starts_with("---") {
                draw.text(key)
                    .xy(pt2(0.0, y))
                    .wh(pt2(overlay_width - padding * 2.0, line_height))
                    .center_justify()
                    .color(rgba(0.5, 0.8, 1.0, 0.8))
                    .font_size(font_size);
                continue;
            }

            draw.text(key)
                .xy(pt2(left_edge + key_col_width / 2.0, y))
                .wh(pt2(key_col_width, line_height))
                .right_justify()
                .color(rgb(0.3, 0.8, 1.0))
                .font_size(font_size);

            draw.text(desc)
                .xy(pt2(left_edge + key_col_width + 15.0 + desc_width / 2.0, y))
                .wh(pt2(desc_width, line_height))
                .left_justify()
                .color(rgb(1.0, 1.0, 1.0))
                .font_size(font_size);
        }
    }
}

impl Default for HelpOverlay {
    fn default() -> Self {
        Self::new()
    }
}

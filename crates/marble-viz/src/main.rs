mod cli;
mod logging;
mod render;
mod ui;
mod utils;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Parser;
use cli::Args;
use marble_viz_core::audio::PlayState;
use marble_viz_core::{
    AudioOutput, AudioSource, CaptureSession, FrameScheduler, Pacing, Session, ToneSynth,
};
use nannou::prelude::*;
use render::NannouPresenter;
use ui::bindings::{parse_key, Action};
use ui::help_overlay::HelpOverlay;
use ui::hud::{Hud, HudStatus};
use utils::Config;

/// Everything `main` resolves before nannou takes over the thread
struct Launch {
    args: Args,
    audio: AudioSource,
    track_name: Option<String>,
}

static LAUNCH: OnceLock<Launch> = OnceLock::new();

fn main() -> anyhow::Result<()> {
    logging::init();
    let args = Args::parse();

    if args.audio_info {
        utils::log_audio_info();
        return Ok(());
    }

    let audio = AudioSource::new();
    let mut track_name = None;
    if let Some(path) = &args.file {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let info = audio
            .load_bytes(bytes, args.file_extension().as_deref())
            .with_context(|| format!("failed to decode {}", path.display()))?;
        tracing::info!(
            "loaded {} ({:.1}s, {} Hz, {} ch)",
            path.display(),
            info.duration,
            info.sample_rate,
            info.channels
        );
        track_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    }

    let _ = LAUNCH.set(Launch {
        args,
        audio,
        track_name,
    });
    nannou::app(model).update(update).exit(exit).run();
    Ok(())
}

struct Model {
    scheduler: FrameScheduler,
    presenter: NannouPresenter,
    output: Option<AudioOutput>,
    config: Config,
    /// Written from `view`, which only gets `&Model`
    capture: RefCell<Option<CaptureSession>>,
    /// The scheduler stepped during the last update
    stepped: bool,
    help_overlay: HelpOverlay,
    hud: Hud,
    track_name: Option<String>,
    #[allow(dead_code)]
    screensaver_inhibitor: Option<utils::ScreensaverInhibitor>,
}

fn model(app: &App) -> Model {
    let launch = LAUNCH.get_or_init(|| Launch {
        args: Args::parse(),
        audio: AudioSource::new(),
        track_name: None,
    });
    let args = &launch.args;

    let (width, height) = (1280, 720);
    let fullscreen = !args.windowed && args.record.is_none() && !cfg!(debug_assertions);
    app.set_exit_on_escape(false);

    let mut win = app
        .new_window()
        .title("marble-viz")
        .view(view)
        .key_pressed(key_pressed)
        .resized(resized)
        .size(width, height)
        .min_size(400, 300);
    if fullscreen {
        win = win.fullscreen();
    }
    let window_id = win.build().unwrap_or_else(|e| {
        tracing::error!("failed to open window: {e:?}");
        std::process::exit(1);
    });
    let (width, height) = match app.window(window_id) {
        Some(window) => {
            if fullscreen {
                window.set_cursor_visible(false);
            }
            window.inner_size_points()
        }
        None => (width as f32, height as f32),
    };

    let config = Config::load();
    let mut settings = config.session_settings(width as u32, height as u32);
    if args.no_auto_spawn {
        settings.auto_spawn = false;
    }

    let audio = launch.audio.clone();
    audio.set_volume(args.volume.unwrap_or_else(|| config.playback_volume()));

    let output = match AudioOutput::start(&audio) {
        Ok(output) => {
            tracing::info!(device = output.device_name(), rate = output.sample_rate(), "audio output ready");
            Some(output)
        }
        Err(e) => {
            tracing::warn!("{e}, continuing without sound");
            None
        }
    };
    let synth = output
        .as_ref()
        .map(AudioOutput::synth)
        .unwrap_or_else(ToneSynth::disabled);

    let mut session = Session::new(audio.clone(), synth, &settings);
    for (kind, params) in config.effects() {
        session.add_effect(kind, params);
    }

    let mut scheduler = FrameScheduler::new(session);
    scheduler.start(app.duration.since_start);

    let screensaver_inhibitor = if !cfg!(debug_assertions) {
        utils::ScreensaverInhibitor::new()
    } else {
        None
    };

    let mut model = Model {
        scheduler,
        presenter: NannouPresenter::new(),
        output,
        config,
        capture: RefCell::new(None),
        stepped: false,
        help_overlay: HelpOverlay::new(),
        hud: Hud::new(),
        track_name: launch.track_name.clone(),
        screensaver_inhibitor,
    };

    if let Some(dir) = &args.record {
        start_recording(&mut model, dir, args.record_seconds);
    }
    if audio.is_loaded() {
        audio.play();
    } else {
        model.hud.show_notification("No track loaded. Press m to drop a marble, h for help");
    }

    model
}

fn update(_app: &App, model: &mut Model, update: Update) {
    model.hud.tick();
    model.stepped = model
        .scheduler
        .tick(update.since_start, &mut model.presenter)
        .is_some();

    let finished = model
        .capture
        .borrow()
        .as_ref()
        .is_some_and(CaptureSession::is_finished);
    if finished {
        stop_recording(model);
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    let bounds = app.window_rect();

    model.presenter.draw(&draw);
    model.hud.draw(&draw, bounds, &hud_status(model));
    model.help_overlay.draw(&draw, bounds);

    if let Err(e) = draw.to_frame(app, &frame) {
        tracing::warn!("failed to render frame: {e:?}");
        return;
    }

    // Fixed pacing skips updates on fast displays; only stepped frames are new
    if !model.stepped {
        return;
    }
    if let Some(capture) = model.capture.borrow_mut().as_mut() {
        if let Some(path) = capture.next_frame_path() {
            app.main_window().capture_frame(path);
        }
    }
}

fn hud_status(model: &Model) -> HudStatus {
    let session = model.scheduler.session();
    let audio = session.audio();
    HudStatus {
        track: model.track_name.clone(),
        current_time: audio.current_time(),
        duration: audio.duration(),
        playing: audio.state() == PlayState::Playing,
        marbles: session.marble_count(),
        synth_volume: session.synth_volume(),
        auto_spawn: session.auto_spawn(),
        recording: model.capture.borrow().is_some(),
    }
}

fn resized(_app: &App, model: &mut Model, size: Vec2) {
    model
        .scheduler
        .session_mut()
        .resize(size.x as u32, size.y as u32);
}

fn key_pressed(app: &App, model: &mut Model, key: Key) {
    let Some(action) = parse_key(key) else {
        return;
    };

    match action {
        Action::Quit => app.quit(),
        Action::ShowHelp => model.help_overlay.toggle(),
        Action::TogglePlayback => {
            let audio = model.scheduler.session().audio();
            if !audio.is_loaded() {
                model.hud.show_notification("No track loaded");
                return;
            }
            audio.toggle();
            let label = match audio.state() {
                PlayState::Playing => "Playing",
                PlayState::Paused => "Paused",
                PlayState::Stopped => "Stopped",
            };
            model.hud.show_notification(label);
        }
        Action::Stop => {
            model.scheduler.session().audio().stop();
            model.hud.show_notification("Stopped");
        }
        Action::SpawnMarble => {
            if !model.scheduler.session_mut().spawn_marble() {
                model.hud.show_notification("Marble limit reached");
            }
        }
        Action::ClearMarbles => {
            model.scheduler.session_mut().clear_marbles();
            model.hud.show_notification("Marbles cleared");
        }
        Action::ToggleAutoSpawn => {
            let session = model.scheduler.session_mut();
            let enabled = !session.auto_spawn();
            session.set_auto_spawn(enabled);
            model
                .hud
                .show_notification(format!("Auto-spawn: {}", on_off(enabled)));
        }
        Action::ToggleEffect(kind) => {
            let active = model.scheduler.session_mut().toggle_effect(kind);
            model
                .hud
                .show_notification(format!("{}: {}", kind, on_off(active)));
        }
        Action::SynthVolume(delta) => {
            let session = model.scheduler.session_mut();
            if !session.synth().is_enabled() {
                model.hud.show_notification("No audio output");
                return;
            }
            let volume = (session.synth_volume() + delta).clamp(0.0, 1.0);
            session.set_synth_volume(volume);
            model.config.set_synth_volume(volume);
            model
                .hud
                .show_notification(format!("Notes: {:.0}%", volume * 100.0));
        }
        Action::ToggleRecording => {
            if model.capture.borrow().is_some() {
                stop_recording(model);
            } else {
                let dir = LAUNCH
                    .get()
                    .and_then(|l| l.args.record.clone())
                    .unwrap_or_else(default_capture_dir);
                start_recording(model, &dir, None);
            }
        }
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

fn default_capture_dir() -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    PathBuf::from(format!("marble-viz-capture-{}", stamp))
}

/// Fixed pacing steps once per capture period of wall-clock time, so the
/// frame count follows the real-time audio mix on any display rate
fn start_recording(model: &mut Model, dir: &Path, max_seconds: Option<f32>) {
    let capture = match CaptureSession::start(dir, model.config.capture_fps(), max_seconds) {
        Ok(capture) => capture,
        Err(e) => {
            tracing::warn!("could not start capture in {}: {e}", dir.display());
            model.hud.show_notification("Recording failed");
            return;
        }
    };

    if let Some(output) = &model.output {
        if let Err(e) = output.start_recording(&capture.audio_path()) {
            tracing::warn!("recording video without audio: {e}");
        }
    }

    model
        .scheduler
        .set_pacing(Pacing::Fixed(capture.frame_dt()));
    model
        .hud
        .show_notification(format!("Recording to {}", dir.display()));
    *model.capture.borrow_mut() = Some(capture);
}

fn stop_recording(model: &mut Model) {
    let Some(mut capture) = model.capture.borrow_mut().take() else {
        return;
    };
    let summary = capture.stop();

    if let Some(output) = &model.output {
        if let Err(e) = output.stop_recording() {
            tracing::warn!("failed to finalize audio: {e}");
        }
    }

    model.scheduler.set_pacing(Pacing::Display);
    tracing::info!(
        frames = summary.frames,
        seconds = summary.duration_secs,
        "capture written to {}",
        summary.dir.display()
    );
    model.hud.show_notification(format!(
        "Saved {} frames to {}",
        summary.frames,
        summary.dir.display()
    ));
}

fn exit(_app: &App, mut model: Model) {
    stop_recording(&mut model);
    model.scheduler.stop();
    model.scheduler.session().audio().stop();
}

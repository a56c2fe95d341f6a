//! Frame-paced driver: one tick per display refresh.

use std::time::Duration;

use crate::audio::FeatureVector;
use crate::physics::Strike;
use crate::scene::Presenter;
use crate::session::{FrameClock, Session};

/// Largest step the simulation takes, in seconds
pub const MAX_DT: f32 = 0.1;
/// Fixed pacing drops owed steps once it falls this many steps behind
const MAX_FIXED_BACKLOG: u32 = 4;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Pacing {
    /// Step by measured wall-clock time between ticks
    Display,
    /// Step by a constant amount, at most once per that much wall-clock
    /// time. Ticks arriving early are skipped, so a fast display still
    /// yields one step per period (steady capture cadence).
    Fixed(f32),
}

/// What one tick did
#[derive(Clone, Debug)]
pub struct TickReport {
    pub frame: u64,
    pub dt: f32,
    pub elapsed: f32,
    pub features: FeatureVector,
    pub strikes: Vec<Strike>,
    pub marbles: usize,
}

pub struct FrameScheduler {
    session: Session,
    running: bool,
    pacing: Pacing,
    last_tick: Option<Duration>,
    elapsed: f32,
    frame: u64,
}

impl FrameScheduler {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            running: false,
            pacing: Pacing::Display,
            last_tick: None,
            elapsed: 0.0,
            frame: 0,
        }
    }

    /// The first tick measures its step from `now`
    pub fn start(&mut self, now: Duration) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_tick = Some(now);
        tracing::info!(frame = self.frame, "scheduler started");
    }

    /// No tick runs after this returns. Calling it twice is harmless.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.last_tick = None;
        tracing::info!(frame = self.frame, "scheduler stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
    }

    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Step to take at `now` and the new reference time, or `None` when a
    /// fixed step is not yet due
    fn next_step(&self, now: Duration) -> Option<(f32, Duration)> {
        let Some(last) = self.last_tick else {
            return Some((0.0, now));
        };
        let since = now.saturating_sub(last);

        match self.pacing {
            Pacing::Display => Some((since.as_secs_f32().min(MAX_DT), now)),
            Pacing::Fixed(step) => {
                let period = Duration::try_from_secs_f32(step.max(f32::EPSILON))
                    .unwrap_or(Duration::MAX);
                if since < period {
                    None
                } else if since < period.saturating_mul(MAX_FIXED_BACKLOG) {
                    Some((step, last + period))
                } else {
                    // Too far behind: resync instead of bursting
                    Some((step, now))
                }
            }
        }
    }

    /// Run one full extract, simulate, present cycle.
    /// Returns `None` when the scheduler is stopped or a fixed step is not
    /// yet due.
    pub fn tick(&mut self, now: Duration, presenter: &mut dyn Presenter) -> Option<TickReport> {
        if !self.running {
            return None;
        }

        let (dt, reference) = self.next_step(now)?;
        self.last_tick = Some(reference);
        self.elapsed += dt;
        self.frame += 1;

        let clock = FrameClock {
            frame: self.frame,
            dt,
            elapsed: self.elapsed,
        };
        let strikes = self.session.tick(clock);
        presenter.present(self.session.scene());

        Some(TickReport {
            frame: self.frame,
            dt,
            elapsed: self.elapsed,
            features: self.session.features().clone(),
            strikes,
            marbles: self.session.marble_count(),
        })
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioSource, ToneSynth};
    use crate::scene::SceneGraph;
    use crate::session::SessionSettings;

    #[derive(Default)]
    struct CountingPresenter {
        frames: usize,
        last_len: usize,
    }

    impl Presenter for CountingPresenter {
        fn present(&mut self, scene: &SceneGraph) {
            self.frames += 1;
            self.last_len = scene.len();
        }
    }

    fn scheduler() -> FrameScheduler {
        FrameScheduler::new(Session::new(
            AudioSource::new(),
            ToneSynth::disabled(),
            &SessionSettings::default(),
        ))
    }

    #[test]
    fn test_no_tick_before_start_or_after_stop() {
        let mut sched = scheduler();
        let mut presenter = CountingPresenter::default();
        assert!(sched.tick(Duration::ZERO, &mut presenter).is_none());

        sched.start(Duration::ZERO);
        assert!(sched.tick(Duration::from_millis(16), &mut presenter).is_some());

        sched.stop();
        sched.stop();
        assert!(!sched.is_running());
        assert!(sched.tick(Duration::from_millis(32), &mut presenter).is_none());
        assert_eq!(presenter.frames, 1);
    }

    #[test]
    fn test_dt_measurement() {
        let mut sched = scheduler();
        let mut presenter = CountingPresenter::default();
        sched.start(Duration::from_secs(5));

        // First step is measured from start
        let first = sched.tick(Duration::from_millis(5016), &mut presenter).unwrap();
        assert!((first.dt - 0.016).abs() < 1e-5);

        let second = sched.tick(Duration::from_millis(5036), &mut presenter).unwrap();
        assert!((second.dt - 0.02).abs() < 1e-5);

        // Long stalls are clamped
        let third = sched.tick(Duration::from_secs(9), &mut presenter).unwrap();
        assert_eq!(third.dt, MAX_DT);
        assert_eq!(third.frame, 3);
    }

    #[test]
    fn test_fixed_pacing_ignores_display_rate() {
        let mut sched = scheduler();
        let mut presenter = CountingPresenter::default();
        sched.set_pacing(Pacing::Fixed(0.025));
        sched.start(Duration::ZERO);

        // A 200 Hz display for one second still yields 40 steps
        let mut steps = 0;
        for ms in (5..=1000u64).step_by(5) {
            if let Some(report) = sched.tick(Duration::from_millis(ms), &mut presenter) {
                assert_eq!(report.dt, 0.025);
                steps += 1;
            }
        }
        assert_eq!(steps, 40);
        assert_eq!(presenter.frames, 40);
        assert!((sched.elapsed() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_fixed_pacing_resyncs_after_stall() {
        let mut sched = scheduler();
        let mut presenter = CountingPresenter::default();
        sched.set_pacing(Pacing::Fixed(0.025));
        sched.start(Duration::ZERO);

        assert!(sched.tick(Duration::from_secs(10), &mut presenter).is_some());
        // Backlog dropped: the next step is due one period after the stall
        assert!(sched.tick(Duration::from_millis(10_010), &mut presenter).is_none());
        assert!(sched.tick(Duration::from_millis(10_025), &mut presenter).is_some());
    }

    #[test]
    fn test_present_sees_ticked_scene() {
        let mut sched = scheduler();
        let mut presenter = CountingPresenter::default();
        sched.start(Duration::ZERO);
        sched.session_mut().spawn_marble();

        let report = sched.tick(Duration::ZERO, &mut presenter).unwrap();
        assert_eq!(report.marbles, 1);
        assert_eq!(presenter.last_len, sched.session().scene().len());
    }
}

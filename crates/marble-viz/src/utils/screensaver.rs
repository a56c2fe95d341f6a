//! Keeps the display awake while the xylophone is running.

#[cfg(target_os = "linux")]
mod platform {
    use std::process::{Child, Command, Stdio};

    /// Holds an idle inhibit lock until dropped.
    pub struct ScreensaverInhibitor {
        child: Child,
    }

    impl ScreensaverInhibitor {
        /// Spawns `systemd-inhibit` around a sleeping child. `None` when it
        /// is not installed.
        pub fn new() -> Option<Self> {
            let child = Command::new("systemd-inhibit")
                .args([
                    "--what=idle",
                    "--who=marble-viz",
                    "--why=Marble xylophone running",
                    "--mode=block",
                    "sleep",
                    "infinity",
                ])
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();

            match child {
                Ok(child) => {
                    tracing::info!("screensaver inhibited via systemd-inhibit");
                    Some(Self { child })
                }
                Err(e) => {
                    tracing::debug!("systemd-inhibit unavailable: {e}");
                    None
                }
            }
        }
    }

    impl Drop for ScreensaverInhibitor {
        fn drop(&mut self) {
            let _ = self.child.kill();
            let _ = self.child.wait();
            tracing::info!("screensaver released");
        }
    }
}

#[cfg(windows)]
mod platform {
    use windows::Win32::System::Power::{
        SetThreadExecutionState, ES_CONTINUOUS, ES_DISPLAY_REQUIRED,
    };

    pub struct ScreensaverInhibitor {
        _private: (),
    }

    impl ScreensaverInhibitor {
        pub fn new() -> Option<Self> {
            unsafe {
                SetThreadExecutionState(ES_CONTINUOUS | ES_DISPLAY_REQUIRED);
            }
            tracing::info!("screensaver inhibited via SetThreadExecutionState");
            Some(Self { _private: () })
        }
    }

    impl Drop for ScreensaverInhibitor {
        fn drop(&mut self) {
            unsafe {
                SetThreadExecutionState(ES_CONTINUOUS);
            }
            tracing::info!("screensaver released");
        }
    }
}

#[cfg(not(any(target_os = "linux", windows)))]
mod platform {
    pub struct ScreensaverInhibitor;

    impl ScreensaverInhibitor {
        pub fn new() -> Option<Self> {
            None
        }
    }
}

pub use platform::ScreensaverInhibitor;

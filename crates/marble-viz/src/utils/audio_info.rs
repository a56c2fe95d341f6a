//! `--audio-info` diagnostics: what the output side of the app will see.

use std::process::Command;

use marble_viz_core::audio::output::{default_device_name, list_devices};

/// Print output devices and, on Linux, the running sound server
pub fn log_audio_info() {
    println!("\n=== Audio Output Diagnostics ===\n");

    println!("--- Host ---");
    println!("  {}", cpal::default_host().id().name());

    println!("\n--- Output Devices ---");
    let default = default_device_name();
    let devices = list_devices();
    if devices.is_empty() {
        println!("  (none found, marble notes and playback will be silent)");
    }
    for (i, name) in devices.iter().enumerate() {
        let marker = if default.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} [{}] {}", marker, i, name);
    }

    if cfg!(target_os = "linux") {
        println!("\n--- Sound Server ---");
        for server in ["pipewire", "pulseaudio"] {
            let state = if is_running(server) {
                "running"
            } else {
                "not running"
            };
            println!("  {}: {}", server, state);
        }
        println!("\n--- Default Sink ---");
        run_cmd("pactl", &["get-default-sink"]);
    }

    println!("\n=== End Diagnostics ===\n");
}

fn is_running(process: &str) -> bool {
    Command::new("pgrep")
        .arg("-x")
        .arg(process)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn run_cmd(cmd: &str, args: &[&str]) {
    match Command::new(cmd).args(args).output() {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            for line in stdout.lines() {
                println!("  {}", line);
            }
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                eprintln!("  (error: {})", stderr.trim());
            }
        }
        Err(_) => println!("  ({} not found)", cmd),
    }
}

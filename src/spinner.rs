//! Terminal feedback while the gateway restores a photo.

use std::io::Write;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const INTERVAL: Duration = Duration::from_millis(80);

/// Renders `<frame> <message> <elapsed>s` on stderr until stopped.
pub struct Spinner {
    handle: JoinHandle<Duration>,
    stop: watch::Sender<bool>,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let message = message.to_string();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            for frame in FRAMES.iter().cycle() {
                eprint!("\x1b[2K\r{frame} {message} {}", elapsed_label(started.elapsed()));
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    _ = stop_rx.changed() => break,
                }
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
            started.elapsed()
        });

        Self {
            handle,
            stop: stop_tx,
        }
    }

    /// Clear the line and report how long the spinner ran.
    pub async fn stop(self) -> Duration {
        let _ = self.stop.send(true);
        self.handle.await.unwrap_or_default()
    }
}

fn elapsed_label(elapsed: Duration) -> String {
    format!("{}s", elapsed.as_secs())
}

//! A small stderr spinner shown while waiting on the network.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const INTERVAL: Duration = Duration::from_millis(80);

/// Runs in a background task until [`Spinner::stop`]. Does nothing when
/// stderr is not a terminal, so piped output stays clean.
pub struct Spinner {
    running: Option<(JoinHandle<()>, watch::Sender<bool>)>,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        if !std::io::stderr().is_terminal() {
            return Self { running: None };
        }
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let message = message.to_string();

        let handle = tokio::spawn(async move {
            for frame in FRAMES.iter().cycle() {
                // clear line, return to column 0
                eprint!("\x1b[2K\r{frame} {message}");
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    _ = cancel_rx.changed() => break,
                }
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            running: Some((handle, cancel_tx)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stop and clear the line.
    pub async fn stop(self) {
        if let Some((handle, cancel)) = self.running {
            let _ = cancel.send(true);
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_single_braille_chars() {
        for frame in FRAMES {
            assert_eq!(frame.chars().count(), 1);
        }
    }

    #[tokio::test]
    async fn start_and_stop() {
        let spinner = Spinner::start("searching");
        tokio::time::sleep(Duration::from_millis(100)).await;
        spinner.stop().await;
    }

    #[tokio::test]
    async fn immediate_stop() {
        Spinner::start("quick").stop().await;
    }
}

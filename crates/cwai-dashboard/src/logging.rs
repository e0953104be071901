//! Tracing subscriber setup.
//!
//! The console owns the terminal, so its log lines travel over a channel and
//! are shown in the output panel. One-shot commands log to stderr, keeping
//! stdout clean for results.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` if set, else the configured level.
fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Forwards formatted log output into a channel, one message per line.
#[derive(Clone)]
pub struct ChannelWriter {
    sender: Sender<String>,
}

impl ChannelWriter {
    pub fn new(sender: Sender<String>) -> Self {
        Self { sender }
    }
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let _ = self.sender.send(line.to_string());
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route logs into a channel for the console. Returns the receiving end.
pub fn init_console(default_level: &str) -> Receiver<String> {
    let (tx, rx) = mpsc::channel::<String>();
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .compact()
        .with_ansi(false)
        .without_time()
        .with_writer(move || ChannelWriter::new(tx.clone()))
        .try_init();
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
    rx
}

/// Route logs to stderr.
pub fn init_stderr(default_level: &str) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if let Err(e) = result {
        eprintln!("logging already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn channel_writer_splits_lines() {
        let (tx, rx) = mpsc::channel();
        let mut writer = ChannelWriter::new(tx);
        writer
            .write_all(b" INFO Backend catalogs loaded\n\n WARN Analysis request failed\n")
            .unwrap();
        let lines: Vec<String> = rx.try_iter().collect();
        assert_eq!(
            lines,
            vec![
                " INFO Backend catalogs loaded".to_string(),
                " WARN Analysis request failed".to_string()
            ]
        );
    }
}

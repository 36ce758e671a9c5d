//! Scan input as a cancellable stream of decoded strings.
//!
//! Hardware scanners in keyboard mode and external decoders both deliver one decoded
//! payload per line. A code held in front of the camera is decoded over and over, so an
//! identical consecutive scan inside the hold window is dropped here. This is separate
//! from the duplicate check against the worksheet.

use std::io::{self, BufRead};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_HOLD: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub struct ScanDebouncer {
    hold: Duration,
    last: Option<(String, Instant)>,
}

impl ScanDebouncer {
    pub fn new(hold: Duration) -> Self {
        Self { hold, last: None }
    }

    /// Returns false for a repeat of the last accepted scan while it is still held.
    pub fn accept(&mut self, text: &str, now: Instant) -> bool {
        if let Some((last, at)) = &self.last {
            if last == text && now.saturating_duration_since(*at) < self.hold {
                return false;
            }
        }
        self.last = Some((text.to_string(), now));
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Lines are read on a plain OS thread and handed over through a channel. A blocking
/// read cannot be interrupted, so the reader thread is left parked on it when the session
/// is cancelled; it never holds up runtime shutdown.
pub struct ScanEvents {
    lines: mpsc::Receiver<io::Result<String>>,
    cancel: CancellationToken,
    debouncer: ScanDebouncer,
}

impl ScanEvents {
    pub fn new(
        lines: mpsc::Receiver<io::Result<String>>,
        cancel: CancellationToken,
        hold: Duration,
    ) -> Self {
        Self {
            lines,
            cancel,
            debouncer: ScanDebouncer::new(hold),
        }
    }

    /// Starts a `scan-input` thread feeding lines of `reader` into the session.
    pub fn from_reader<R>(reader: R, cancel: CancellationToken, hold: Duration) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(16);
        std::thread::Builder::new()
            .name("scan-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(Self::new(rx, cancel, hold))
    }

    /// Waits for the next scan. `None` once the input ends or the session is cancelled.
    pub async fn next_scan(&mut self) -> io::Result<Option<String>> {
        loop {
            let line = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(None),
                line = self.lines.recv() => line,
            };
            let line = match line {
                Some(line) => line?,
                None => return Ok(None),
            };

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if !self.debouncer.accept(text, Instant::now()) {
                tracing::debug!(scan = %text, "Ignoring repeated scan");
                continue;
            }
            return Ok(Some(text.to_string()));
        }
    }

    /// Starts over as if nothing had been scanned yet.
    pub fn restart(&mut self) {
        self.debouncer.reset();
    }
}

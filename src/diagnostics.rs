use crate::config::Config;
use crate::error::FsResult;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use tracing::{debug, error, info, trace, warn, Level};

/// Structured events raised while analysing a flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    StageCompleted {
        manoeuvre: String,
        stage: String,
    },
    SplitAdjusted {
        manoeuvre: String,
        first: String,
        second: String,
        steps: i64,
    },
    AlignmentPass {
        manoeuvre: String,
        pass: usize,
        adjusted: usize,
    },
    ManoeuvreFailed {
        manoeuvre: String,
        error: String,
    },
    ScheduleScored {
        total: f64,
    },
}

/// Receiver for diagnostic events. Implementations are shared across
/// worker threads so they must be `Send + Sync`.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&self, _event: DiagnosticEvent) {}
}

/// Forwards events to whatever `tracing` subscriber the caller installed,
/// at `level`. Failed manoeuvres are always warnings.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    pub level: Level,
}

impl TracingSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn from_config(config: &Config) -> FsResult<Self> {
        Ok(Self::new(config.event_level()?))
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent) {
        if let DiagnosticEvent::ManoeuvreFailed { manoeuvre, error } = &event {
            warn!(manoeuvre = %manoeuvre, "analysis failed: {}", error);
            return;
        }
        match self.level {
            Level::ERROR => error!(?event),
            Level::WARN => warn!(?event),
            Level::INFO => info!(?event),
            Level::DEBUG => debug!(?event),
            _ => trace!(?event),
        }
    }
}

/// Pushes events down an mpsc channel. The sender is wrapped in a mutex so
/// the sink can be shared by reference between rayon workers.
pub struct ChannelSink {
    tx: Mutex<Sender<DiagnosticEvent>>,
}

impl ChannelSink {
    pub fn new(tx: Sender<DiagnosticEvent>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl DiagnosticSink for ChannelSink {
    fn emit(&self, event: DiagnosticEvent) {
        if let Ok(tx) = self.tx.lock() {
            // receiver gone means nobody is listening any more
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::mpsc::channel;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logged(sink: TracingSink, event: DiagnosticEvent) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || sink.emit(event));
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn tracing_sink_uses_its_level() {
        let event = DiagnosticEvent::StageCompleted {
            manoeuvre: "loops".to_string(),
            stage: "scored".to_string(),
        };
        let text = logged(TracingSink::new(Level::DEBUG), event.clone());
        assert!(text.contains("DEBUG") && text.contains("loops"), "{}", text);
        let text = logged(TracingSink::new(Level::ERROR), event);
        assert!(text.contains("ERROR"), "{}", text);
    }

    #[test]
    fn failures_stay_warnings() {
        let text = logged(
            TracingSink::new(Level::TRACE),
            DiagnosticEvent::ManoeuvreFailed {
                manoeuvre: "stall".to_string(),
                error: "no data".to_string(),
            },
        );
        assert!(text.contains("WARN") && text.contains("no data"), "{}", text);
    }

    #[test]
    fn tracing_sink_level_comes_from_config() {
        let config = Config {
            event_level: "debug".to_string(),
            ..Config::default()
        };
        assert_eq!(TracingSink::from_config(&config).unwrap().level, Level::DEBUG);
        let bad = Config {
            event_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(TracingSink::from_config(&bad).is_err());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn channel_sink_delivers_events() {
        let (tx, rx) = channel();
        let sink = ChannelSink::new(tx);
        sink.emit(DiagnosticEvent::ScheduleScored { total: 1.5 });
        assert_eq!(
            rx.recv().unwrap(),
            DiagnosticEvent::ScheduleScored { total: 1.5 }
        );
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        ChannelSink::new(tx).emit(DiagnosticEvent::ScheduleScored { total: 0.0 });
    }
}

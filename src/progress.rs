//! Batch ingestion progress reporting.
//!
//! Reports observable progress during `autoprice upload` so users can follow
//! a long batch. Progress is emitted on **stderr** so stdout remains
//! parseable for scripts. The server runs batches with [`NoProgress`]; HTTP
//! callers poll `GET /jobs/{id}` instead.

use std::io::Write;

/// A single progress event for one batch.
#[derive(Clone, Debug, PartialEq)]
pub enum IngestProgressEvent {
    /// The job row exists; `total` records are about to be processed.
    Started { batch_id: String, total: u64 },
    /// Record `n` of `total` finished, successfully or not.
    Item {
        batch_id: String,
        n: u64,
        total: u64,
        ok: bool,
    },
    /// The job was marked completed.
    Finished {
        batch_id: String,
        processed: u64,
        total: u64,
        failed: u64,
    },
}

/// Receives progress events from the ingest pipeline.
pub trait IngestProgressReporter: Send + Sync {
    fn report(&self, event: IngestProgressEvent);
}

/// Human-friendly progress on stderr: "upload b1  1,234 / 5,000 records".
pub struct StderrProgress;

impl IngestProgressReporter for StderrProgress {
    fn report(&self, event: IngestProgressEvent) {
        let line = match &event {
            IngestProgressEvent::Started { batch_id, total } => {
                format!("upload {}  starting  {} records\n", batch_id, format_number(*total))
            }
            IngestProgressEvent::Item {
                batch_id, n, total, ..
            } => format!(
                "upload {}  {} / {} records\n",
                batch_id,
                format_number(*n),
                format_number(*total)
            ),
            IngestProgressEvent::Finished {
                batch_id,
                processed,
                total,
                failed,
            } => format!(
                "upload {}  done  processed {} / {}, failed {}\n",
                batch_id,
                format_number(*processed),
                format_number(*total),
                format_number(*failed)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl IngestProgressReporter for JsonProgress {
    fn report(&self, event: IngestProgressEvent) {
        let obj = event_json(&event);
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn event_json(event: &IngestProgressEvent) -> serde_json::Value {
    match event {
        IngestProgressEvent::Started { batch_id, total } => serde_json::json!({
            "event": "progress",
            "batch": batch_id,
            "phase": "started",
            "total": total
        }),
        IngestProgressEvent::Item {
            batch_id,
            n,
            total,
            ok,
        } => serde_json::json!({
            "event": "progress",
            "batch": batch_id,
            "phase": "ingesting",
            "n": n,
            "total": total,
            "ok": ok
        }),
        IngestProgressEvent::Finished {
            batch_id,
            processed,
            total,
            failed,
        } => serde_json::json!({
            "event": "progress",
            "batch": batch_id,
            "phase": "completed",
            "processed": processed,
            "total": total,
            "failed": failed
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgressReporter for NoProgress {
    fn report(&self, _event: IngestProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn IngestProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn json_event_shape() {
        let v = event_json(&IngestProgressEvent::Item {
            batch_id: "b1".into(),
            n: 2,
            total: 5,
            ok: false,
        });
        assert_eq!(v["phase"], "ingesting");
        assert_eq!(v["batch"], "b1");
        assert_eq!(v["n"], 2);
        assert_eq!(v["ok"], false);
    }
}

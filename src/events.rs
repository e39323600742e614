//! Progress events and the stream wire format.
//!
//! The pipeline reports advancement through a [`ProgressSink`]; the
//! transport layer forwards those events to the caller as tagged
//! [`StreamEvent`] records framed as `data: <json>\n\n` lines.

use serde::{Deserialize, Serialize};

use crate::types::Strategy;

/// A small message reporting pipeline advancement. Transient, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// 1-based stage ordinal.
    pub step: u32,
    /// 0-100, non-decreasing within a run; 100 only on completion.
    pub progress: u8,
    /// Human-readable stage description.
    pub message: String,
}

/// One record on the progress stream.
///
/// Explicitly tagged so consumers can handle the three shapes
/// exhaustively instead of sniffing object fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Progress {
        step: u32,
        progress: u8,
        message: String,
    },
    Complete {
        data: Box<Strategy>,
    },
    Error {
        error: String,
    },
}

impl StreamEvent {
    pub fn progress(event: &ProgressEvent) -> Self {
        StreamEvent::Progress {
            step: event.step,
            progress: event.progress,
            message: event.message.clone(),
        }
    }

    /// Whether this record terminates the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Progress { .. })
    }

    /// Frame as one SSE record: `data: <json>` followed by a blank line.
    pub fn encode_sse(&self) -> String {
        // Serialization of these shapes cannot fail
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("data: {}\n\n", json)
    }
}

/// Receives progress events during a pipeline run.
///
/// Implementations must be cheap and non-blocking; the pipeline emits
/// inline between stages.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// A [`ProgressSink`] backed by a closure.
pub struct FnSink<F: Fn(ProgressEvent) + Send + Sync>(pub F);

impl<F: Fn(ProgressEvent) + Send + Sync> ProgressSink for FnSink<F> {
    fn emit(&self, event: ProgressEvent) {
        (self.0)(event);
    }
}

/// A sink that discards everything, for unary runs.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_progress_wire_shape() {
        let event = StreamEvent::Progress {
            step: 3,
            progress: 40,
            message: "Analyzing market".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["step"], 3);
        assert_eq!(value["progress"], 40);
    }

    #[test]
    fn test_error_wire_shape() {
        let event = StreamEvent::Error {
            error: "stage market-analysis failed".into(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["error"], "stage market-analysis failed");
    }

    #[test]
    fn test_encode_sse_framing() {
        let event = StreamEvent::Progress {
            step: 1,
            progress: 0,
            message: "start".into(),
        };
        let framed = event.encode_sse();
        assert!(framed.starts_with("data: {"));
        assert!(framed.ends_with("\n\n"));
        // The payload line itself is valid JSON
        let line = framed.trim_start_matches("data: ").trim_end();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["type"], "progress");
    }

    #[test]
    fn test_terminal_detection() {
        assert!(!StreamEvent::Progress {
            step: 1,
            progress: 0,
            message: String::new()
        }
        .is_terminal());
        assert!(StreamEvent::Error {
            error: String::new()
        }
        .is_terminal());
    }

    #[test]
    fn test_tagged_deserialization() {
        let event: StreamEvent =
            serde_json::from_value(json!({"type": "progress", "step": 2, "progress": 15, "message": "m"}))
                .unwrap();
        assert!(matches!(event, StreamEvent::Progress { step: 2, .. }));
    }

    #[test]
    fn test_fn_sink_invoked() {
        use std::sync::{Arc, Mutex};
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let sink = FnSink(move |e: ProgressEvent| seen2.lock().unwrap().push(e.progress));
        sink.emit(ProgressEvent {
            step: 1,
            progress: 15,
            message: "x".into(),
        });
        assert_eq!(*seen.lock().unwrap(), vec![15]);
    }
}

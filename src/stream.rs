//! Consumer-side decoder for the progress stream.
//!
//! Handles `data: ` prefixed lines split across transport chunk boundaries:
//! bytes are buffered until a full line is available, and lines that are
//! not valid event JSON are skipped rather than aborting the stream.

use crate::events::StreamEvent;

/// Buffered decoder for the `data: <json>\n\n` progress wire format.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return any complete events.
    ///
    /// Blank separator lines are skipped; malformed records are ignored.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let text = String::from_utf8_lossy(chunk);
        self.buffer.push_str(&text);

        let mut events = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            if let Some(data) = line
                .strip_prefix("data: ")
                .or_else(|| line.strip_prefix("data:"))
            {
                if let Ok(event) = serde_json::from_str::<StreamEvent>(data.trim()) {
                    events.push(event);
                }
            }
        }

        events
    }

    /// Decode any trailing record not terminated by a newline. Call after
    /// the stream ends.
    pub fn flush(&mut self) -> Option<StreamEvent> {
        let remaining = self.buffer.trim().to_string();
        self.buffer.clear();
        let data = remaining
            .strip_prefix("data: ")
            .or_else(|| remaining.strip_prefix("data:"))?;
        serde_json::from_str::<StreamEvent>(data.trim()).ok()
    }
}

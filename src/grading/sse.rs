//! `text/event-stream` framing.
//!
//! A [`Decoder`] that turns raw bytes into [`SseFrame`]s. Lines end with
//! `\n` or `\r\n`; a blank line dispatches the pending frame. Supported
//! fields are `event`, `data`, `id` and `retry`; lines starting with `:`
//! are comments. Multiple `data` lines are joined with `\n`.

use std::time::Duration;

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// One dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Event name, `message` when the server sent none.
    pub event: String,
    pub data: String,
    /// Last event ID seen on the stream so far.
    pub id: Option<String>,
    /// Reconnection delay requested by the server.
    pub retry: Option<Duration>,
}

/// Incremental event-stream decoder.
#[derive(Debug, Default)]
pub struct SseCodec {
    event: Option<String>,
    data: Vec<String>,
    has_data: bool,
    last_id: Option<String>,
    retry: Option<Duration>,
    /// Bytes already scanned for a newline in `src`.
    scanned: usize,
}

impl SseCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data.push(value.to_string());
                self.has_data = true;
            }
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;

        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "message".to_string()),
            data,
            id: self.last_id.clone(),
            retry: self.retry,
        })
    }
}

impl Decoder for SseCodec {
    type Item = SseFrame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<SseFrame>, std::io::Error> {
        loop {
            let newline = match src[self.scanned..].iter().position(|b| *b == b'\n') {
                Some(offset) => self.scanned + offset,
                None => {
                    self.scanned = src.len();
                    return Ok(None);
                }
            };

            let raw = src.split_to(newline + 1);
            self.scanned = 0;

            let mut line = &raw[..raw.len() - 1];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line);

            if let Some(frame) = self.process_line(&line) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<SseFrame>, std::io::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        // An unterminated trailing frame is incomplete and dropped.
        src.clear();
        self.scanned = 0;
        self.event = None;
        self.data.clear();
        self.has_data = false;
        Ok(None)
    }
}

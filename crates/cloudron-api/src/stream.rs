//! Event-stream decoding and build log rendering.
//!
//! Build and app logs are pushed as `text/event-stream`: events separated by a
//! blank line, each carrying one or more `data:` lines. [`EventStream`] turns a
//! byte stream into events; [`BuildLogRenderer`] draws build events on a
//! terminal, redrawing a status line in place while its step keeps reporting.

use std::fmt::Display;
use std::io::Write;

use bytes::Bytes;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{ApiError, Result};

/// One decoded server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Value of the `event:` field.
    pub event: Option<String>,
    /// Value of the `id:` field.
    pub id: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Longest line accepted before the stream is treated as broken.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

/// Decodes server-sent events from a stream of byte chunks.
///
/// Chunk boundaries may fall anywhere, including inside a UTF-8 sequence.
pub struct EventStream<S> {
    inner: S,
    buf: Vec<u8>,
    pending: Option<Event>,
    done: bool,
}

impl<S, E> EventStream<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
{
    /// Wrap a chunk stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            pending: None,
            done: false,
        }
    }

    /// Next complete event, or `None` once the stream ended.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the underlying stream fails or a line
    /// grows past [`MAX_LINE_LEN`].
    pub async fn next_event(&mut self) -> Result<Option<Event>> {
        loop {
            while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim_end_matches(['\n', '\r']);
                if let Some(event) = self.feed_line(line) {
                    return Ok(Some(event));
                }
            }

            if self.buf.len() > MAX_LINE_LEN {
                return Err(ApiError::transport(format!(
                    "event stream: line exceeds {MAX_LINE_LEN} bytes"
                )));
            }

            if self.done {
                return Ok(self.flush_pending());
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => {
                    trace!(len = chunk.len(), "event stream chunk");
                    self.buf.extend_from_slice(&chunk);
                }
                Some(Err(e)) => return Err(ApiError::transport(format!("event stream: {e}"))),
                None => {
                    self.done = true;
                    if !self.buf.is_empty() {
                        // Final line without a trailing newline.
                        self.buf.push(b'\n');
                    }
                }
            }
        }
    }

    fn feed_line(&mut self, line: &str) -> Option<Event> {
        if line.is_empty() {
            return self.flush_pending();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        let event = self.pending.get_or_insert_with(Event::default);
        match field {
            "data" => {
                if !event.data.is_empty() {
                    event.data.push('\n');
                }
                event.data.push_str(value);
            }
            "event" => event.event = Some(value.to_string()),
            "id" => event.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn flush_pending(&mut self) -> Option<Event> {
        self.pending.take().filter(|e| !e.data.is_empty())
    }
}

/// Raw build event payload.
#[derive(Debug, Clone, Default, Deserialize)]
struct BuildPayload {
    id: Option<String>,
    status: Option<String>,
    progress: Option<String>,
    stream: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// A decoded build log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    /// Progress of a discrete build step, e.g. one image layer.
    Status {
        /// Step id; events with the same id redraw one line.
        id: Option<String>,
        /// Status text.
        status: String,
        /// Optional progress bar or counter.
        progress: Option<String>,
    },
    /// Free-form build output.
    Log(String),
    /// Informational message from the build service.
    Message(String),
    /// The build failed.
    Error(String),
}

impl BuildEvent {
    /// Decode the `data` of an event; unknown payloads yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not JSON.
    pub fn parse(data: &str) -> Result<Option<Self>> {
        let payload: BuildPayload = serde_json::from_str(data)?;
        Ok(if let Some(error) = payload.error {
            Some(Self::Error(error))
        } else if let Some(status) = payload.status {
            Some(Self::Status {
                id: payload.id,
                status,
                progress: payload.progress,
            })
        } else if let Some(stream) = payload.stream {
            Some(Self::Log(stream))
        } else {
            payload.message.map(Self::Message)
        })
    }
}

/// Renders build events to a terminal.
#[derive(Debug, Default)]
pub struct BuildLogRenderer {
    /// Set while the cursor sits at the end of an unterminated status line.
    status_line: Option<Option<String>>,
}

impl BuildLogRenderer {
    /// Create a renderer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw one event.
    ///
    /// # Errors
    ///
    /// Returns `BuildFailed` for error events, or an IO error.
    pub fn render<W: Write>(&mut self, event: &BuildEvent, out: &mut W) -> Result<()> {
        match event {
            BuildEvent::Status {
                id,
                status,
                progress,
            } => {
                match &self.status_line {
                    Some(previous) if id.is_some() && previous == id => {
                        write!(out, "\r")?;
                        queue!(out, Clear(ClearType::CurrentLine))?;
                    }
                    Some(_) => writeln!(out)?,
                    None => {}
                }
                if let Some(id) = id {
                    write!(out, "{id}: ")?;
                }
                write!(out, "{status}")?;
                if let Some(progress) = progress {
                    write!(out, " {progress}")?;
                }
                self.status_line = Some(id.clone());
            }
            BuildEvent::Log(text) => {
                self.end_status_line(out)?;
                write!(out, "{text}")?;
            }
            BuildEvent::Message(text) => {
                self.end_status_line(out)?;
                writeln!(out, "{text}")?;
            }
            BuildEvent::Error(text) => {
                self.end_status_line(out)?;
                out.flush()?;
                return Err(ApiError::BuildFailed(text.clone()));
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Terminate a pending status line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.end_status_line(out)?;
        out.flush()?;
        Ok(())
    }

    fn end_status_line<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if self.status_line.take().is_some() {
            writeln!(out)?;
        }
        Ok(())
    }
}

/// Render every build event of `events` until the stream ends.
///
/// # Errors
///
/// Returns `BuildFailed` for error events and broken streams.
pub async fn render_build_events<S, E, W>(events: &mut EventStream<S>, out: &mut W) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
    W: Write,
{
    let mut renderer = BuildLogRenderer::new();
    loop {
        let event = events
            .next_event()
            .await
            .map_err(|e| ApiError::BuildFailed(e.to_string()))?;
        let Some(event) = event else { break };
        match BuildEvent::parse(&event.data) {
            Ok(Some(build_event)) => renderer.render(&build_event, out)?,
            Ok(None) => trace!(data = %event.data, "ignoring build event"),
            Err(e) => debug!(error = %e, "undecodable build event"),
        }
    }
    renderer.finish(out)
}

/// App log line pushed by the log stream.
#[derive(Debug, Clone, Deserialize)]
pub struct LogLine {
    /// Log text.
    #[serde(default)]
    pub message: String,
    /// Originating process or service.
    #[serde(default)]
    pub source: Option<String>,
}

/// Print app log events, one line each, until the stream ends.
///
/// # Errors
///
/// Returns a transport error if the stream breaks.
pub async fn print_log_events<S, E, W>(events: &mut EventStream<S>, out: &mut W) -> Result<()>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
    W: Write,
{
    while let Some(event) = events.next_event().await? {
        match serde_json::from_str::<LogLine>(&event.data) {
            Ok(line) => writeln!(out, "{}", line.message.trim_end_matches('\n'))?,
            Err(_) => writeln!(out, "{}", event.data)?,
        }
        out.flush()?;
    }
    Ok(())
}

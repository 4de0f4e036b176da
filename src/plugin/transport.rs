//! Newline-delimited JSON over a byte stream
//!
//! The host and the plugin exchange one JSON frame per line, conventionally
//! over the plugin's stdin and stdout. [`Peer`] writes outbound frames;
//! [`serve`] reads inbound frames and hands them to the bridge one at a
//! time.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

use super::bridge::Bridge;
use super::error::BridgeError;
use super::protocol::{Incoming, Notification, Response, EDIT};
use super::session::StopSignal;
use crate::domain::EditProposal;

/// Outbound half of the connection
///
/// Cloning shares the writer. A failed write raises the stop signal: once
/// the host stops reading there is nothing left to do.
#[derive(Clone)]
pub struct Peer {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    stop: StopSignal,
}

impl Peer {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            stop: StopSignal::new(),
        }
    }

    /// Peer writing to the process's stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn notify(&self, method: &str, params: Value) -> Result<(), BridgeError> {
        self.write_frame(&Notification::new(method, params))
    }

    pub fn respond(&self, response: &Response) -> Result<(), BridgeError> {
        self.write_frame(response)
    }

    /// Sends an `edit` notification
    pub fn edit(&self, plugin_id: u64, view_id: &str, edit: &EditProposal) -> Result<(), BridgeError> {
        let mut params = Map::new();
        params.insert(
            "edit".to_string(),
            serde_json::to_value(edit).map_err(BridgeError::Encode)?,
        );
        params.insert("view_id".to_string(), Value::from(view_id));
        params.insert("plugin_id".to_string(), Value::from(plugin_id));

        tracing::debug!(view_id, plugin_id, rev = edit.rev, priority = edit.priority, "sending edit");
        self.notify(EDIT, Value::Object(params))
    }

    fn write_frame<T: Serialize>(&self, frame: &T) -> Result<(), BridgeError> {
        let mut line = serde_json::to_vec(frame).map_err(BridgeError::Encode)?;
        line.push(b'\n');

        let mut writer = self.writer.lock();
        let written = writer.write_all(&line).and_then(|()| writer.flush());
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to write frame, stopping");
            self.stop.stop();
            return Err(err.into());
        }
        Ok(())
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("stopped", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Runs the read loop until end of input, a read error, or a stop request
///
/// The stop signal is checked after every message, so a `shutdown` or a
/// failed write ends the loop without waiting on the host again. Lines that
/// are not valid UTF-8 are decoded lossily; frames that cannot be parsed are
/// answered through [`Bridge::reject`] and skipped.
pub fn serve<R: BufRead>(bridge: &Bridge, mut reader: R) -> Result<(), BridgeError> {
    let stop = bridge.stop_signal().clone();
    let mut buf = Vec::new();

    while !stop.is_stopped() {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "failed to read from host, stopping");
                stop.stop();
                return Err(err.into());
            }
        }

        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            tracing::warn!(len = buf.len(), "frame is not valid UTF-8, decoding lossily");
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Incoming::parse(line) {
            Ok(message) => bridge.handle(message),
            Err(err) => bridge.reject(&err),
        }
    }

    stop.stop();
    tracing::info!("read loop finished");
    Ok(())
}

/// In-memory writer for inspecting what a [`Peer`] sent
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Captured(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl Captured {
    /// Every frame written so far, parsed
    pub(crate) fn frames(&self) -> Vec<Value> {
        let bytes = self.0.lock();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }
}

#[cfg(test)]
impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn capture() -> (Peer, Captured) {
    let captured = Captured::default();
    (Peer::new(captured.clone()), captured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Delta;
    use crate::plugin::protocol::{INVALID_REQUEST, PARSE_ERROR};
    use std::io::{BufReader, Cursor, Read};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INIT: &str = r#"{"method":"initialize","params":{"plugin_id":1,"buffer_info":[{"buffer_id":1,"path":"main.rs","views":["v1"]}]}}"#;

    /// Reader that counts how often it is asked for more after running dry
    struct CountingReader {
        data: Cursor<Vec<u8>>,
        reads_past_end: Arc<AtomicUsize>,
    }

    impl CountingReader {
        fn new(data: impl Into<Vec<u8>>) -> (BufReader<Self>, Arc<AtomicUsize>) {
            let reads_past_end = Arc::new(AtomicUsize::new(0));
            let reader = Self {
                data: Cursor::new(data.into()),
                reads_past_end: reads_past_end.clone(),
            };
            (BufReader::new(reader), reads_past_end)
        }
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                self.reads_past_end.fetch_add(1, Ordering::SeqCst);
            }
            Ok(n)
        }
    }

    /// Writer whose every write fails, counting the attempts
    struct ClosedPipe(Arc<AtomicUsize>);

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "host went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "host went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn edit_frame_shape() {
        let (peer, captured) = capture();
        let edit = EditProposal::new(2, Delta::insert(0, 0, "hi"), "fmt").high_priority();

        peer.edit(7, "view-id-1", &edit).unwrap();

        let frames = captured.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["jsonrpc"], "2.0");
        assert_eq!(frames[0]["method"], "edit");
        assert!(frames[0].get("id").is_none());
        assert_eq!(frames[0]["params"]["view_id"], "view-id-1");
        assert_eq!(frames[0]["params"]["plugin_id"], 7);
        assert_eq!(frames[0]["params"]["edit"]["rev"], 2);
        assert_eq!(frames[0]["params"]["edit"]["priority"], 0x1000_0000);
    }

    #[test]
    fn write_failure_raises_stop() {
        let peer = Peer::new(BrokenPipe);

        let err = peer.notify("edit", Value::Null).unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
        assert!(peer.stop_signal().is_stopped());
    }

    #[test]
    fn serve_handles_frames_until_eof() {
        let (peer, captured) = capture();
        let bridge = Bridge::new(peer);
        let input = format!(
            "{}\n\ngarbage\n{}\n",
            INIT, r#"{"id":1,"method":"update","params":{"view_id":"v1","rev":1}}"#
        );

        serve(&bridge, Cursor::new(input)).unwrap();

        let frames = captured.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["id"], Value::Null);
        assert_eq!(frames[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(frames[1]["id"], 1);
        assert_eq!(frames[1]["result"], 0);
        assert!(bridge.stop_signal().is_stopped());
    }

    #[test]
    fn serve_survives_invalid_utf8() {
        let (peer, captured) = capture();
        let bridge = Bridge::new(peer);
        let mut input = Vec::new();
        input.extend_from_slice(INIT.as_bytes());
        input.extend_from_slice(b"\n{\"method\":\"ping\",\"params\":\"\xff\"}\n");
        input.extend_from_slice(b"{\"id\":1,\"method\":\"update\",\"params\":{\"view_id\":\"v1\",\"rev\":1}}\n");

        serve(&bridge, Cursor::new(input)).unwrap();

        let frames = captured.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["id"], 1);
        assert_eq!(frames[0]["result"], 0);
        assert_eq!(bridge.with_views(|views| views.get("v1").unwrap().revision()), 1);
    }

    #[test]
    fn serve_accepts_long_lines() {
        let (peer, captured) = capture();
        let bridge = Bridge::new(peer);
        let text = "x".repeat(1 << 20);
        let update = serde_json::json!({
            "id": 1,
            "method": "update",
            "params": {
                "view_id": "v1",
                "rev": 1,
                "delta": {"els": [{"insert": text}], "base_len": 0},
            }
        });

        serve(&bridge, Cursor::new(format!("{}\n{}\n", INIT, update))).unwrap();

        let frames = captured.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["result"], 0);
    }

    #[test]
    fn serve_answers_rejected_requests() {
        let (peer, captured) = capture();
        let bridge = Bridge::new(peer);
        let input = concat!(
            r#"{"id":7,"method":5}"#,
            "\n",
            r#"{"id":8}"#,
            "\n",
            r#"{"method":"ping","params":{}}"#,
            "\n",
        );

        serve(&bridge, Cursor::new(input)).unwrap();

        let frames = captured.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["id"], 7);
        assert_eq!(frames[0]["error"]["code"], INVALID_REQUEST);
        assert_eq!(frames[1]["id"], 8);
        assert_eq!(frames[1]["error"]["code"], INVALID_REQUEST);
    }

    #[test]
    fn serve_stops_after_shutdown() {
        let (peer, captured) = capture();
        let bridge = Bridge::new(peer);
        let input = concat!(
            r#"{"method":"shutdown","params":{}}"#,
            "\n",
            r#"{"id":1,"method":"update","params":{"view_id":"v1","rev":1}}"#,
            "\n",
        );

        serve(&bridge, Cursor::new(input)).unwrap();

        assert!(captured.frames().is_empty());
    }

    #[test]
    fn serve_does_not_read_past_shutdown() {
        let (peer, _captured) = capture();
        let bridge = Bridge::new(peer);
        let (reader, reads_past_end) = CountingReader::new("{\"method\":\"shutdown\"}\n");

        serve(&bridge, reader).unwrap();

        assert!(bridge.stop_signal().is_stopped());
        assert_eq!(reads_past_end.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn serve_exits_when_host_stops_reading() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let bridge = Bridge::new(Peer::new(ClosedPipe(attempts.clone())));
        let input = format!(
            "{}\n{}\n{}\n",
            INIT,
            r#"{"id":1,"method":"update","params":{"view_id":"v1","rev":1}}"#,
            r#"{"id":2,"method":"update","params":{"view_id":"v1","rev":2}}"#,
        );
        let (reader, reads_past_end) = CountingReader::new(input);

        serve(&bridge, reader).unwrap();

        assert!(bridge.stop_signal().is_stopped());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(reads_past_end.load(Ordering::SeqCst), 0);
        assert_eq!(bridge.with_views(|views| views.get("v1").unwrap().revision()), 1);
    }
}

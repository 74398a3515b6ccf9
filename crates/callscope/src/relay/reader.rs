//! Client side of the stream: frame decoding and display buffering.
//!
//! Consumes raw response-body chunks with no alignment guarantees. Bytes
//! are buffered and split on the newline byte before any UTF-8 decoding,
//! so a multi-byte character straddling a chunk boundary never corrupts a
//! line. Malformed lines are dropped, never an error.

use serde_json::from_str;

use super::wire::{WireEvent, DATA_PREFIX, DONE_SENTINEL};

/// Buffer text replacement shown when the stream reports an error.
pub const ANALYSIS_ERROR_APOLOGY: &str = "Sorry, I encountered an error analyzing the transcript.";

/// Shown when the request itself fails before any stream is read.
pub const REQUEST_FAILED_APOLOGY: &str =
    "Sorry, I encountered an error. Please check your Claude credentials are configured correctly.";

/// One decoded unit of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    Event(WireEvent),
    /// The `[DONE]` sentinel. Reading continues until the body ends.
    EndOfStream,
}

// ============================================================================
// Frame decoder
// ============================================================================

/// Incremental decoder for `data: ` frames.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of body bytes, returning every event completed by it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ReaderEvent> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = &self.buf[start..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(event) = decode_line(line) {
                out.push(event);
            }
            start = end + 1;
        }
        self.buf.drain(..start);
        out
    }
}

fn decode_line(line: &[u8]) -> Option<ReaderEvent> {
    let text = std::str::from_utf8(line).ok()?;
    let rest = text.strip_prefix(DATA_PREFIX)?;
    if rest == DONE_SENTINEL {
        return Some(ReaderEvent::EndOfStream);
    }
    from_str(rest).ok().map(ReaderEvent::Event)
}

// ============================================================================
// Display buffer
// ============================================================================

/// Accumulates streamed text the way the browser's analysis pane does.
///
/// Text deltas append; an `error` event replaces the whole buffer with the
/// fixed apology. Tool activity and terminal events leave it untouched.
#[derive(Debug, Default)]
pub struct DisplayBuffer {
    text: String,
}

impl DisplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &WireEvent) {
        match event {
            WireEvent::TextDelta { text } => self.text.push_str(text),
            WireEvent::Error { .. } => {
                self.text = ANALYSIS_ERROR_APOLOGY.to_string();
            }
            WireEvent::ToolStart { .. } | WireEvent::ToolProgress { .. } | WireEvent::Done => {}
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_whole_frame() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"text_delta\",\"text\":\"hi\"}\n\n");
        assert_eq!(events, vec![ReaderEvent::Event(WireEvent::text_delta("hi"))]);
    }

    #[test]
    fn reassembles_a_frame_split_mid_json() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"text_del").is_empty());
        let events = decoder.feed(b"ta\",\"text\":\"hi\"}\n\n");
        assert_eq!(events, vec![ReaderEvent::Event(WireEvent::text_delta("hi"))]);
    }

    #[test]
    fn tolerates_multibyte_chars_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        let frame = "data: {\"type\":\"text_delta\",\"text\":\"héllo ⚡\"}\n\n".as_bytes();
        // split inside the two-byte é sequence
        let split = frame.iter().position(|&b| b == 0xc3).unwrap() + 1;
        assert!(decoder.feed(&frame[..split]).is_empty());
        let events = decoder.feed(&frame[split..]);
        assert_eq!(
            events,
            vec![ReaderEvent::Event(WireEvent::text_delta("héllo ⚡"))]
        );
    }

    #[test]
    fn sentinel_is_end_of_stream_not_json() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(b"data: [DONE]\n\n");
        assert_eq!(events, vec![ReaderEvent::EndOfStream]);
    }

    #[test]
    fn malformed_data_lines_are_dropped() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(b"data: {truncated\n").is_empty());
        assert!(decoder.feed(b"data: 42\n").is_empty());
        // invalid UTF-8 inside a line
        assert!(decoder.feed(b"data: \xff\xfe\n").is_empty());
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(
            b": keepalive\nevent: message\ndata: {\"type\":\"done\"}\n\n",
        );
        assert_eq!(events, vec![ReaderEvent::Event(WireEvent::Done)]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(b"data: {\"type\":\"done\"}\r\n\r\n");
        assert_eq!(events, vec![ReaderEvent::Event(WireEvent::Done)]);
    }

    #[test]
    fn several_frames_in_one_chunk_come_out_in_order() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.feed(
            b"data: {\"type\":\"text_delta\",\"text\":\"a\"}\n\n\
              data: {\"type\":\"text_delta\",\"text\":\"b\"}\n\ndata: [DONE]\n\n",
        );
        assert_eq!(
            events,
            vec![
                ReaderEvent::Event(WireEvent::text_delta("a")),
                ReaderEvent::Event(WireEvent::text_delta("b")),
                ReaderEvent::EndOfStream,
            ]
        );
    }

    #[test]
    fn display_buffer_accumulates_deltas() {
        let mut buffer = DisplayBuffer::new();
        buffer.apply(&WireEvent::text_delta("Hello "));
        buffer.apply(&WireEvent::tool_start("WebSearch"));
        buffer.apply(&WireEvent::text_delta("world"));
        buffer.apply(&WireEvent::Done);
        assert_eq!(buffer.text(), "Hello world");
    }

    #[test]
    fn error_event_replaces_buffer_with_apology() {
        let mut buffer = DisplayBuffer::new();
        buffer.apply(&WireEvent::text_delta("half an ans"));
        buffer.apply(&WireEvent::error("Stream error occurred"));
        assert_eq!(buffer.text(), ANALYSIS_ERROR_APOLOGY);

        // a delta arriving after the replacement still appends
        buffer.apply(&WireEvent::text_delta(" more"));
        assert_eq!(
            buffer.text(),
            format!("{ANALYSIS_ERROR_APOLOGY} more")
        );
    }
}

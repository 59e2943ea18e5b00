//! Reframes an arbitrarily chunked `text/event-stream` body into `EventRecord`s.
//!
//! Blocks are separated by a blank line (`\n\n` or `\r\n\r\n`). Within a block,
//! `data:` lines carry the JSON payload; every other line is ignored. Blocks
//! that carry no data, or whose data is not a typed JSON object, are dropped.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::StreamExt as _;
use futures::stream;
use tracing::trace;

use crate::errors::TransportError;
use crate::event::EventRecord;

/// Incremental UTF-8 decoder that holds back a multi-byte sequence split
/// across chunks until its remaining bytes arrive.
#[derive(Debug, Default)]
pub(crate) struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Appends the decodable prefix of `pending + chunk` to `out`. Invalid
    /// sequences become U+FFFD; an incomplete trailing sequence is kept.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);
        let mut rest: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    rest = &rest[rest.len()..];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
    }

    /// Ends the input: a dangling partial sequence decodes to U+FFFD.
    pub fn flush(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            out.push(char::REPLACEMENT_CHARACTER);
            self.pending.clear();
        }
    }
}

/// Per-stream framing state. Build a fresh one for every response body.
#[derive(Debug, Default)]
pub struct StreamFramer {
    decoder: Utf8Decoder,
    buffer: String,
    // Offset before which `buffer` is known to hold no complete delimiter.
    scan_from: usize,
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every record completed by it, in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<EventRecord> {
        self.decoder.decode(chunk, &mut self.buffer);
        let mut records = Vec::new();
        while let Some((idx, delim_len)) = find_block_delimiter(&self.buffer, self.scan_from) {
            let block: String = self.buffer.drain(..idx + delim_len).collect();
            self.scan_from = 0;
            if let Some(record) = parse_block(&block[..idx]) {
                records.push(record);
            }
        }
        // A delimiter is at most four bytes long, so only the last three bytes
        // can start one that is still incomplete.
        self.scan_from = self.buffer.len().saturating_sub(3);
        records
    }

    /// Ends the stream, parsing whatever is left as a final unterminated block.
    pub fn finish(mut self) -> Option<EventRecord> {
        self.decoder.flush(&mut self.buffer);
        if self.buffer.trim().is_empty() {
            return None;
        }
        trace!(
            bytes = self.buffer.len(),
            "parsing unterminated trailing block"
        );
        parse_block(&self.buffer)
    }

    /// Text received but not yet part of a complete block.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}

fn find_block_delimiter(buf: &str, from: usize) -> Option<(usize, usize)> {
    let buf = buf.as_bytes();
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

/// Extracts the `data:` payload of one block and parses it.
pub(crate) fn parse_block(block: &str) -> Option<EventRecord> {
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in block.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data_lines.is_empty() {
        trace!("skipping block without data lines");
        return None;
    }
    let data = data_lines.join("\n");
    let record = EventRecord::parse(&data);
    if record.is_none() {
        trace!(len = data.len(), "skipping malformed event block");
    }
    record
}

/// Lazily reframes a byte stream into records.
///
/// The trailing unterminated block is emitted once the byte stream ends. A read
/// error is yielded after that trailing block and ends the stream.
pub fn record_stream<S>(
    bytes: S,
) -> impl futures::Stream<Item = Result<EventRecord, TransportError>> + Send
where
    S: futures::Stream<Item = Result<Bytes, TransportError>> + Send + Unpin,
{
    struct State<S> {
        bytes: S,
        framer: Option<StreamFramer>,
        pending: VecDeque<EventRecord>,
        error: Option<TransportError>,
    }

    stream::unfold(
        State {
            bytes,
            framer: Some(StreamFramer::new()),
            pending: VecDeque::new(),
            error: None,
        },
        |mut state| async move {
            loop {
                if let Some(record) = state.pending.pop_front() {
                    return Some((Ok(record), state));
                }
                if let Some(err) = state.error.take() {
                    return Some((Err(err), state));
                }
                let framer = state.framer.as_mut()?;
                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(framer.push(&chunk));
                    }
                    Some(Err(err)) => {
                        state.error = Some(err);
                        state
                            .pending
                            .extend(state.framer.take().and_then(StreamFramer::finish));
                    }
                    None => {
                        state
                            .pending
                            .extend(state.framer.take().and_then(StreamFramer::finish));
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;

    fn frame_all(chunks: &[&[u8]]) -> Vec<EventRecord> {
        let mut framer = StreamFramer::new();
        let mut records = Vec::new();
        for chunk in chunks {
            records.extend(framer.push(chunk));
        }
        records.extend(framer.finish());
        records
    }

    fn kinds(records: &[EventRecord]) -> Vec<&str> {
        records.iter().map(|r| r.kind.as_str()).collect()
    }

    #[test]
    fn framer_handles_partial_chunk_boundaries() {
        let mut framer = StreamFramer::new();
        let part1 = b"data: {\"type\":\"ai_delta\",\"delta\":\"hel";
        let part2 = b"lo\"}\n\n";
        assert!(framer.push(part1).is_empty());
        let records = framer.push(part2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].str_field("delta"), Some("hello"));
        assert!(framer.buffered().is_empty());
    }

    #[test]
    fn delimiter_split_across_chunks() {
        let records = frame_all(&[
            b"data: {\"type\":\"workflow_started\"}\n",
            b"\ndata: {\"type\":\"workflow_all_paths_completed\"}\r\n\r",
            b"\n",
        ]);
        assert_eq!(
            kinds(&records),
            vec!["workflow_started", "workflow_all_paths_completed"]
        );
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let body = "data: {\"type\":\"ai_delta\",\"delta\":\"h\u{e9}llo \u{1f600}\"}\n\n";
        let bytes = body.as_bytes();
        let emoji_start = body.find('\u{1f600}').expect("emoji");
        let records = frame_all(&[&bytes[..emoji_start + 2], &bytes[emoji_start + 2..]]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].str_field("delta"), Some("h\u{e9}llo \u{1f600}"));
    }

    #[test]
    fn many_blocks_in_one_chunk_keep_order() {
        let records = frame_all(&[b"data: {\"type\":\"a\"}\n\ndata: {\"type\":\"b\"}\n\ndata: {\"type\":\"c\"}\n\n"]);
        assert_eq!(kinds(&records), vec!["a", "b", "c"]);
    }

    #[test]
    fn skips_malformed_comment_and_unlabelled_blocks() {
        let records = frame_all(&[
            b": keep-alive\n\n",
            b"data: {not json}\n\n",
            b"event: ping\n\n",
            b"{\"type\":\"no_label\"}\n\n",
            b"data: {\"type\":\"workflow_started\"}\n\n",
        ]);
        assert_eq!(kinds(&records), vec!["workflow_started"]);
    }

    #[test]
    fn event_and_id_lines_do_not_hide_data() {
        let records = frame_all(&[b"event: message\nid: 7\ndata: {\"type\":\"workflow_started\"}\n\n"]);
        assert_eq!(kinds(&records), vec!["workflow_started"]);
    }

    #[test]
    fn multiple_data_lines_are_joined() {
        let records = frame_all(&[b"data: {\"type\":\ndata: \"ai_delta\",\"delta\":\"x\"}\n\n"]);
        assert_eq!(kinds(&records), vec!["ai_delta"]);
    }

    #[test]
    fn data_prefix_without_space_is_accepted() {
        let records = frame_all(&[b"data:{\"type\":\"workflow_started\"}\n\n"]);
        assert_eq!(kinds(&records), vec!["workflow_started"]);
    }

    #[test]
    fn finish_recovers_unterminated_final_block() {
        let records = frame_all(&[
            b"data: {\"type\":\"ai_delta\",\"delta\":\"a\"}\n\n",
            b"data: {\"type\":\"workflow_all_paths_completed\"}\n",
        ]);
        assert_eq!(
            kinds(&records),
            vec!["ai_delta", "workflow_all_paths_completed"]
        );
    }

    #[test]
    fn finish_swallows_truncated_garbage() {
        let mut framer = StreamFramer::new();
        assert!(framer.push(b"data: {\"type\":\"ai_del").is_empty());
        assert!(framer.finish().is_none());
        assert!(StreamFramer::new().finish().is_none());
    }

    #[test]
    fn invalid_utf8_becomes_replacement_character() {
        let mut decoder = Utf8Decoder::default();
        let mut out = String::new();
        decoder.decode(b"a\xffb\xe2\x82", &mut out);
        assert_eq!(out, "a\u{fffd}b");
        decoder.decode(b"\xac", &mut out);
        assert_eq!(out, "a\u{fffd}b\u{20ac}");
        decoder.decode(b"\xe2", &mut out);
        decoder.flush(&mut out);
        assert_eq!(out, "a\u{fffd}b\u{20ac}\u{fffd}");
    }

    #[tokio::test]
    async fn record_stream_yields_trailing_block_then_error() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"workflow_started\"}\n\ndata: {\"type\":")),
            Ok(Bytes::from_static(b"\"final_output\",\"content\":\"done\"}")),
            Err(TransportError::new("connection reset")),
            Ok(Bytes::from_static(b"data: {\"type\":\"never_read\"}\n\n")),
        ];
        let items: Vec<_> = record_stream(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().map(|r| r.kind.as_str()), Ok("workflow_started"));
        assert_eq!(items[1].as_ref().map(|r| r.kind.as_str()), Ok("final_output"));
        assert_eq!(items[2], Err(TransportError::new("connection reset")));
    }

    #[tokio::test]
    async fn record_stream_on_empty_body_is_empty() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![Ok(Bytes::new())];
        let items: Vec<_> = record_stream(stream::iter(chunks)).collect().await;
        assert!(items.is_empty());
    }
}

//! Line-oriented decoders for streamed model responses
//!
//! OpenAI-compatible endpoints stream Server-Sent Events, Ollama streams
//! newline-delimited JSON. Both decoders buffer partial lines across chunks
//! so that callers only ever see complete payloads, in arrival order.

use super::{LlmError, TextStream};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::VecDeque;

/// Server-Sent Events (SSE) decoder
///
/// Buffers incoming bytes and extracts complete SSE `data:` payloads.
///
/// # Example
/// ```
/// use prompt_booster::llm::streaming::SseDecoder;
///
/// let mut decoder = SseDecoder::new();
///
/// let payloads = decoder.push(b"data: {\"text\":\"hel");
/// assert!(payloads.is_empty());
///
/// let payloads = decoder.push(b"lo\"}\n\ndata: [DONE]\n\n");
/// assert_eq!(payloads, vec!["{\"text\":\"hello\"}", "[DONE]"]);
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push incoming bytes and extract complete `data:` payloads
    ///
    /// Incomplete events remain buffered for the next `push()` or `finish()`.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        drain_lines(&mut self.buffer)
            .iter()
            .filter_map(|line| data_payload(line))
            .collect()
    }

    /// Flush the final event when the stream ended without a trailing newline
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        String::from_utf8_lossy(&rest)
            .lines()
            .filter_map(data_payload)
            .collect()
    }
}

/// Split off every complete line, leaving a partial one in `buffer`
///
/// Lines are decoded only once their newline has arrived, so a multi-byte
/// character split across network chunks stays intact.
fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(newline_pos) = buffer.iter().position(|b| *b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=newline_pos).collect();
        lines.push(String::from_utf8_lossy(&line).into_owned());
    }
    lines
}

fn data_payload(line: &str) -> Option<String> {
    line.trim()
        .strip_prefix("data:")
        .map(|payload| payload.trim().to_string())
}

/// Newline-delimited JSON decoder (one JSON document per line)
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push incoming bytes and return every complete, non-empty line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        drain_lines(&mut self.buffer)
            .into_iter()
            .filter_map(|line| {
                let line = line.trim();
                (!line.is_empty()).then(|| line.to_string())
            })
            .collect()
    }

    /// Return the trailing line, if the stream ended without a newline
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let rest = rest.trim();
        (!rest.is_empty()).then(|| rest.to_string())
    }
}

/// A decoder that turns raw response bytes into complete payload lines
pub(crate) trait LineDecoder: Send + 'static {
    fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String>;
    fn finish_lines(&mut self) -> Vec<String>;
}

impl LineDecoder for SseDecoder {
    fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        self.push(bytes)
    }

    fn finish_lines(&mut self) -> Vec<String> {
        self.finish()
    }
}

impl LineDecoder for NdjsonDecoder {
    fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        self.push(bytes)
    }

    fn finish_lines(&mut self) -> Vec<String> {
        self.finish().into_iter().collect()
    }
}

/// What a single decoded payload means for the text stream
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    /// A piece of assistant text
    Text(String),
    /// A payload with no text (role headers, keep-alives)
    Skip,
    /// The provider signalled the end of the response
    Done,
}

struct DecodeState<D, F> {
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: D,
    parse: F,
    pending: VecDeque<String>,
    exhausted: bool,
}

/// Turn a raw byte stream into a [`TextStream`] of text deltas in arrival order
pub(crate) fn decode_text_stream<D, F>(
    bytes: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: D,
    parse: F,
) -> TextStream
where
    D: LineDecoder,
    F: Fn(&str) -> Result<Frame, LlmError> + Send + 'static,
{
    let state = DecodeState {
        bytes,
        decoder,
        parse,
        pending: VecDeque::new(),
        exhausted: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(payload) = st.pending.pop_front() {
                match (st.parse)(&payload) {
                    Ok(Frame::Text(text)) => return Some((Ok(text), st)),
                    Ok(Frame::Skip) => continue,
                    Ok(Frame::Done) => return None,
                    Err(e) => {
                        st.pending.clear();
                        st.exhausted = true;
                        return Some((Err(e), st));
                    }
                }
            }

            if st.exhausted {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = st.decoder.push_bytes(&chunk);
                    st.pending.extend(lines);
                }
                Some(Err(e)) => {
                    st.exhausted = true;
                    return Some((Err(LlmError::from_network_error(e)), st));
                }
                None => {
                    st.exhausted = true;
                    let lines = st.decoder.finish_lines();
                    st.pending.extend(lines);
                }
            }
        }
    })
    .boxed()
}

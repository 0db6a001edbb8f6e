use futures::{Stream, StreamExt};

use super::buffering::CircularLineBuffer;
use crate::error::{LlmError, Result};
use crate::streaming::{in_band_error, ChatStreamChunk};

/// What a single SSE line contributes to the event being assembled
enum Line {
    Data(String),
    Dispatch,
    Skip,
}

/// Outcome of decoding one complete SSE event
enum Event {
    Chunk(Result<ChatStreamChunk>),
    Done,
    Empty,
}

/// Decode an SSE byte stream into chat-completion chunks.
///
/// `data:` lines accumulate until the blank line that ends the event and are
/// joined with `\n`; comments and other fields are skipped. `[DONE]` ends the
/// stream, as does the first error.
pub fn decode_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatStreamChunk>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<LlmError> + Send + 'static,
{
    async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = CircularLineBuffer::with_capacity(8192);
        let mut data_lines: Vec<String> = Vec::new();

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(line_result) = buffer.next_line() {
                        let line = match line_result {
                            Ok(line) => line,
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        };

                        match classify(&line) {
                            Line::Data(data) => data_lines.push(data),
                            Line::Skip => {}
                            Line::Dispatch => match decode_event(&take_event(&mut data_lines)) {
                                Event::Chunk(Ok(chunk)) => {
                                    yield Ok(chunk);
                                }
                                Event::Chunk(Err(e)) => {
                                    yield Err(e);
                                    return;
                                }
                                Event::Done => return,
                                Event::Empty => {}
                            },
                        }
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        // The last event may arrive without its terminating blank line
        if let Some(line_result) = buffer.take_remainder() {
            match line_result {
                Ok(line) => {
                    if let Line::Data(data) = classify(&line) {
                        data_lines.push(data);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Event::Chunk(result) = decode_event(&take_event(&mut data_lines)) {
            yield result;
        }
    }
}

fn classify(line: &str) -> Line {
    if line.is_empty() {
        return Line::Dispatch;
    }

    match line.strip_prefix("data:") {
        Some(data) => Line::Data(data.strip_prefix(' ').unwrap_or(data).to_string()),
        None => Line::Skip,
    }
}

fn take_event(data_lines: &mut Vec<String>) -> String {
    std::mem::take(data_lines).join("\n")
}

fn decode_event(data: &str) -> Event {
    let data = data.trim();

    if data.is_empty() {
        return Event::Empty;
    }
    if data == "[DONE]" {
        return Event::Done;
    }
    if let Some(err) = in_band_error(data) {
        return Event::Chunk(Err(err));
    }

    Event::Chunk(
        serde_json::from_str::<ChatStreamChunk>(data)
            .map_err(|e| LlmError::Protocol(format!("Failed to parse chat chunk: {}", e))),
    )
}

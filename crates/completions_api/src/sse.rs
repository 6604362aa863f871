use serde_json::Value;

/// One decoded unit of a streamed response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Monotonically increasing decode-order index within one session.
    pub seq: u64,
    /// Payload text with the `data:` prefix and following spaces stripped.
    pub payload: String,
}

/// Decoder output: either a payload frame or the end-of-stream sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFrame {
    Payload(Frame),
    EndOfStream,
}

/// Incremental frame decoder for chat-completion response bodies.
///
/// Handles both delivery modes the upstream may use: SSE-style `data:` frames
/// separated by blank lines (with or without a space after the prefix), and a
/// single well-formed JSON document when the provider honors a non-streaming
/// request. Framing noise is dropped silently.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: String,
    raw: String,
    next_seq: u64,
    saw_data_line: bool,
    finished: bool,
}

impl SseFrameDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete frames.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<DecodedFrame> {
        if self.finished {
            return Vec::new();
        }

        let text = String::from_utf8_lossy(bytes);
        self.buffer.push_str(&text);
        self.raw.push_str(&text);
        let mut frames = Vec::new();

        while let Some((split, terminator_len)) = find_blank_line(&self.buffer) {
            let block = self.buffer[..split].to_string();
            self.buffer.drain(0..split + terminator_len);
            self.decode_block(&block, &mut frames);
            if self.finished {
                break;
            }
        }

        frames
    }

    /// Flush the decoder at natural transport end-of-stream.
    ///
    /// Processes any trailing block that was never terminated by a blank line,
    /// then applies the whole-body fallback: a response that carried no
    /// recognized `data:` framing anywhere but parses wholesale as one JSON
    /// document is emitted as a single frame. Always ends with the
    /// end-of-stream marker unless `[DONE]` already produced one.
    pub fn finish(&mut self) -> Vec<DecodedFrame> {
        if self.finished {
            return Vec::new();
        }

        let tail = std::mem::take(&mut self.buffer);
        let mut frames = Vec::new();
        if !tail.trim().is_empty() {
            self.decode_block(&tail, &mut frames);
        }

        if !self.finished && !self.saw_data_line {
            let raw = self.raw.trim();
            if !raw.is_empty() && serde_json::from_str::<Value>(raw).is_ok() {
                let frame = self.next_frame(raw.to_string());
                frames.push(DecodedFrame::Payload(frame));
            }
        }

        if !self.finished {
            self.finished = true;
            frames.push(DecodedFrame::EndOfStream);
        }

        frames
    }

    /// Decode a complete body in one shot.
    pub fn decode_all(input: &str) -> Vec<DecodedFrame> {
        let mut decoder = Self::default();
        let mut frames = decoder.feed(input.as_bytes());
        frames.extend(decoder.finish());
        frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty()
    }

    fn decode_block(&mut self, block: &str, frames: &mut Vec<DecodedFrame>) {
        for line in block.lines() {
            let line = line.trim_end_matches('\r');
            let Some(rest) = line.strip_prefix("data:") else {
                continue;
            };

            self.saw_data_line = true;
            let payload = rest.trim_start_matches(' ').trim_end();
            if payload == "[DONE]" {
                self.finished = true;
                frames.push(DecodedFrame::EndOfStream);
                return;
            }
            if payload.is_empty() {
                continue;
            }

            let frame = self.next_frame(payload.to_string());
            frames.push(DecodedFrame::Payload(frame));
        }
    }

    fn next_frame(&mut self, payload: String) -> Frame {
        let seq = self.next_seq;
        self.next_seq += 1;
        Frame { seq, payload }
    }
}

/// Locate the earliest blank-line frame boundary, LF or CRLF framed.
fn find_blank_line(buffer: &str) -> Option<(usize, usize)> {
    let lf = buffer.find("\n\n").map(|index| (index, 2));
    let crlf = buffer.find("\r\n\r\n").map(|index| (index, 4));

    match (lf, crlf) {
        (Some(lf), Some(crlf)) => Some(if crlf.0 < lf.0 { crlf } else { lf }),
        (lf, crlf) => lf.or(crlf),
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodedFrame, SseFrameDecoder};

    #[test]
    fn decodes_frames_incrementally_across_chunk_boundaries() {
        let mut decoder = SseFrameDecoder::default();

        assert!(decoder
            .feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel")
            .is_empty());
        let frames = decoder.feed(b"lo\"}}]}\n\n");
        assert_eq!(frames.len(), 1);
        assert!(matches!(
            &frames[0],
            DecodedFrame::Payload(frame) if frame.seq == 0
        ));
    }

    #[test]
    fn done_sentinel_terminates_and_suppresses_later_frames() {
        let mut decoder = SseFrameDecoder::default();
        let frames = decoder.feed(b"data: [DONE]\n\ndata: {\"late\":true}\n\n");

        assert_eq!(frames, vec![DecodedFrame::EndOfStream]);
        assert!(decoder.is_finished());
        assert!(decoder.feed(b"data: {\"more\":true}\n\n").is_empty());
    }

    #[test]
    fn prefix_without_space_is_equivalent() {
        let spaced = SseFrameDecoder::decode_all("data: {\"a\":1}\n\ndata: [DONE]\n\n");
        let unspaced = SseFrameDecoder::decode_all("data:{\"a\":1}\n\ndata:[DONE]\n\n");

        assert_eq!(spaced, unspaced);
    }

    #[test]
    fn noise_lines_are_dropped_without_error() {
        let frames = SseFrameDecoder::decode_all(
            ": keep-alive\nevent: message\ndata: {\"a\":1}\n\nnot-a-frame\n\n",
        );

        let payloads: Vec<_> = frames
            .iter()
            .filter(|frame| matches!(frame, DecodedFrame::Payload(_)))
            .collect();
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn whole_body_json_short_circuits_to_single_frame() {
        let body = "{\"choices\":[{\"message\":{\"content\":\"hi\"}}]}";
        let frames = SseFrameDecoder::decode_all(body);

        assert_eq!(frames.len(), 2);
        assert!(matches!(
            &frames[0],
            DecodedFrame::Payload(frame) if frame.payload == body
        ));
        assert_eq!(frames[1], DecodedFrame::EndOfStream);
    }

    #[test]
    fn whole_body_fallback_skipped_when_data_framing_was_seen() {
        // A body with one (malformed) data line must not also surface as a
        // whole-document frame.
        let frames = SseFrameDecoder::decode_all("data: {broken\n\n");

        assert_eq!(frames.last(), Some(&DecodedFrame::EndOfStream));
        let payloads = frames
            .iter()
            .filter(|frame| matches!(frame, DecodedFrame::Payload(_)))
            .count();
        assert_eq!(payloads, 1);
    }

    #[test]
    fn trailing_frame_without_blank_line_is_flushed_on_finish() {
        let mut decoder = SseFrameDecoder::default();
        assert!(decoder.feed(b"data: {\"a\":1}").is_empty());

        let frames = decoder.finish();
        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], DecodedFrame::Payload(_)));
        assert_eq!(frames[1], DecodedFrame::EndOfStream);
    }

    #[test]
    fn sequence_indexes_are_monotonic() {
        let frames = SseFrameDecoder::decode_all(
            "data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: {\"c\":3}\n\n",
        );

        let seqs: Vec<u64> = frames
            .iter()
            .filter_map(|frame| match frame {
                DecodedFrame::Payload(frame) => Some(frame.seq),
                DecodedFrame::EndOfStream => None,
            })
            .collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn crlf_bodies_decode_like_lf_bodies() {
        let mut decoder = SseFrameDecoder::default();
        let mut frames = decoder.feed(b"data: {\"a\":1}\r\n\r\ndata: [DONE]\r\n\r\n");
        frames.extend(decoder.finish());

        assert!(matches!(
            &frames[0],
            DecodedFrame::Payload(frame) if frame.payload == "{\"a\":1}"
        ));
        assert!(frames.contains(&DecodedFrame::EndOfStream));
    }
}

use completions_api::{CompletionsApiError, DeltaAssembler, DecodedFrame, SseFrameDecoder};

fn normalize(body: &str) -> Result<String, CompletionsApiError> {
    let mut assembler = DeltaAssembler::default();
    for frame in SseFrameDecoder::decode_all(body) {
        assembler.push(&frame)?;
    }
    assembler.into_text()
}

#[test]
fn spaced_frames_assemble_in_arrival_order() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"World\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    assert_eq!(normalize(body).unwrap(), "Hello World!");
}

#[test]
fn unspaced_frames_assemble_identically() {
    let body = concat!(
        "data:{\"choices\":[{\"delta\":{\"content\":\"Strict \"}}]}\n\n",
        "data:{\"choices\":[{\"delta\":{\"content\":\"JSON \"}}]}\n\n",
        "data:{\"choices\":[{\"delta\":{\"content\":\"Extraction!\"}}]}\n\n",
        "data:[DONE]\n\n",
    );

    assert_eq!(normalize(body).unwrap(), "Strict JSON Extraction!");
}

#[test]
fn buffered_json_document_normalizes_without_framing() {
    let body = "{\"choices\":[{\"message\":{\"content\":\"complete answer\"}}]}";

    assert_eq!(normalize(body).unwrap(), "complete answer");
}

#[test]
fn mixed_delta_and_message_shapes_are_both_accepted() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"first \"}}]}\n\n",
        "data: {\"choices\":[{\"message\":{\"content\":\"second\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    assert_eq!(normalize(body).unwrap(), "first second");
}

#[test]
fn all_noise_body_fails_with_empty_response() {
    let body = "this is not an event stream\nnor is this\n\nstill nothing\n\n";

    assert!(matches!(
        normalize(body),
        Err(CompletionsApiError::EmptyResponse)
    ));
}

#[test]
fn chunk_boundaries_inside_frames_do_not_affect_assembly() {
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"World\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    // Deliver the same body one byte at a time.
    let mut decoder = SseFrameDecoder::default();
    let mut assembler = DeltaAssembler::default();
    for byte in body.as_bytes() {
        for frame in decoder.feed(std::slice::from_ref(byte)) {
            assembler.push(&frame).unwrap();
        }
    }
    for frame in decoder.finish() {
        assembler.push(&frame).unwrap();
    }

    assert!(assembler.is_completed());
    assert_eq!(assembler.into_text().unwrap(), "Hello World!");
}

#[test]
fn done_marker_is_never_surfaced_as_content() {
    let frames = SseFrameDecoder::decode_all("data: [DONE]\n\n");

    assert_eq!(frames, vec![DecodedFrame::EndOfStream]);
}

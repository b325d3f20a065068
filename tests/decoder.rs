//! Stream decoder integration tests
//!
//! Full-stream fixtures in each wire format an endpoint might speak.

use parlance::StreamDecoder;

fn drain(decoder: &mut StreamDecoder, chunks: &[&[u8]]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        for delta in decoder.feed(chunk) {
            out.push_str(&delta);
        }
    }
    for delta in decoder.finish() {
        out.push_str(&delta);
    }
    out
}

#[test]
fn test_openai_sse_stream() {
    let mut decoder = StreamDecoder::new();
    let text = drain(
        &mut decoder,
        &[
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\", world\"}}]}\n\n",
            b"data: [DONE]\n\n",
        ],
    );
    assert_eq!(text, "Hello, world");
}

#[test]
fn test_indexed_quoted_stream() {
    let mut decoder = StreamDecoder::new();
    let text = drain(
        &mut decoder,
        &[
            b"0:\"The answer\"\n",
            b"f:{\"messageId\":\"abc\"}\n",
            b"0:\" is 42.\"\n",
        ],
    );
    assert_eq!(text, "The answer is 42.");
}

#[test]
fn test_plain_prose_stream() {
    let mut decoder = StreamDecoder::new();
    let text = drain(&mut decoder, &[b"Once upon", b" a time.\n"]);
    assert_eq!(text, "Once upon a time.");
}

#[test]
fn test_chunk_split_mid_line_and_mid_codepoint() {
    let mut decoder = StreamDecoder::new();
    // "café" split inside the two-byte é
    let text = drain(
        &mut decoder,
        &[b"data: {\"content\":\"caf\xc3", b"\xa9\"}\n"],
    );
    assert_eq!(text, "caf\u{e9}");
}

#[test]
fn test_escaped_newline_inside_quoted_chunk() {
    let mut decoder = StreamDecoder::new();
    let text = drain(&mut decoder, &[b"0:\"line one\\nline two\"\n"]);
    assert_eq!(text, "line one\nline two");
}

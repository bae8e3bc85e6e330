//! Permessage-deflate decoding against real sync-flushed deflate streams:
//! whole messages, fragmented messages, context take-over in both modes,
//! pass-through rules, and the empty-inflate protocol violation.

use buffer::copied_buffer;
use flate2::{Compress, Compression, FlushCompress};
use pipeline::{EmbeddedChannel, MessageDecoderHandler, ReferenceCounted};
use websocket::{
    FRAME_TAIL, Opcode, PerFrameDeflateDecoder, PerMessageDeflateDecoder, RSV1, WebSocketFrame,
};

type Channel = EmbeddedChannel<MessageDecoderHandler<PerMessageDeflateDecoder>>;

fn channel(no_context: bool) -> Channel {
    EmbeddedChannel::new(PerMessageDeflateDecoder::new(no_context).into_handler())
        .expect("channel")
}

/// Raw-deflate sync flush of `data`, ending on a `00 00 FF FF` block
/// boundary, exactly as a permessage-deflate sender produces it.
fn sync_deflate(compress: &mut Compress, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 256);
    compress
        .compress_vec(data, &mut out, FlushCompress::Sync)
        .expect("compress");
    assert!(out.ends_with(&FRAME_TAIL), "sync flush must end on the block boundary");
    out
}

/// Sender-side trailer strip for a message's final fragment.
fn strip_tail(mut stream: Vec<u8>) -> Vec<u8> {
    assert!(stream.ends_with(&FRAME_TAIL));
    stream.truncate(stream.len() - FRAME_TAIL.len());
    stream
}

fn read_frame(ch: &mut Channel) -> WebSocketFrame {
    ch.read_inbound().expect("decoded frame")
}

fn frame_bytes(frame: &WebSocketFrame) -> Vec<u8> {
    frame.payload.to_vec().expect("payload bytes")
}

#[test]
fn single_message_round_trip() {
    let mut compress = Compress::new(Compression::default(), false);
    let payload = strip_tail(sync_deflate(&mut compress, b"Hello"));

    let mut ch = channel(false);
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Text,
        true,
        RSV1,
        copied_buffer(&payload),
    ))
    .expect("decode");

    let frame = read_frame(&mut ch);
    assert_eq!(frame.opcode, Opcode::Text);
    assert!(frame.final_fragment);
    assert_eq!(frame.rsv, 0, "RSV1 must be cleared on the replacement");
    assert_eq!(frame_bytes(&frame), b"Hello");
    frame.release().expect("release");
}

#[test]
fn fragmented_message_reconstructs_each_part() {
    let mut compress = Compress::new(Compression::default(), false);
    let part1 = sync_deflate(&mut compress, b"first ");
    let part2 = sync_deflate(&mut compress, b"second ");
    let part3 = strip_tail(sync_deflate(&mut compress, b"third"));

    let mut ch = channel(false);
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Text,
        false,
        RSV1,
        copied_buffer(&part1),
    ))
    .expect("first fragment");
    ch.write_inbound(WebSocketFrame::continuation(false, copied_buffer(&part2)))
        .expect("second fragment");
    ch.write_inbound(WebSocketFrame::continuation(true, copied_buffer(&part3)))
        .expect("final fragment");

    let first = read_frame(&mut ch);
    assert_eq!(first.opcode, Opcode::Text);
    assert!(!first.final_fragment);
    assert_eq!(first.rsv, 0);
    assert_eq!(frame_bytes(&first), b"first ");

    let second = read_frame(&mut ch);
    assert_eq!(second.opcode, Opcode::Continuation);
    assert_eq!(frame_bytes(&second), b"second ");

    let third = read_frame(&mut ch);
    assert_eq!(third.opcode, Opcode::Continuation);
    assert!(third.final_fragment);
    assert_eq!(frame_bytes(&third), b"third");

    for frame in [first, second, third] {
        frame.release().expect("release");
    }
}

#[test]
fn context_takeover_reuses_the_window() {
    // The second message references the first through the shared LZ77
    // window, so it only decodes on a decoder that kept the context.
    let mut compress = Compress::new(Compression::default(), false);
    let first = strip_tail(sync_deflate(&mut compress, b"a window full of phrases"));
    let second = strip_tail(sync_deflate(&mut compress, b"a window full of phrases"));
    assert!(second.len() < first.len(), "takeover must shrink the repeat");

    let mut ch = channel(false);
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Text,
        true,
        RSV1,
        copied_buffer(&first),
    ))
    .expect("first message");
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Text,
        true,
        RSV1,
        copied_buffer(&second),
    ))
    .expect("second message");

    assert_eq!(frame_bytes(&read_frame(&mut ch)), b"a window full of phrases");
    assert_eq!(frame_bytes(&read_frame(&mut ch)), b"a window full of phrases");
}

#[test]
fn no_context_matches_fresh_connections() {
    let message = |data: &[u8]| {
        let mut compress = Compress::new(Compression::default(), false);
        strip_tail(sync_deflate(&mut compress, data))
    };
    let first = message(b"independent one");
    let second = message(b"independent two");

    // One connection, no-context mode.
    let mut shared = channel(true);
    shared
        .write_inbound(WebSocketFrame::new(Opcode::Text, true, RSV1, copied_buffer(&first)))
        .expect("first");
    shared
        .write_inbound(WebSocketFrame::new(Opcode::Text, true, RSV1, copied_buffer(&second)))
        .expect("second");
    let shared_out = [
        frame_bytes(&read_frame(&mut shared)),
        frame_bytes(&read_frame(&mut shared)),
    ];

    // Two fresh connections.
    let mut fresh_out = Vec::new();
    for payload in [&first, &second] {
        let mut ch = channel(true);
        ch.write_inbound(WebSocketFrame::new(
            Opcode::Text,
            true,
            RSV1,
            copied_buffer(payload),
        ))
        .expect("fresh decode");
        fresh_out.push(frame_bytes(&read_frame(&mut ch)));
    }

    assert_eq!(shared_out[0], fresh_out[0]);
    assert_eq!(shared_out[1], fresh_out[1]);
    assert_eq!(shared_out[0], b"independent one");
    assert_eq!(shared_out[1], b"independent two");
}

#[test]
fn non_empty_payload_inflating_to_nothing_is_a_protocol_violation() {
    // One byte of a stored-block header: with the restored trailer it forms
    // a complete zero-length block, so bytes went in and nothing came out.
    let mut ch = channel(false);
    let err = ch
        .write_inbound(WebSocketFrame::new(
            Opcode::Text,
            true,
            RSV1,
            copied_buffer(&[0x00]),
        ))
        .expect_err("violation");
    assert_eq!(err.to_string(), "cannot read uncompressed buffer");
}

#[test]
fn uncompressed_frames_pass_through() {
    let mut ch = channel(false);
    ch.write_inbound(WebSocketFrame::text(copied_buffer(b"plain text")))
        .expect("pass-through");
    let frame = read_frame(&mut ch);
    assert_eq!(frame.opcode, Opcode::Text);
    assert_eq!(frame.rsv, 0);
    assert_eq!(frame_bytes(&frame), b"plain text");
}

#[test]
fn control_frames_interleave_mid_message() {
    let mut compress = Compress::new(Compression::default(), false);
    let part1 = sync_deflate(&mut compress, b"long ");
    let part2 = strip_tail(sync_deflate(&mut compress, b"message"));

    let mut ch = channel(false);
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Text,
        false,
        RSV1,
        copied_buffer(&part1),
    ))
    .expect("first fragment");
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Ping,
        true,
        0,
        copied_buffer(b"ping!"),
    ))
    .expect("interleaved ping");
    ch.write_inbound(WebSocketFrame::continuation(true, copied_buffer(&part2)))
        .expect("final fragment");

    assert_eq!(frame_bytes(&read_frame(&mut ch)), b"long ");
    let ping = read_frame(&mut ch);
    assert_eq!(ping.opcode, Opcode::Ping);
    assert_eq!(frame_bytes(&ping), b"ping!");
    assert_eq!(frame_bytes(&read_frame(&mut ch)), b"message");
}

#[test]
fn empty_final_fragment_closes_the_message() {
    let mut compress = Compress::new(Compression::default(), false);
    // The whole message body travels in the first fragment, block boundary
    // included; the sender's final fragment is empty after the strip.
    let part1 = sync_deflate(&mut compress, b"everything up front");

    let mut ch = channel(true);
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Text,
        false,
        RSV1,
        copied_buffer(&part1),
    ))
    .expect("first fragment");
    ch.write_inbound(WebSocketFrame::continuation(
        true,
        buffer::BufAllocator::new().empty(),
    ))
    .expect("empty final fragment");

    assert_eq!(frame_bytes(&read_frame(&mut ch)), b"everything up front");
    let last = read_frame(&mut ch);
    assert!(last.final_fragment);
    assert!(!last.payload.is_readable(), "nothing left to inflate");
}

#[test]
fn initial_continuation_with_rsv1_is_rejected() {
    let mut ch = channel(false);
    let err = ch
        .write_inbound(WebSocketFrame::new(
            Opcode::Continuation,
            true,
            RSV1,
            copied_buffer(&[0x42]),
        ))
        .expect_err("no message in progress");
    assert!(err.to_string().contains("unexpected initial frame type"));
}

#[test]
fn per_frame_decoder_appends_the_tail_to_every_frame() {
    let mut compress = Compress::new(Compression::default(), false);
    let payload = strip_tail(sync_deflate(&mut compress, b"frame unit"));

    let mut ch = EmbeddedChannel::new(PerFrameDeflateDecoder::new(false).into_handler())
        .expect("channel");
    ch.write_inbound(WebSocketFrame::new(
        Opcode::Binary,
        false,
        RSV1,
        copied_buffer(&payload),
    ))
    .expect("non-final frame still ends its own deflate unit");

    let frame = ch.read_inbound().expect("frame");
    assert_eq!(frame.opcode, Opcode::Binary);
    assert_eq!(frame.payload.to_vec().expect("bytes"), b"frame unit");
}

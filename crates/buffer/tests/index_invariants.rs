//! Random operation sequences must preserve the index ordering invariant
//! `0 <= reader_index <= writer_index <= capacity <= max_capacity`.

use buffer::{BufAllocator, ByteBuf};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Write(Vec<u8>),
    Read(usize),
    Skip(usize),
    Discard,
    Clear,
    MarkReader,
    ResetReader,
    EnsureWritable(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(Op::Write),
        (0usize..64).prop_map(Op::Read),
        (0usize..64).prop_map(Op::Skip),
        Just(Op::Discard),
        Just(Op::Clear),
        Just(Op::MarkReader),
        Just(Op::ResetReader),
        (0usize..128).prop_map(Op::EnsureWritable),
    ]
}

fn assert_invariant(buf: &ByteBuf) {
    assert!(buf.reader_index() <= buf.writer_index());
    assert!(buf.writer_index() <= buf.capacity());
    assert!(buf.capacity() <= buf.max_capacity());
}

fn apply(buf: &mut ByteBuf, op: &Op) {
    // Each operation either succeeds or fails without mutating; the
    // invariant must hold either way.
    match op {
        Op::Write(bytes) => {
            let _ = buf.write_bytes(bytes);
        }
        Op::Read(n) => {
            let mut sink = vec![0u8; *n];
            let _ = buf.read_bytes(&mut sink);
        }
        Op::Skip(n) => {
            let _ = buf.skip_bytes(*n);
        }
        Op::Discard => {
            let _ = buf.discard_read_bytes();
        }
        Op::Clear => {
            let _ = buf.clear();
        }
        Op::MarkReader => {
            let _ = buf.mark_reader_index();
        }
        Op::ResetReader => {
            let _ = buf.reset_reader_index();
        }
        Op::EnsureWritable(n) => {
            let _ = buf.ensure_writable(*n);
        }
    }
}

proptest! {
    #[test]
    fn heap_buffer_preserves_index_ordering(
        ops in proptest::collection::vec(op_strategy(), 1..40),
        max in 64usize..512,
    ) {
        let mut buf = BufAllocator::new()
            .buffer_with_max(16, max)
            .expect("bounded buffer");
        for op in &ops {
            apply(&mut buf, op);
            assert_invariant(&buf);
        }
    }

    #[test]
    fn composite_buffer_preserves_index_ordering(
        ops in proptest::collection::vec(op_strategy(), 1..40),
    ) {
        let alloc = BufAllocator::new();
        let mut buf = alloc.composite_buffer();
        buf.add_component(true, buffer::copied_buffer(b"seed bytes"))
            .expect("seed component");
        for op in &ops {
            apply(&mut buf, op);
            assert_invariant(&buf);
        }
    }
}

#[test]
fn slice_window_bounds_its_indices() {
    let buf = buffer::copied_buffer(b"0123456789");
    let mut slice = buf.slice(2, 5).expect("slice");
    assert_invariant(&slice);
    assert_eq!(slice.capacity(), 5);
    assert_eq!(slice.max_capacity(), 5);

    // The window cannot grow past its length.
    slice.set_index(0, 0).expect("rewind");
    assert!(slice.write_bytes(b"too many bytes").is_err());
    assert_invariant(&slice);
    let _ = buf.release();
}

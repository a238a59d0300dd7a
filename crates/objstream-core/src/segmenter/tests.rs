use super::*;
use crate::checksum::{Crc32cHasher, Crc32cValue, NoopHasher};
use bytes::Bytes;
use std::sync::Arc;

fn crc_segmenter(max: usize) -> ChunkSegmenter {
    ChunkSegmenter::new(Arc::new(Crc32cHasher), max)
}

fn buffers(parts: &[&[u8]]) -> Vec<Bytes> {
    parts.iter().map(|p| Bytes::copy_from_slice(p)).collect()
}

fn joined(segments: &[ChunkSegment]) -> Vec<u8> {
    segments.iter().flat_map(|s| s.to_bytes().to_vec()).collect()
}

#[test]
fn empty_chunk_yields_no_segments() {
    let s = crc_segmenter(8);
    assert!(s.segment_buffers(&mut []).is_empty());
    let mut bufs = buffers(&[b"", b""]);
    assert!(s.segment_buffers(&mut bufs).is_empty());
}

#[test]
fn small_chunk_is_one_segment() {
    let s = crc_segmenter(8);
    let mut bufs = buffers(&[b"abc"]);
    let segs = s.segment_buffers(&mut bufs);
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].len(), 3);
    assert_eq!(segs[0].crc32c(), Some(Crc32cValue::of(b"abc")));
}

#[test]
fn exact_multiple_yields_equal_segments() {
    let s = crc_segmenter(4);
    let mut bufs = buffers(&[b"abcdefghijkl"]);
    let segs = s.segment_buffers(&mut bufs);
    assert_eq!(segs.len(), 3);
    assert!(segs.iter().all(|seg| seg.len() == 4));
}

#[test]
fn two_buffers_are_resegmented_across_the_boundary() {
    // 30 + 66 bytes at max 20 -> 20, 20, 20, 20, 16
    let a: Vec<u8> = (0u8..30).collect();
    let b: Vec<u8> = (100u8..166).collect();
    let s = crc_segmenter(20);
    let mut bufs = vec![Bytes::from(a.clone()), Bytes::from(b.clone())];
    let segs = s.segment_buffers(&mut bufs);

    let lens: Vec<usize> = segs.iter().map(|seg| seg.len()).collect();
    assert_eq!(lens, vec![20, 20, 20, 20, 16]);

    // S2 holds the last 10 bytes of A and the first 10 of B.
    assert_eq!(segs[1].parts().len(), 2);
    let mut expected = a[20..].to_vec();
    expected.extend_from_slice(&b[..10]);
    assert_eq!(segs[1].to_bytes().as_ref(), expected.as_slice());
    assert_eq!(segs[1].crc32c(), Some(Crc32cValue::of(&expected)));

    let mut all = a;
    all.extend_from_slice(&b);
    assert_eq!(joined(&segs), all);
}

#[test]
fn many_small_buffers_fill_one_segment() {
    let s = crc_segmenter(10);
    let mut bufs = buffers(&[b"ab", b"cd", b"ef", b"gh", b"ij", b"kl"]);
    let segs = s.segment_buffers(&mut bufs);
    assert_eq!(segs.len(), 2);
    assert_eq!(segs[0].to_bytes().as_ref(), b"abcdefghij");
    assert_eq!(segs[0].parts().len(), 5);
    assert_eq!(segs[0].crc32c(), Some(Crc32cValue::of(b"abcdefghij")));
    assert_eq!(segs[1].to_bytes().as_ref(), b"kl");
}

#[test]
fn one_byte_buffers_merge_into_one_rope() {
    let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
    let mut bufs: Vec<Bytes> = data.iter().map(|b| Bytes::copy_from_slice(&[*b])).collect();
    let origins: Vec<*const u8> = bufs.iter().map(|b| b.as_ptr()).collect();

    let s = crc_segmenter(data.len());
    let segs = s.segment_buffers(&mut bufs);
    assert_eq!(segs.len(), 1);
    let seg = &segs[0];
    assert_eq!(seg.len(), data.len());
    assert_eq!(seg.parts().len(), data.len());
    let ptrs: Vec<*const u8> = seg.parts().iter().map(|p| p.as_ptr()).collect();
    assert_eq!(ptrs, origins);
    assert_eq!(seg.to_bytes().as_ref(), data.as_slice());
    assert_eq!(seg.crc32c(), Some(Crc32cValue::of(&data)));
}

#[test]
fn noop_hasher_keeps_sizing_without_checksums() {
    let hashed = crc_segmenter(3);
    let plain = ChunkSegmenter::new(Arc::new(NoopHasher), 3);
    let mut a = buffers(&[b"abcd", b"efghi"]);
    let mut b = a.clone();
    let with = hashed.segment_buffers(&mut a);
    let without = plain.segment_buffers(&mut b);

    let lens = |segs: &[ChunkSegment]| segs.iter().map(|s| s.len()).collect::<Vec<_>>();
    assert_eq!(lens(&with), lens(&without));
    assert!(without.iter().all(|s| s.crc32c().is_none()));
    assert!(with.iter().all(|s| s.crc32c().is_some()));
}

#[test]
fn input_buffers_are_consumed() {
    let s = crc_segmenter(4);
    let mut bufs = buffers(&[b"hello", b"world"]);
    let _ = s.segment_buffers(&mut bufs);
    assert!(bufs.iter().all(|b| b.is_empty()));
}

#[test]
fn range_only_touches_selected_buffers() {
    let s = crc_segmenter(4);
    let mut bufs = buffers(&[b"skip", b"take", b"this", b"keep"]);
    let segs = s.segment_buffers_range(&mut bufs, 1, 2);
    assert_eq!(joined(&segs), b"takethis".to_vec());
    assert_eq!(bufs[0].as_ref(), b"skip");
    assert_eq!(bufs[3].as_ref(), b"keep");
    assert!(bufs[1].is_empty() && bufs[2].is_empty());
}

#[test]
fn block_alignment_flag() {
    let s = ChunkSegmenter::with_block_size(Arc::new(Crc32cHasher), 8, 4);
    let mut bufs = buffers(&[b"0123456789"]);
    let segs = s.segment_buffers(&mut bufs);
    assert_eq!(segs.len(), 2);
    assert!(segs[0].is_aligned_to_block());
    assert!(!segs[1].is_aligned_to_block());
}

#[test]
fn single_slice_segment_shares_input_memory() {
    let data = Bytes::from(vec![7u8; 16]);
    let origin = data.as_ptr();
    let s = crc_segmenter(32);
    let mut bufs = vec![data];
    let segs = s.segment_buffers(&mut bufs);
    assert_eq!(segs[0].to_bytes().as_ptr(), origin);
}

#[test]
#[should_panic(expected = "max_segment_size must be positive")]
fn zero_max_segment_size_is_rejected() {
    let _ = crc_segmenter(0);
}

#[test]
fn segmenter_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ChunkSegmenter>();
    assert_send_sync::<ChunkSegment>();
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn chunk() -> impl Strategy<Value = Vec<Vec<u8>>> {
        prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8)
    }

    proptest! {
        #[test]
        fn segments_reassemble_input(parts in chunk(), max in 1usize..40) {
            let expected: Vec<u8> = parts.concat();
            let mut bufs: Vec<Bytes> = parts.into_iter().map(Bytes::from).collect();
            let segs = crc_segmenter(max).segment_buffers(&mut bufs);
            prop_assert_eq!(joined(&segs), expected);
        }

        #[test]
        fn only_last_segment_may_be_short(parts in chunk(), max in 1usize..40) {
            let mut bufs: Vec<Bytes> = parts.into_iter().map(Bytes::from).collect();
            let segs = crc_segmenter(max).segment_buffers(&mut bufs);
            if let Some((last, rest)) = segs.split_last() {
                prop_assert!(rest.iter().all(|s| s.len() == max));
                prop_assert!(last.len() > 0 && last.len() <= max);
            }
        }

        #[test]
        fn combined_checksums_match_direct_hash(parts in chunk(), max in 1usize..40) {
            let mut bufs: Vec<Bytes> = parts.into_iter().map(Bytes::from).collect();
            let segs = crc_segmenter(max).segment_buffers(&mut bufs);
            for seg in &segs {
                let direct = Crc32cValue::of(&seg.to_bytes());
                prop_assert_eq!(seg.crc32c(), Some(direct));
            }
        }

        #[test]
        fn segmentation_is_deterministic(parts in chunk(), max in 1usize..40) {
            let s = crc_segmenter(max);
            let mut first: Vec<Bytes> = parts.iter().cloned().map(Bytes::from).collect();
            let mut second = first.clone();
            let a = s.segment_buffers(&mut first);
            let b = s.segment_buffers(&mut second);
            prop_assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(b.iter()) {
                prop_assert_eq!(x.len(), y.len());
                prop_assert_eq!(x.crc32c(), y.crc32c());
                prop_assert_eq!(x.to_bytes(), y.to_bytes());
            }
        }
    }
}

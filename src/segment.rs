//! Cutting the timeline into sequences.

use std::ops::Range;

use crate::time::NormalizedTime;

/// Default gap that ends a sequence.
pub const DEFAULT_CUT_GAP_MS: i64 = 5000;

/// Splits sorted time keys into sequences.
///
/// A new sequence starts at the first key and at every key whose distance to
/// the previous key is at least `cut_gap_ms`. Gaps are measured between
/// consecutive keys regardless of what the keys carry. Returned ranges index
/// into `keys`, are non-empty, contiguous and cover all of it.
pub fn segment(keys: &[NormalizedTime], cut_gap_ms: i64) -> Vec<Range<usize>> {
    let mut sequences: Vec<Range<usize>> = Vec::new();
    let mut previous: Option<NormalizedTime> = None;

    for (i, &key) in keys.iter().enumerate() {
        let starts_new = match previous {
            None => true,
            Some(prev) => key.millis() - prev.millis() >= cut_gap_ms,
        };
        if starts_new {
            if let Some(prev) = previous {
                log::debug!(
                    "{:.1}s gap after {} - starting sequence {}",
                    (key.millis() - prev.millis()) as f64 / 1000.0,
                    prev,
                    sequences.len()
                );
            }
            sequences.push(i..i + 1);
        } else if let Some(current) = sequences.last_mut() {
            current.end = i + 1;
        }
        previous = Some(key);
    }

    sequences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ms: &[i64]) -> Vec<NormalizedTime> {
        ms.iter().copied().map(NormalizedTime).collect()
    }

    #[test]
    fn no_gap_is_one_sequence() {
        assert_eq!(segment(&keys(&[0, 1000, 2000]), 5000), vec![0..3]);
    }

    #[test]
    fn gap_at_threshold_cuts() {
        assert_eq!(
            segment(&keys(&[0, 1000, 2000, 8000, 9000]), 5000),
            vec![0..3, 3..5]
        );
        assert_eq!(segment(&keys(&[0, 5000]), 5000), vec![0..1, 1..2]);
        assert_eq!(segment(&keys(&[0, 4999]), 5000), vec![0..2]);
    }

    #[test]
    fn first_key_opens_a_sequence_even_at_epoch() {
        assert_eq!(segment(&keys(&[0]), 5000), vec![0..1]);
        assert!(segment(&[], 5000).is_empty());
    }

    #[test]
    fn segmentation_is_deterministic() {
        let k = keys(&[10, 20, 9000, 9100, 30_000, 30_500, 31_000, 90_000]);
        let first = segment(&k, 5000);
        assert_eq!(first, segment(&k, 5000));
        assert_eq!(first, vec![0..2, 2..4, 4..7, 7..8]);
    }

    #[test]
    fn ranges_cover_every_key_once() {
        let k = keys(&[0, 100, 7000, 7100, 7200, 20_000]);
        let ranges = segment(&k, 1000);
        let covered: Vec<usize> = ranges.iter().flat_map(|r| r.clone()).collect();
        assert_eq!(covered, (0..k.len()).collect::<Vec<_>>());
    }
}

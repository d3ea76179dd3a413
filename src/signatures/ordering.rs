//! First/last signature selection by signing time.
//!
//! Consecutive annotations are compared pairwise in a single left-to-right
//! sweep and the winner of the last comparable pair is reported. With more
//! than two signatures whose times are not monotonic in discovery order this
//! is not the global extremum; callers rely on the sweep as it is.

use super::annotations::SignatureAnnotation;
use std::cmp::Ordering;

/// Which end of the timeline to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Earliest signing time
    First,
    /// Latest signing time
    Last,
}

/// Picks the first or last signature of a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureOrderer;

impl SignatureOrderer {
    /// Message digest of the winning annotation, raw bytes. Empty when there
    /// are no annotations or no comparable pair.
    pub fn select(annotations: &[SignatureAnnotation], edge: Edge) -> Vec<u8> {
        let digest = |a: &SignatureAnnotation| a.message_digest().unwrap_or_default().to_vec();
        match annotations {
            [] => Vec::new(),
            [only] => digest(only),
            _ => match Self::winner(annotations, edge) {
                Some(index) => digest(&annotations[index]),
                None => {
                    log::debug!("No comparable signing times among {} signatures", annotations.len());
                    Vec::new()
                },
            },
        }
    }

    /// Index chosen by the adjacent-pair sweep.
    pub fn winner(annotations: &[SignatureAnnotation], edge: Edge) -> Option<usize> {
        let mut winner = None;
        for (i, pair) in annotations.windows(2).enumerate() {
            let (Some(a), Some(b)) = (pair[0].signing_time(), pair[1].signing_time()) else {
                continue;
            };
            winner = match (a.cmp(&b), edge) {
                (Ordering::Equal, _) => continue,
                (Ordering::Less, Edge::First) | (Ordering::Greater, Edge::Last) => Some(i),
                (Ordering::Less, Edge::Last) | (Ordering::Greater, Edge::First) => Some(i + 1),
            };
        }
        winner
    }

    /// Digest of the earliest signature.
    pub fn first(annotations: &[SignatureAnnotation]) -> Vec<u8> {
        Self::select(annotations, Edge::First)
    }

    /// Digest of the latest signature.
    pub fn last(annotations: &[SignatureAnnotation]) -> Vec<u8> {
        Self::select(annotations, Edge::Last)
    }
}

//! Encoding selection.
//!
//! Only audio-capable encodings are eligible. Encodings whose mime type names
//! the preferred container family win over the rest; inside the chosen group
//! the highest quality rank is taken, then the largest declared length. Ties
//! keep the source's ordering so identical metadata always yields the same
//! choice.

use std::cmp::Ordering;

use super::error::{ImportError, Result};
use crate::source::{Encoding, ResolvedItem};

pub const DEFAULT_PREFERRED_FAMILY: &str = "mp4";

/// Descending quality order
fn quality_order(a: &Encoding, b: &Encoding) -> Ordering {
    b.quality_rank
        .cmp(&a.quality_rank)
        .then_with(|| b.declared_byte_length.cmp(&a.declared_byte_length))
}

pub fn select_encoding(item: &ResolvedItem, preferred_family: &str) -> Result<Encoding> {
    let with_audio: Vec<&Encoding> = item.encodings.iter().filter(|e| e.has_audio).collect();
    if with_audio.is_empty() {
        return Err(ImportError::NoPlayableFormat);
    }

    let family = preferred_family.to_ascii_lowercase();
    let preferred: Vec<&Encoding> = with_audio
        .iter()
        .copied()
        .filter(|e| !family.is_empty() && e.mime_type.to_ascii_lowercase().contains(&family))
        .collect();

    let candidates = if preferred.is_empty() { with_audio } else { preferred };

    // min_by keeps the first of equal elements, so ties resolve to source order
    candidates
        .into_iter()
        .min_by(|a, b| quality_order(a, b))
        .cloned()
        .ok_or(ImportError::NoPlayableFormat)
}

//! Origin-id remapping across mixed inputs
//!
//! Every input numbers its particles from small integers, so the same origin
//! id means different particles in different inputs. Before a contribution
//! is folded into a digit its origin id is shifted by a per-input offset,
//! which keeps the ids of different inputs disjoint in the merged event.
//!
//! Offsets come either from explicit per-input masks supplied by the
//! orchestrating framework, or from a fixed stride (`stride * input_index`).
//! The policy is chosen once per session. Remapping produces new provenance
//! entries; input records are never modified.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Offset stride between inputs when no masks are given
pub const DEFAULT_OFFSET_STRIDE: i64 = 10_000_000;

/// Largest remapped origin id accepted without a warning.
///
/// Downstream consumers store particle ids as 32-bit integers.
pub const PROVENANCE_BOUND: i64 = i32::MAX as i64;

/// How per-input offsets are chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// Offset of input `i` is `masks[i]`
    Masks { masks: Vec<i64> },

    /// Offset of input `i` is `stride * i`
    Stride { stride: i64 },
}

/// Result of remapping one origin id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remapped {
    pub origin_id: i64,

    /// The raw id left its input's offset space or the remapped id exceeds
    /// [`PROVENANCE_BOUND`]
    pub overflow: bool,
}

/// Assigns each input a disjoint origin-id offset space
#[derive(Debug, Clone, PartialEq)]
pub struct ProvenanceRemapper {
    policy: OffsetPolicy,
}

impl ProvenanceRemapper {
    /// Offsets from explicit per-input masks
    ///
    /// # Errors
    ///
    /// Masks must be non-empty, non-negative and distinct.
    pub fn from_masks(masks: Vec<i64>) -> Result<Self> {
        if masks.is_empty() {
            return Err(Error::Configuration("mask list is empty".to_string()));
        }
        if masks.iter().any(|m| *m < 0) {
            return Err(Error::Configuration("masks must be non-negative".to_string()));
        }
        let mut sorted = masks.clone();
        sorted.sort_unstable();
        if sorted.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::Configuration("masks must be distinct".to_string()));
        }
        Ok(Self {
            policy: OffsetPolicy::Masks { masks },
        })
    }

    /// Offsets `stride * input_index`
    pub fn with_stride(stride: i64) -> Result<Self> {
        if stride <= 0 {
            return Err(Error::Configuration(format!(
                "offset stride must be positive, got {}",
                stride
            )));
        }
        Ok(Self {
            policy: OffsetPolicy::Stride { stride },
        })
    }

    /// Masks when given, otherwise the default stride
    pub fn for_masks(masks: Option<Vec<i64>>) -> Result<Self> {
        match masks {
            Some(masks) => Self::from_masks(masks),
            None => Ok(Self::default()),
        }
    }

    pub fn policy(&self) -> &OffsetPolicy {
        &self.policy
    }

    /// Number of inputs this remapper can serve (`None` = unlimited)
    pub fn capacity(&self) -> Option<usize> {
        match &self.policy {
            OffsetPolicy::Masks { masks } => Some(masks.len()),
            OffsetPolicy::Stride { .. } => None,
        }
    }

    /// Offset added to every origin id of input `source_index`
    pub fn offset_for(&self, source_index: usize) -> Result<i64> {
        match &self.policy {
            OffsetPolicy::Masks { masks } => masks.get(source_index).copied().ok_or_else(|| {
                Error::Configuration(format!(
                    "no mask for input {} ({} masks given)",
                    source_index,
                    masks.len()
                ))
            }),
            OffsetPolicy::Stride { stride } => i64::try_from(source_index)
                .ok()
                .and_then(|i| stride.checked_mul(i))
                .ok_or_else(|| {
                    Error::Configuration(format!("offset of input {} overflows", source_index))
                }),
        }
    }

    /// Number of raw origin ids an input starting at `offset` can use before
    /// running into another input's offset space
    fn span_for(&self, offset: i64) -> i64 {
        match &self.policy {
            OffsetPolicy::Masks { masks } => masks
                .iter()
                .filter(|m| **m > offset)
                .min()
                .map(|next| next - offset)
                .unwrap_or_else(|| PROVENANCE_BOUND.saturating_sub(offset).max(1)),
            OffsetPolicy::Stride { stride } => *stride,
        }
    }

    /// Shift `origin_id` of input `source_index` into its offset space
    pub fn remap(&self, source_index: usize, origin_id: i64) -> Result<Remapped> {
        let offset = self.offset_for(source_index)?;
        let span = self.span_for(offset);

        let (remapped, wrapped) = match offset.checked_add(origin_id) {
            Some(id) => (id, false),
            None => (offset.saturating_add(origin_id), true),
        };

        let overflow =
            wrapped || origin_id < 0 || origin_id >= span || remapped > PROVENANCE_BOUND;

        Ok(Remapped {
            origin_id: remapped,
            overflow,
        })
    }
}

impl Default for ProvenanceRemapper {
    fn default() -> Self {
        Self {
            policy: OffsetPolicy::Stride {
                stride: DEFAULT_OFFSET_STRIDE,
            },
        }
    }
}

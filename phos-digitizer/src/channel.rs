//! Channel table
//!
//! Channels are numbered from 1 and split into contiguous classes laid out
//! back to back in ascending order (EMC crystals first, then CPV pads).
//! The table is built once per session and never changes afterwards.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Absolute channel identifier (1-based)
pub type ChannelId = u32;

/// A contiguous, named range of channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelClass {
    /// Class name (e.g. "EMC")
    pub name: String,

    /// First channel of the class
    pub first: ChannelId,

    /// Last channel of the class (inclusive)
    pub last: ChannelId,
}

impl ChannelClass {
    /// Number of channels in the class
    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    /// Always false; classes are never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn range(&self) -> RangeInclusive<ChannelId> {
        self.first..=self.last
    }

    pub fn contains(&self, channel: ChannelId) -> bool {
        self.range().contains(&channel)
    }
}

/// Ordered set of channel classes covering `[1, total]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    classes: Vec<ChannelClass>,
}

impl ChannelTable {
    /// Lay classes out back to back starting at channel 1
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the list is empty, a class has no
    /// channels, a name repeats, or the total overflows the channel id type.
    pub fn from_counts<S: AsRef<str>>(counts: &[(S, u32)]) -> Result<Self> {
        if counts.is_empty() {
            return Err(Error::Configuration(
                "channel table needs at least one class".to_string(),
            ));
        }

        let mut classes: Vec<ChannelClass> = Vec::with_capacity(counts.len());
        let mut next: ChannelId = 1;

        for (name, count) in counts {
            let name = name.as_ref();
            if *count == 0 {
                return Err(Error::Configuration(format!("class '{}' has no channels", name)));
            }
            if classes.iter().any(|c| c.name == name) {
                return Err(Error::Configuration(format!("duplicate channel class '{}'", name)));
            }
            let last = next
                .checked_add(count - 1)
                .ok_or_else(|| Error::Configuration("channel table too large".to_string()))?;
            classes.push(ChannelClass {
                name: name.to_string(),
                first: next,
                last,
            });
            next = last
                .checked_add(1)
                .ok_or_else(|| Error::Configuration("channel table too large".to_string()))?;
        }

        Ok(Self { classes })
    }

    /// Classes in ascending channel order
    pub fn classes(&self) -> &[ChannelClass] {
        &self.classes
    }

    /// Look up a class by name
    pub fn class(&self, name: &str) -> Option<&ChannelClass> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Index of the class holding `channel`
    pub fn class_index_of(&self, channel: ChannelId) -> Option<usize> {
        // Classes are sorted and contiguous
        let idx = self.classes.partition_point(|c| c.last < channel);
        self.classes
            .get(idx)
            .filter(|c| c.contains(channel))
            .map(|_| idx)
    }

    /// Highest channel id in the table
    pub fn last_channel(&self) -> ChannelId {
        self.classes.last().map(|c| c.last).unwrap_or(0)
    }

    /// Total number of channels
    pub fn total_channels(&self) -> usize {
        self.last_channel() as usize
    }
}

//! Contribution streams
//!
//! A [`ContributionStream`] is a read-only cursor over one input's summable
//! digits for the current event. Records must be sorted by channel; several
//! consecutive records may share a channel (several particles hitting the
//! same cell). Ordering is checked once, when the stream is built, so an
//! unsorted input is rejected before any digit is produced.

use crate::channel::ChannelId;
use crate::digit::ContributionRecord;
use crate::error::{Error, Result};
use std::ops::RangeInclusive;

/// Cursor over one input's channel-ordered contribution records
#[derive(Debug, Clone)]
pub struct ContributionStream<'a> {
    source_index: usize,
    records: &'a [ContributionRecord],
    cursor: usize,
}

impl<'a> ContributionStream<'a> {
    /// Wrap `records` after checking ordering and values
    ///
    /// # Errors
    ///
    /// - [`Error::StreamOrdering`] when a channel id decreases or is 0
    /// - [`Error::InvalidRecord`] for non-finite or negative amplitudes and
    ///   non-finite times
    pub fn new(source_index: usize, records: &'a [ContributionRecord]) -> Result<Self> {
        let mut previous: ChannelId = 0;

        for (position, record) in records.iter().enumerate() {
            if record.channel == 0 {
                return Err(Error::StreamOrdering {
                    source_index,
                    detail: format!("record {} has channel 0", position),
                });
            }
            if record.channel < previous {
                return Err(Error::StreamOrdering {
                    source_index,
                    detail: format!(
                        "record {} has channel {} after channel {}",
                        position, record.channel, previous
                    ),
                });
            }
            if !record.amplitude.is_finite() || record.amplitude < 0.0 {
                return Err(Error::InvalidRecord {
                    source_index,
                    position,
                    detail: format!("amplitude {} is not a finite non-negative value", record.amplitude),
                });
            }
            if !record.time.is_finite() {
                return Err(Error::InvalidRecord {
                    source_index,
                    position,
                    detail: format!("time {} is not finite", record.time),
                });
            }
            previous = record.channel;
        }

        Ok(Self {
            source_index,
            records,
            cursor: 0,
        })
    }

    /// Index of the input this stream reads
    pub fn source_index(&self) -> usize {
        self.source_index
    }

    /// Channel of the next unread record, `None` once exhausted
    pub fn peek_channel_id(&self) -> Option<ChannelId> {
        self.records.get(self.cursor).map(|r| r.channel)
    }

    /// Take the next record only if it belongs to `channel`
    pub fn take_if(&mut self, channel: ChannelId) -> Option<&'a ContributionRecord> {
        let records = self.records;
        let record = records.get(self.cursor)?;
        if record.channel != channel {
            return None;
        }
        self.cursor += 1;
        Some(record)
    }

    /// Take every consecutive record belonging to `channel`
    pub fn drain_channel(&mut self, channel: ChannelId) -> &'a [ContributionRecord] {
        let start = self.cursor;
        while self.take_if(channel).is_some() {}
        let records = self.records;
        &records[start..self.cursor]
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.records.len()
    }

    /// Unread records
    pub fn remaining(&self) -> usize {
        self.records.len() - self.cursor
    }

    /// Number of records (read or not) falling in `range`
    pub fn count_in(&self, range: &RangeInclusive<ChannelId>) -> usize {
        let lo = self.records.partition_point(|r| r.channel < *range.start());
        let hi = self.records.partition_point(|r| r.channel <= *range.end());
        hi.saturating_sub(lo)
    }
}

//! Channel-to-device mapping
//!
//! A stream's channels map onto a contiguous run of device channels in one
//! 64-channel bank. The run is described by its start and length; the map
//! type never holds a run that overflows the bank.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::constants::MAX_DEVICE_CHANNELS;
use crate::error::CalcError;

/// Ordered device-channel indices of a stream, contiguous and ascending
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct ChannelMap(Vec<u8>);

impl ChannelMap {
    /// Build `[start, start + 1, .., start + count - 1]`
    pub fn contiguous(count: usize, start: usize) -> Result<Self, CalcError> {
        check_count(count)?;
        if start > MAX_DEVICE_CHANNELS - count {
            return Err(CalcError::MapOverflow {
                start,
                count,
                limit: MAX_DEVICE_CHANNELS,
            });
        }

        Ok(Self((start..start + count).map(|c| c as u8).collect()))
    }

    /// Accept an explicit index list only if it is already a valid map
    pub fn from_indices(indices: Vec<u8>) -> Result<Self, CalcError> {
        let start = indices
            .first()
            .copied()
            .ok_or(CalcError::InvalidChannelCount(0))?;
        let map = Self::contiguous(indices.len(), start as usize)?;
        if map.0 != indices {
            return Err(CalcError::NonContiguousMap(indices));
        }
        Ok(map)
    }

    /// Coerce an arbitrary index list into a map of the same length,
    /// anchored at its first element and clipped to the bank
    pub fn anchored(indices: &[u8]) -> Result<Self, CalcError> {
        let count = indices.len();
        check_count(count)?;
        let first = indices.first().copied().unwrap_or(0) as usize;
        Self::contiguous(count, first.min(MAX_DEVICE_CHANNELS - count))
    }

    /// Default stereo pair for stream `id`: `2 * id` and the channel after it,
    /// wrapped into the bank
    pub fn stereo_pair(id: u8) -> Self {
        let start = ((usize::from(id) * 2) % MAX_DEVICE_CHANNELS) as u8;
        Self(vec![start, start + 1])
    }

    /// First device channel
    pub fn start(&self) -> usize {
        self.0.first().copied().unwrap_or(0) as usize
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed map
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Same length, new start
    pub fn with_start(&self, start: usize) -> Result<Self, CalcError> {
        Self::contiguous(self.len(), start)
    }

    /// New length, anchored at the current start when it fits
    pub fn resized(&self, count: usize) -> Result<Self, CalcError> {
        resize_channel_map(self, count)
    }
}

impl TryFrom<Vec<u8>> for ChannelMap {
    type Error = CalcError;

    fn try_from(indices: Vec<u8>) -> Result<Self, Self::Error> {
        Self::from_indices(indices)
    }
}

impl From<ChannelMap> for Vec<u8> {
    fn from(map: ChannelMap) -> Self {
        map.0
    }
}

/// Contiguous map of `count` channels starting at `start`
pub fn channel_map(count: usize, start: usize) -> Result<ChannelMap, CalcError> {
    ChannelMap::contiguous(count, start)
}

/// Start offsets a map of `count` channels may use
pub fn start_offsets(count: usize) -> Result<RangeInclusive<usize>, CalcError> {
    check_count(count)?;
    Ok(0..=MAX_DEVICE_CHANNELS - count)
}

/// Resize `previous` to `count` channels.
///
/// The first element is kept when the new tail still fits in the bank;
/// otherwise the start is clipped to `64 - count`.
pub fn resize_channel_map(previous: &ChannelMap, count: usize) -> Result<ChannelMap, CalcError> {
    let offsets = start_offsets(count)?;
    ChannelMap::contiguous(count, previous.start().min(*offsets.end()))
}

fn check_count(count: usize) -> Result<(), CalcError> {
    if count == 0 || count > MAX_DEVICE_CHANNELS {
        return Err(CalcError::InvalidChannelCount(count));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_contiguous_map() {
        let map = channel_map(4, 10).unwrap();
        assert_eq!(map.as_slice(), &[10, 11, 12, 13]);
        assert_eq!(map.start(), 10);
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_overflow_rejected() {
        assert_eq!(
            channel_map(4, 62),
            Err(CalcError::MapOverflow {
                start: 62,
                count: 4,
                limit: 64
            })
        );
        assert!(channel_map(4, 60).is_ok());
        assert!(channel_map(1, 63).is_ok());
    }

    #[test]
    fn test_huge_start_rejected() {
        assert_eq!(
            channel_map(4, usize::MAX),
            Err(CalcError::MapOverflow {
                start: usize::MAX,
                count: 4,
                limit: 64
            })
        );
        assert!(channel_map(64, usize::MAX - 63).is_err());
        assert!(channel_map(1, 64).is_err());
    }

    #[test]
    fn test_invalid_counts() {
        assert_eq!(channel_map(0, 0), Err(CalcError::InvalidChannelCount(0)));
        assert_eq!(channel_map(65, 0), Err(CalcError::InvalidChannelCount(65)));
        assert!(channel_map(64, 0).is_ok());
    }

    #[test]
    fn test_start_offsets() {
        assert_eq!(start_offsets(1).unwrap(), 0..=63);
        assert_eq!(start_offsets(8).unwrap(), 0..=56);
        assert_eq!(start_offsets(64).unwrap(), 0..=0);
        assert!(start_offsets(0).is_err());
    }

    #[test]
    fn test_resize_keeps_anchor() {
        let map = channel_map(2, 10).unwrap();
        assert_eq!(map.resized(6).unwrap().as_slice(), &[10, 11, 12, 13, 14, 15]);
        assert_eq!(map.resized(1).unwrap().as_slice(), &[10]);
    }

    #[test]
    fn test_resize_clips_tail() {
        let map = channel_map(2, 60).unwrap();
        let grown = map.resized(8).unwrap();
        assert_eq!(grown.start(), 56);
        assert_eq!(grown.as_slice().last(), Some(&63));
    }

    #[test]
    fn test_from_indices() {
        assert!(ChannelMap::from_indices(vec![4, 5, 6]).is_ok());
        assert_eq!(
            ChannelMap::from_indices(vec![0, 2]),
            Err(CalcError::NonContiguousMap(vec![0, 2]))
        );
        assert_eq!(
            ChannelMap::from_indices(vec![]),
            Err(CalcError::InvalidChannelCount(0))
        );
    }

    #[test]
    fn test_anchored_normalizes() {
        let map = ChannelMap::anchored(&[6, 3, 9]).unwrap();
        assert_eq!(map.as_slice(), &[6, 7, 8]);

        let map = ChannelMap::anchored(&[63, 0]).unwrap();
        assert_eq!(map.as_slice(), &[62, 63]);
    }

    #[test]
    fn test_serde_rejects_broken_map() {
        let map: ChannelMap = serde_json::from_str("[2, 3]").unwrap();
        assert_eq!(serde_json::to_string(&map).unwrap(), "[2,3]");
        assert!(serde_json::from_str::<ChannelMap>("[3, 2]").is_err());
        assert!(serde_json::from_str::<ChannelMap>("[]").is_err());
    }

    proptest! {
        #[test]
        fn prop_resize_stays_in_bank(
            count in 1usize..=64,
            start_seed in 0usize..64,
            new_count in 1usize..=64,
        ) {
            let start = start_seed.min(64 - count);
            let map = channel_map(count, start).unwrap();
            let resized = map.resized(new_count).unwrap();

            prop_assert_eq!(resized.len(), new_count);
            prop_assert!(resized.start() + new_count <= 64);
            if start + new_count <= 64 {
                prop_assert_eq!(resized.start(), start);
            } else {
                prop_assert_eq!(resized.start(), 64 - new_count);
            }
            prop_assert!(resized.as_slice().windows(2).all(|w| w[1] == w[0] + 1));
        }
    }
}

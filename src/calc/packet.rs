//! Packet sizing
//!
//! One RTP packet must carry the full multi-channel frame block for
//! `max_samples_per_packet` samples without exceeding the payload budget.

use serde::Serialize;

use crate::calc::rate::{ClockContext, SampleRate};
use crate::constants::{MAX_DEVICE_CHANNELS, MAX_PACKET_SIZE, SAMPLES_PER_PACKET_CANDIDATES};
use crate::error::CalcError;
use crate::protocol::Codec;

/// One entry of the samples-per-packet selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PacketSizeOption {
    pub samples: u32,
    /// Disabled options stay listed but cannot be selected
    pub allowed: bool,
}

/// Whether `candidate` fits the clock's packet timing ceiling
pub fn is_samples_per_packet_allowed(
    candidate: u32,
    tic_frame_size_at_1fs: u32,
    rate: SampleRate,
) -> bool {
    u64::from(candidate) <= u64::from(tic_frame_size_at_1fs) * u64::from(rate.frame_multiplier())
}

/// Every candidate packet size, flagged against the clock
pub fn packet_size_options(clock: &ClockContext) -> Vec<PacketSizeOption> {
    SAMPLES_PER_PACKET_CANDIDATES
        .iter()
        .map(|&samples| PacketSizeOption {
            samples,
            allowed: clock.allows(samples),
        })
        .collect()
}

/// Maximum channel count for `codec` at `samples_per_packet` within the
/// default payload budget
pub fn max_channels(codec: Codec, samples_per_packet: u32) -> Result<usize, CalcError> {
    max_channels_within(codec, samples_per_packet, MAX_PACKET_SIZE)
}

/// Maximum channel count within `max_packet_bytes`, clamped to one device bank
pub fn max_channels_within(
    codec: Codec,
    samples_per_packet: u32,
    max_packet_bytes: usize,
) -> Result<usize, CalcError> {
    if samples_per_packet == 0 {
        return Err(CalcError::InvalidArgument(
            "max_samples_per_packet must be positive".to_string(),
        ));
    }

    let frame_bytes = u64::from(samples_per_packet) * codec.bytes_per_sample() as u64;
    let channels = max_packet_bytes as u64 / frame_bytes;

    Ok(channels.min(MAX_DEVICE_CHANNELS as u64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_max_channels_examples() {
        assert_eq!(max_channels(Codec::L16, 48).unwrap(), 15);
        assert_eq!(max_channels(Codec::L24, 48).unwrap(), 10);
        assert_eq!(max_channels(Codec::AM824, 48).unwrap(), 10);
        assert_eq!(max_channels(Codec::L16, 192).unwrap(), 3);
        assert_eq!(max_channels(Codec::L24, 192).unwrap(), 2);
    }

    #[test]
    fn test_max_channels_clamped_to_bank() {
        // 1440 / 12 = 120 before clamping
        assert_eq!(max_channels(Codec::L16, 6).unwrap(), 64);
        assert_eq!(max_channels(Codec::L24, 6).unwrap(), 64);
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert!(matches!(
            max_channels(Codec::L16, 0),
            Err(CalcError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_custom_budget() {
        assert_eq!(max_channels_within(Codec::L16, 48, 960).unwrap(), 10);
        assert_eq!(max_channels_within(Codec::L24, 48, 0).unwrap(), 0);
    }

    #[test]
    fn test_options_at_192k() {
        let clock = ClockContext::new(SampleRate::Hz192000, 48).unwrap();
        assert_eq!(clock.frame_multiplier(), 4);
        assert_eq!(clock.max_samples_per_packet(), 192);

        let options = packet_size_options(&clock);
        assert_eq!(options.len(), SAMPLES_PER_PACKET_CANDIDATES.len());
        assert!(options.iter().all(|o| o.allowed));
    }

    #[test]
    fn test_options_at_48k() {
        let clock = ClockContext::new(SampleRate::Hz48000, 48).unwrap();
        let disabled: Vec<u32> = packet_size_options(&clock)
            .into_iter()
            .filter(|o| !o.allowed)
            .map(|o| o.samples)
            .collect();

        assert_eq!(disabled, vec![96, 192]);
        assert!(is_samples_per_packet_allowed(48, 48, SampleRate::Hz48000));
        assert!(!is_samples_per_packet_allowed(96, 48, SampleRate::Hz48000));
    }

    proptest! {
        #[test]
        fn prop_max_channels_fits_budget(
            samples in 1u32..=4096,
            codec in prop::sample::select(Codec::ALL.to_vec()),
        ) {
            let n = max_channels(codec, samples).unwrap();
            let frame = samples as usize * codec.bytes_per_sample();

            prop_assert!(n <= MAX_DEVICE_CHANNELS);
            prop_assert!(n * frame <= MAX_PACKET_SIZE);
            if n < MAX_DEVICE_CHANNELS {
                prop_assert!((n + 1) * frame > MAX_PACKET_SIZE);
            }
        }

        #[test]
        fn prop_allowed_matches_clock(
            candidate in 0u32..2048,
            tic in 1u32..=192,
            rate in prop::sample::select(SampleRate::ALL.to_vec()),
        ) {
            let clock = ClockContext::new(rate, tic).unwrap();
            prop_assert_eq!(
                is_samples_per_packet_allowed(candidate, tic, rate),
                clock.allows(candidate)
            );
        }
    }
}

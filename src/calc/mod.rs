//! Channel-map and packet-sizing calculator
//!
//! Pure functions the edit forms call after every relevant field change.
//! Nothing here holds state between calls.

pub mod channel_map;
pub mod packet;
pub mod rate;

pub use channel_map::{channel_map, resize_channel_map, start_offsets, ChannelMap};
pub use packet::{
    is_samples_per_packet_allowed, max_channels, max_channels_within, packet_size_options,
    PacketSizeOption,
};
pub use rate::{normalized_frame_multiplier, ClockContext, RatePolicy, SampleRate};

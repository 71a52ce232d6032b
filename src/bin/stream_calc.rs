//! Stream sizing calculator
//!
//! Prints the packet-size choices, channel ceiling and channel map for a
//! clock and codec.
//!
//! Usage: `stream-calc <sample_rate> <tic_frame_size_at_1fs> <codec> [channels] [start]`

use anyhow::{bail, Context, Result};

use aes67_console::calc::{channel_map, max_channels, packet_size_options, ClockContext, RatePolicy};
use aes67_console::protocol::Codec;

fn arg<T>(args: &[String], index: usize, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    args.get(index)
        .map(|value| value.parse::<T>().with_context(|| format!("invalid {}: {}", name, value)))
        .transpose()
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: stream-calc <sample_rate> <tic_frame_size_at_1fs> <codec> [channels] [start]");
    }

    let sample_rate: u32 = arg(&args, 0, "sample rate")?.unwrap_or_default();
    let tic: u32 = arg(&args, 1, "tic frame size")?.unwrap_or_default();
    let codec: Codec = arg(&args, 2, "codec")?.unwrap_or_default();

    let clock = ClockContext::resolve(sample_rate, tic, RatePolicy::Reject)?;

    println!("\n=== Clock ===");
    println!("  Sample rate:       {} Hz", clock.sample_rate());
    println!("  Frame multiplier:  {}", clock.frame_multiplier());
    println!("  Max samples/packet {}", clock.max_samples_per_packet());

    println!("\n=== Samples per packet ({}) ===", codec);
    for option in packet_size_options(&clock) {
        let marker = if option.allowed { "" } else { " [DISABLED]" };
        println!(
            "  {:>4} samples: up to {:>2} channels{}",
            option.samples,
            max_channels(codec, option.samples)?,
            marker
        );
    }

    if let Some(count) = arg::<usize>(&args, 3, "channel count")? {
        let start = arg::<usize>(&args, 4, "start offset")?.unwrap_or(0);
        let map = channel_map(count, start)?;
        println!("\n=== Channel map ===");
        println!("  {:?}", map.as_slice());
    }
    println!();

    Ok(())
}

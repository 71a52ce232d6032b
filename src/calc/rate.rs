//! Sample rates and packet timing scale
//!
//! Packet timing budgets are configured at 1x base rate (the 44.1/48 kHz
//! family) as `tic_frame_size_at_1fs`. At higher rates the same budget holds
//! proportionally more samples, so the ceiling is scaled by the rate's
//! frame multiplier.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::error::CalcError;
use crate::protocol::DaemonConfig;

/// Sample rates the daemon can run at
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz88200,
    Hz96000,
    Hz176400,
    Hz192000,
    Hz352800,
    Hz384000,
}

impl SampleRate {
    /// All supported rates, ascending
    pub const ALL: [SampleRate; 8] = [
        SampleRate::Hz44100,
        SampleRate::Hz48000,
        SampleRate::Hz88200,
        SampleRate::Hz96000,
        SampleRate::Hz176400,
        SampleRate::Hz192000,
        SampleRate::Hz352800,
        SampleRate::Hz384000,
    ];

    pub const fn hz(self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz48000 => 48_000,
            SampleRate::Hz88200 => 88_200,
            SampleRate::Hz96000 => 96_000,
            SampleRate::Hz176400 => 176_400,
            SampleRate::Hz192000 => 192_000,
            SampleRate::Hz352800 => 352_800,
            SampleRate::Hz384000 => 384_000,
        }
    }

    /// Oversampling factor relative to the 44.1/48 kHz base family
    pub const fn frame_multiplier(self) -> u32 {
        match self {
            SampleRate::Hz44100 | SampleRate::Hz48000 => 1,
            SampleRate::Hz88200 | SampleRate::Hz96000 => 2,
            SampleRate::Hz176400 | SampleRate::Hz192000 => 4,
            SampleRate::Hz352800 | SampleRate::Hz384000 => 8,
        }
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = CalcError;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        SampleRate::ALL
            .into_iter()
            .find(|rate| rate.hz() == hz)
            .ok_or(CalcError::UnsupportedSampleRate(hz))
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        rate.hz()
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

/// What to do with a sample rate outside [`SampleRate::ALL`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatePolicy {
    /// Fail with `UnsupportedSampleRate`
    #[default]
    Reject,
    /// Treat the rate as base family (multiplier 1) and log a warning
    DegradeToBase,
}

/// Frame multiplier for a raw rate in Hz.
///
/// Unknown rates are an error; use [`ClockContext::resolve`] with
/// [`RatePolicy::DegradeToBase`] for the permissive behaviour.
pub fn normalized_frame_multiplier(hz: u32) -> Result<u32, CalcError> {
    Ok(SampleRate::try_from(hz)?.frame_multiplier())
}

/// Clock parameters an edit form is opened with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockContext {
    sample_rate: u32,
    tic_frame_size_at_1fs: u32,
    frame_multiplier: u32,
}

impl ClockContext {
    /// Create a context for a supported rate
    pub fn new(rate: SampleRate, tic_frame_size_at_1fs: u32) -> Result<Self, CalcError> {
        check_tic_frame_size(tic_frame_size_at_1fs)?;
        Ok(Self {
            sample_rate: rate.hz(),
            tic_frame_size_at_1fs,
            frame_multiplier: rate.frame_multiplier(),
        })
    }

    /// Create a context from raw values, applying `policy` to unknown rates
    pub fn resolve(
        sample_rate: u32,
        tic_frame_size_at_1fs: u32,
        policy: RatePolicy,
    ) -> Result<Self, CalcError> {
        match (SampleRate::try_from(sample_rate), policy) {
            (Ok(rate), _) => Self::new(rate, tic_frame_size_at_1fs),
            (Err(_), RatePolicy::DegradeToBase) => {
                check_tic_frame_size(tic_frame_size_at_1fs)?;
                warn!(
                    sample_rate,
                    "Unsupported sample rate, using base-rate frame multiplier"
                );
                Ok(Self {
                    sample_rate,
                    tic_frame_size_at_1fs,
                    frame_multiplier: 1,
                })
            }
            (Err(e), RatePolicy::Reject) => Err(e),
        }
    }

    /// Create a context from the daemon's current configuration
    pub fn from_config(config: &DaemonConfig, policy: RatePolicy) -> Result<Self, CalcError> {
        Self::resolve(config.sample_rate, config.tic_frame_size_at_1fs, policy)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn tic_frame_size_at_1fs(&self) -> u32 {
        self.tic_frame_size_at_1fs
    }

    pub fn frame_multiplier(&self) -> u32 {
        self.frame_multiplier
    }

    /// Largest samples-per-packet value the clock allows at the active rate
    pub fn max_samples_per_packet(&self) -> u32 {
        self.tic_frame_size_at_1fs.saturating_mul(self.frame_multiplier)
    }

    pub fn allows(&self, samples_per_packet: u32) -> bool {
        samples_per_packet <= self.max_samples_per_packet()
    }
}

fn check_tic_frame_size(tic_frame_size_at_1fs: u32) -> Result<(), CalcError> {
    if tic_frame_size_at_1fs == 0 {
        return Err(CalcError::InvalidArgument(
            "tic_frame_size_at_1fs must be positive".to_string(),
        ));
    }
    Ok(())
}

//! Frame sampling
//!
//! Throttling is the only backpressure the pipeline has against the
//! transport's native frame rate, so the sampler decides which frames are
//! worth a classifier call. Two policies are supported: every Nth frame by
//! index, or at most one frame per time interval.

use std::num::NonZeroU32;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EmotiveError, Result};

/// Default stride when none is configured
pub const DEFAULT_STRIDE: u32 = 15;

/// How frames are selected for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Sample frame `i` iff `i mod stride == 0`
    EveryNth { stride: u32 },
    /// Sample the first frame, then any frame captured at least `millis`
    /// after the last sampled one
    Interval { millis: u64 },
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy::EveryNth {
            stride: DEFAULT_STRIDE,
        }
    }
}

impl SamplingPolicy {
    /// Reject policies that would divide by zero or sample every frame
    /// through a zero-length interval
    pub fn validate(&self) -> Result<()> {
        match *self {
            SamplingPolicy::EveryNth { stride: 0 } => Err(EmotiveError::config(
                "sampling.stride",
                "stride must be a positive integer",
            )),
            SamplingPolicy::Interval { millis: 0 } => Err(EmotiveError::config(
                "sampling.millis",
                "interval must be at least 1 ms",
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Rule {
    Stride(NonZeroU32),
    Interval(Duration),
}

/// Decides which frames trigger inference
///
/// Frame indices are expected to start at 1, so `L` frames with stride `N`
/// produce exactly `L / N` (rounded down) samples. Interval sampling reads
/// the frame's offset on the stream clock; an offset earlier than the last
/// sample means the transport restarted its clock, and is sampled.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    rule: Rule,
    last_sampled: Option<Duration>,
}

impl FrameSampler {
    /// Build a sampler, validating the policy up front
    pub fn new(policy: SamplingPolicy) -> Result<Self> {
        policy.validate()?;
        let rule = match policy {
            SamplingPolicy::EveryNth { stride } => {
                // validate() guarantees non-zero
                Rule::Stride(NonZeroU32::new(stride).ok_or_else(|| {
                    EmotiveError::config("sampling.stride", "stride must be a positive integer")
                })?)
            }
            SamplingPolicy::Interval { millis } => Rule::Interval(Duration::from_millis(millis)),
        };
        Ok(Self {
            rule,
            last_sampled: None,
        })
    }

    /// Count-based sampler with an already validated stride
    pub fn every_nth(stride: NonZeroU32) -> Self {
        Self {
            rule: Rule::Stride(stride),
            last_sampled: None,
        }
    }

    /// Should the frame with this index, captured at offset `at`, be
    /// classified?
    pub fn should_sample(&mut self, index: u64, at: Duration) -> bool {
        match self.rule {
            Rule::Stride(stride) => index % u64::from(stride.get()) == 0,
            Rule::Interval(interval) => {
                let due = match self.last_sampled {
                    None => true,
                    Some(last) if at < last => true,
                    Some(last) => at - last >= interval,
                };
                if due {
                    self.last_sampled = Some(at);
                }
                due
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn count_samples(stride: u32, frames: u64) -> u64 {
        let mut sampler = FrameSampler::new(SamplingPolicy::EveryNth { stride }).unwrap();
        (1..=frames)
            .filter(|&i| sampler.should_sample(i, Duration::ZERO))
            .count() as u64
    }

    #[test_case(1, 10 => 10 ; "stride one samples everything")]
    #[test_case(15, 100 => 6 ; "stride fifteen")]
    #[test_case(30, 29 => 0 ; "fewer frames than stride")]
    #[test_case(30, 90 => 3 ; "exact multiple")]
    #[test_case(7, 0 => 0 ; "no frames")]
    fn test_stride_sample_count(stride: u32, frames: u64) -> u64 {
        count_samples(stride, frames)
    }

    #[test]
    fn test_zero_stride_is_config_error() {
        let err = FrameSampler::new(SamplingPolicy::EveryNth { stride: 0 }).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_zero_interval_is_config_error() {
        assert!(FrameSampler::new(SamplingPolicy::Interval { millis: 0 }).is_err());
    }

    #[test]
    fn test_interval_sampling() {
        let mut sampler = FrameSampler::new(SamplingPolicy::Interval { millis: 100 }).unwrap();
        let ms = Duration::from_millis;

        assert!(sampler.should_sample(1, ms(0)));
        assert!(!sampler.should_sample(2, ms(40)));
        assert!(!sampler.should_sample(3, ms(99)));
        assert!(sampler.should_sample(4, ms(100)));
        assert!(!sampler.should_sample(5, ms(150)));
        assert!(sampler.should_sample(6, ms(260)));
    }

    #[test]
    fn test_interval_restarts_with_transport_clock() {
        let mut sampler = FrameSampler::new(SamplingPolicy::Interval { millis: 100 }).unwrap();
        let ms = Duration::from_millis;

        assert!(sampler.should_sample(1, ms(5_000)));
        assert!(!sampler.should_sample(2, ms(5_050)));
        // Reconnect: offsets start over
        assert!(sampler.should_sample(3, ms(10)));
        assert!(!sampler.should_sample(4, ms(60)));
        assert!(sampler.should_sample(5, ms(110)));
    }
}

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// A wall-clock sample normalized to a whole-second part and a
/// millisecond remainder below 1000.
#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct TimeSample {
    pub seconds: u64,
    pub ms: u16,
}

impl TimeSample {
    pub const ZERO: Self = Self {
        seconds: 0,
        ms: 0,
    };

    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(Self::ZERO, |duration| Self {
                seconds: duration.as_secs(),
                ms: duration.subsec_millis() as u16,
            })
    }

    /// Display-server timestamps arrive as milliseconds on a server-local
    /// epoch; differences between two of them are still meaningful.
    pub fn from_server_ms(time: u32) -> Self {
        Self {
            seconds: (time / 1000) as u64,
            ms: (time % 1000) as u16,
        }
    }

    pub fn diff_ms(
        &self,
        other: &Self,
    ) -> u64 {
        let this = self.seconds as i64 * 1000 + self.ms as i64;
        let that = other.seconds as i64 * 1000 + other.ms as i64;

        (this - that).abs() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_is_normalized_and_symmetric() {
        let earlier = TimeSample {
            seconds: 10,
            ms: 900,
        };
        let later = TimeSample {
            seconds: 11,
            ms: 150,
        };

        assert_eq!(later.diff_ms(&earlier), 250);
        assert_eq!(earlier.diff_ms(&later), 250);
        assert_eq!(earlier.diff_ms(&earlier), 0);
    }

    #[test]
    fn server_timestamps_split_into_parts() {
        let sample = TimeSample::from_server_ms(63_421);

        assert_eq!(sample.seconds, 63);
        assert_eq!(sample.ms, 421);
    }
}

use enum_map::Enum;
use serde::{Deserialize, Serialize};

const MILLION: f64 = 1_000_000.0;

/// Discrete dollar-volume magnitude class for a period's dark-pool prints.
///
/// The rendering surface cannot vary marker size per point within one
/// series, so each class gets its own series with a fixed marker radius;
/// classification decides which series a print lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Deserialize, Serialize)]
pub enum DarkPoolBucket {
    Small,
    Medium,
    Large,
    XLarge,
}

impl DarkPoolBucket {
    pub const ALL: [DarkPoolBucket; 4] = [
        DarkPoolBucket::Small,
        DarkPoolBucket::Medium,
        DarkPoolBucket::Large,
        DarkPoolBucket::XLarge,
    ];

    /// Maps a period's total dark-pool dollar volume to its bucket.
    /// Thresholds at $100M / $500M / $1000M; lower bound inclusive.
    pub fn classify(dollar_volume: f64) -> Self {
        if dollar_volume < 100.0 * MILLION {
            DarkPoolBucket::Small
        } else if dollar_volume < 500.0 * MILLION {
            DarkPoolBucket::Medium
        } else if dollar_volume < 1_000.0 * MILLION {
            DarkPoolBucket::Large
        } else {
            DarkPoolBucket::XLarge
        }
    }

    /// Fixed marker radius (px) the surface configures for this bucket's
    /// series.
    pub fn marker_radius(self) -> u8 {
        match self {
            DarkPoolBucket::Small => 3,
            DarkPoolBucket::Medium => 5,
            DarkPoolBucket::Large => 7,
            DarkPoolBucket::XLarge => 9,
        }
    }
}

impl std::fmt::Display for DarkPoolBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DarkPoolBucket::Small => write!(f, "Small"),
            DarkPoolBucket::Medium => write!(f, "Medium"),
            DarkPoolBucket::Large => write!(f, "Large"),
            DarkPoolBucket::XLarge => write!(f, "XLarge"),
        }
    }
}

/// Calibration points for the continuous marker-size hint:
/// (dollar volume, radius px). Piecewise-linear between neighbors.
const SIZE_POINTS: [(f64, f64); 8] = [
    (10.0 * MILLION, 2.0),
    (25.0 * MILLION, 3.0),
    (100.0 * MILLION, 4.0),
    (500.0 * MILLION, 6.0),
    (750.0 * MILLION, 7.0),
    (1_000.0 * MILLION, 8.0),
    (1_500.0 * MILLION, 9.0),
    (2_000.0 * MILLION, 10.0),
];

/// Continuous marker-size hint in whole pixels, independent of the bucket
/// split. Clamps below the first and at/above the last calibration point;
/// interpolates linearly in between and rounds to the nearest pixel.
pub fn marker_size_hint(dollar_volume: f64) -> u8 {
    let (first_volume, first_size) = SIZE_POINTS[0];
    if dollar_volume <= first_volume {
        return first_size as u8;
    }

    for pair in SIZE_POINTS.windows(2) {
        let (lo_volume, lo_size) = pair[0];
        let (hi_volume, hi_size) = pair[1];

        if dollar_volume <= hi_volume {
            let ratio = (dollar_volume - lo_volume) / (hi_volume - lo_volume);
            return (lo_size + (hi_size - lo_size) * ratio).round() as u8;
        }
    }

    SIZE_POINTS[SIZE_POINTS.len() - 1].1 as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_threshold_boundaries() {
        assert_eq!(DarkPoolBucket::classify(0.0), DarkPoolBucket::Small);
        assert_eq!(DarkPoolBucket::classify(99_999_999.0), DarkPoolBucket::Small);
        assert_eq!(DarkPoolBucket::classify(100_000_000.0), DarkPoolBucket::Medium);
        assert_eq!(DarkPoolBucket::classify(499_999_999.0), DarkPoolBucket::Medium);
        assert_eq!(DarkPoolBucket::classify(500_000_000.0), DarkPoolBucket::Large);
        assert_eq!(DarkPoolBucket::classify(999_999_999.0), DarkPoolBucket::Large);
        assert_eq!(DarkPoolBucket::classify(1_000_000_000.0), DarkPoolBucket::XLarge);
        assert_eq!(DarkPoolBucket::classify(5_000_000_000.0), DarkPoolBucket::XLarge);
    }

    #[test]
    fn size_hint_at_calibration_points() {
        assert_eq!(marker_size_hint(10.0 * MILLION), 2);
        assert_eq!(marker_size_hint(25.0 * MILLION), 3);
        assert_eq!(marker_size_hint(500.0 * MILLION), 6);
        assert_eq!(marker_size_hint(2_000.0 * MILLION), 10);
    }

    #[test]
    fn size_hint_interpolates_between_points() {
        // Halfway between 10M (2px) and 25M (3px) rounds up.
        assert_eq!(marker_size_hint(17.5 * MILLION), 3);
        // 300M sits 2/5 of the way from 100M (4px) to 500M (6px).
        assert_eq!(marker_size_hint(300.0 * MILLION), 5);
    }

    #[test]
    fn size_hint_clamps_outside_calibration() {
        assert_eq!(marker_size_hint(0.0), 2);
        assert_eq!(marker_size_hint(1.0 * MILLION), 2);
        assert_eq!(marker_size_hint(5_000.0 * MILLION), 10);
    }

    #[test]
    fn bucket_radii_are_monotonic() {
        let radii: Vec<u8> = DarkPoolBucket::ALL
            .iter()
            .map(|b| b.marker_radius())
            .collect();
        assert!(radii.windows(2).all(|w| w[0] < w[1]));
    }
}

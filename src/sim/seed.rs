//! Deterministic hash-to-unit-interval helpers.
//!
//! "Randomness" here is a pure function of its inputs: a decimal seed built
//! from the time components, salted with the equipment id and metric, and
//! folded through `|sin(seed)|`. Equal inputs always give equal values.

/// Decimal digit concatenation of the given parts.
///
/// `digit_seed(&[15, 5, 2025])` yields `1552025`.
///
/// # Examples
///
/// ```
/// use pv_monitor::sim::seed::digit_seed;
///
/// assert_eq!(digit_seed(&[7, 15, 5, 2025]), 71_552_025);
/// assert_eq!(digit_seed(&[]), 0);
/// ```
pub fn digit_seed(parts: &[u32]) -> u64 {
    parts.iter().fold(0_u64, |acc, &part| {
        let width = decimal_width(part);
        acc.wrapping_mul(10_u64.pow(width)).wrapping_add(u64::from(part))
    })
}

fn decimal_width(mut n: u32) -> u32 {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

/// Stable FNV-1a hash of an identifier, reduced to a small salt.
pub fn id_salt(id: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let hash = id
        .bytes()
        .fold(OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(PRIME));
    hash % 1_000_003
}

/// Combines a time seed with identifier and metric salts.
///
/// The result stays below 2^53 for any realistic time seed so the
/// conversion to `f64` in [`unit_noise`] is exact.
pub fn mix(time_seed: u64, salt: u64, metric: u64) -> u64 {
    (time_seed % 100_000_000_000)
        .wrapping_mul(31)
        .wrapping_add(salt.wrapping_mul(7_919))
        .wrapping_add(metric.wrapping_mul(104_729))
}

/// Maps a seed into `[0, 1)` as `fract(|sin(seed) * 10000|)`.
///
/// # Examples
///
/// ```
/// use pv_monitor::sim::seed::unit_noise;
///
/// let u = unit_noise(1_552_025);
/// assert!((0.0..1.0).contains(&u));
/// assert_eq!(u, unit_noise(1_552_025));
/// ```
pub fn unit_noise(seed: u64) -> f64 {
    ((seed as f64).sin() * 10_000.0).abs().fract()
}

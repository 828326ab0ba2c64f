const BITS_PER_MEGABIT: f64 = 1024.0 * 1024.0;

/// Bitrate in Mbit/s for `bytes` moved in `elapsed_seconds`.
///
/// Returns `0.0` when `elapsed_seconds` is zero or negative, which happens on
/// very fast local transfers with a coarse clock.
///
/// # Examples
///
/// ```
/// use diskspeed_fetch::speed_mbps;
///
/// assert_eq!(speed_mbps(1_048_576, 1.0), 8.0);
/// assert_eq!(speed_mbps(1_048_576, 0.0), 0.0);
/// ```
pub fn speed_mbps(bytes: u64, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds <= 0.0 || elapsed_seconds.is_nan() {
        return 0.0;
    }
    (bytes as f64 * 8.0) / (elapsed_seconds * BITS_PER_MEGABIT)
}

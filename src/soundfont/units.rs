//! SF2 unit conversions.
//!
//! The format measures time in timecents (1200 log2 seconds), levels in
//! centibels (tenths of a decibel), and pitch in cents. Everything the
//! voice needs is a power of two or ten away.

/// Absolute pitch of MIDI key 0 in Hz; anchors absolute-cent values.
pub const ABSOLUTE_CENT_BASE_HZ: f32 = 8.176;

/// Timecents to seconds: 2^(tc / 1200).
///
/// The conventional "instantly" sentinel -32768 maps to exactly zero
/// rather than a subnormal duration.
#[inline]
pub fn timecents_to_secs(tc: i16) -> f32 {
    if tc == i16::MIN {
        return 0.0;
    }
    2.0f32.powf(tc as f32 / 1200.0)
}

/// Centibels of attenuation to a linear gain factor: 10^(-cb / 200).
///
/// 0 cB is unity; larger values attenuate. The result is clamped to
/// [0, 1] so a negative (boosting) value cannot push a voice past its
/// sample's full scale.
#[inline]
pub fn centibels_to_gain(cb: f32) -> f32 {
    10.0f32.powf(-cb / 200.0).clamp(0.0, 1.0)
}

/// Relative cents to a frequency ratio: 2^(cents / 1200).
#[inline]
pub fn cents_to_ratio(cents: f64) -> f64 {
    2.0f64.powf(cents / 1200.0)
}

/// Absolute cents to Hz: 8.176 * 2^(cents / 1200). Used for the filter
/// cutoff generator, where 13500 cents is roughly 20 kHz (wide open).
#[inline]
pub fn absolute_cents_to_hz(cents: f32) -> f32 {
    ABSOLUTE_CENT_BASE_HZ * 2.0f32.powf(cents / 1200.0)
}

use crate::error::{TrackError, TrackResult};
use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0; // middelradius (m)

// --- RoundTo trait (offentlig, brukt av rapporten) ---
pub trait RoundTo {
    fn round_to(self, dp: u32) -> f64;
}

impl RoundTo for f64 {
    #[inline]
    fn round_to(self, dp: u32) -> f64 {
        if dp == 0 {
            return self.round();
        }
        let factor = 10_f64.powi(dp as i32);
        (self * factor).round() / factor
    }
}

/// Storsirkelavstand (haversine) i meter.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // h kan krype over 1.0 ved antipoder pga avrunding
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_M * c
}

/// `mm:ss` under en time, ellers `hh:mm:ss`. Brøkdeler av sekunder kuttes.
pub fn format_clock(total_seconds: f64) -> TrackResult<String> {
    if !total_seconds.is_finite() || total_seconds < 0.0 {
        return Err(TrackError::InvalidDuration(total_seconds));
    }
    let secs = total_seconds.trunc() as u64;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    Ok(if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    })
}

/// Clamps garbage to zero before formatting, for display paths that must not fail.
pub fn format_clock_clamped(total_seconds: f64) -> String {
    let s = if total_seconds.is_finite() {
        total_seconds.max(0.0)
    } else {
        0.0
    };
    format_clock(s).unwrap_or_else(|_| "00:00".to_string())
}

/// Pace (sek/km). `None` når distanse eller tid ikke er positiv.
pub fn pace_seconds_per_km(distance_m: f64, elapsed_s: f64) -> Option<f64> {
    if !(distance_m.is_finite() && elapsed_s.is_finite()) {
        return None;
    }
    if distance_m <= 0.0 || elapsed_s <= 0.0 {
        return None;
    }
    Some(elapsed_s / (distance_m / 1000.0))
}

pub fn format_pace(pace_s_per_km: Option<f64>) -> String {
    match pace_s_per_km {
        Some(p) => format_clock_clamped(p),
        None => "00:00".to_string(),
    }
}

/// Kilometer med to desimaler, f.eks. `"1.20"`.
pub fn format_distance_km(distance_m: f64) -> String {
    let km = if distance_m.is_finite() {
        distance_m.max(0.0) / 1000.0
    } else {
        0.0
    };
    format!("{km:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let d = distance_meters(a, b);
        // 2πR/360
        assert!((d - 111_194.926_644_558_73).abs() < 1e-6, "d={d}");
    }

    #[test]
    fn antipodes_do_not_nan() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        let d = distance_meters(a, b);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1e-3);
    }

    #[test]
    fn clock_truncates_fractions() {
        assert_eq!(format_clock(59.9).unwrap(), "00:59");
        assert_eq!(format_clock(0.0).unwrap(), "00:00");
        assert_eq!(format_clock(36_000.0).unwrap(), "10:00:00");
    }

    #[test]
    fn clock_rejects_garbage() {
        assert!(matches!(format_clock(-1.0), Err(TrackError::InvalidDuration(_))));
        assert!(format_clock(f64::NAN).is_err());
        assert!(format_clock(f64::INFINITY).is_err());
        assert_eq!(format_clock_clamped(-5.0), "00:00");
        assert_eq!(format_clock_clamped(f64::NAN), "00:00");
    }

    #[test]
    fn pace_and_distance_text() {
        assert_eq!(format_pace(None), "00:00");
        assert_eq!(format_pace(pace_seconds_per_km(1000.0, 330.0)), "05:30");
        assert_eq!(format_distance_km(1234.0), "1.23");
        assert_eq!(format_distance_km(0.0), "0.00");
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(8.333_333_f64.round_to(2), 8.33);
        assert_eq!(2.5_f64.round_to(0), 3.0);
    }
}

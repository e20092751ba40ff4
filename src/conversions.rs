//! Flux and magnitude conversions for the 4px aperture photometry.

const ZERO_POINT: f64 = 24.176;
const SCALE: f64 = 2.6148;

pub fn flux_to_magnitude_4px(flux: f64) -> f64 {
    ZERO_POINT - SCALE * flux.log10()
}

pub fn magnitude_4px_to_flux(magnitude: f64) -> f64 {
    10f64.powf((ZERO_POINT - magnitude) / SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_flux() {
        assert!((flux_to_magnitude_4px(1.0) - 24.176).abs() < 1e-12);
    }

    #[test]
    fn test_inverse() {
        for flux in [10.0, 1_650_000.0, 2.5e7] {
            let back = magnitude_4px_to_flux(flux_to_magnitude_4px(flux));
            assert!((back - flux).abs() / flux < 1e-9);
        }
    }

    #[test]
    fn test_brighter_is_smaller_magnitude() {
        assert!(flux_to_magnitude_4px(2_000_000.0) < flux_to_magnitude_4px(1_000_000.0));
    }
}

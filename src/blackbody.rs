//! Planck blackbody model used for the SED overlay.
//!
//! Flux densities are `B_λ(T)` in erg s⁻¹ cm⁻² Å⁻¹ sr⁻¹, multiplied by the
//! candidate's `scale`.  Wavelengths are in microns.

use thiserror::Error;

use crate::config::SedConfig;

/// Planck constant [erg s].
const H: f64 = 6.626_070_15e-27;
/// Speed of light [cm s⁻¹].
const C: f64 = 2.997_924_58e10;
/// Boltzmann constant [erg K⁻¹].
const K_B: f64 = 1.380_649e-16;
/// Wien displacement constant [µm K].
const WIEN_B_MICRON: f64 = 2_897.771_955;

const CM_PER_MICRON: f64 = 1e-4;
const ANGSTROM_PER_CM: f64 = 1e8;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("temperature must be a positive finite number of Kelvin, got {0}")]
    InvalidTemperature(f64),
    #[error("scale must be finite, got {0}")]
    InvalidScale(f64),
    #[error("wavelength grid must be strictly positive, got {0} µm")]
    InvalidWavelength(f64),
    #[error("wavelength grid needs 0 < min < max and at least 2 points")]
    InvalidGrid,
}

// ---------------------------------------------------------------------------
// Wavelength grid
// ---------------------------------------------------------------------------

/// Log-spaced wavelength grid in microns, endpoints included.
pub fn wavelength_grid(cfg: &SedConfig) -> Result<Vec<f64>, ModelError> {
    if !(cfg.min_micron > 0.0 && cfg.max_micron > cfg.min_micron && cfg.points >= 2)
        || !cfg.max_micron.is_finite()
    {
        return Err(ModelError::InvalidGrid);
    }
    let lo = cfg.min_micron.log10();
    let hi = cfg.max_micron.log10();
    let steps = (cfg.points - 1) as f64;
    Ok((0..cfg.points)
        .map(|i| 10f64.powf(lo + (hi - lo) * i as f64 / steps))
        .collect())
}

// ---------------------------------------------------------------------------
// Planck's law
// ---------------------------------------------------------------------------

/// Spectral radiance per unit wavelength for a single wavelength.
fn planck_lambda(wavelength_micron: f64, temperature: f64) -> f64 {
    let lambda_cm = wavelength_micron * CM_PER_MICRON;
    let x = H * C / (lambda_cm * K_B * temperature);
    // exp_m1 keeps the Rayleigh-Jeans tail accurate; overflow gives 0 flux.
    let per_cm = 2.0 * H * C * C / lambda_cm.powi(5) / x.exp_m1();
    per_cm / ANGSTROM_PER_CM
}

/// Predicted flux density on `grid` for a blackbody at `temperature` K,
/// multiplied by `scale`.
pub fn predict(grid: &[f64], temperature: f64, scale: f64) -> Result<Vec<f64>, ModelError> {
    if !(temperature.is_finite() && temperature > 0.0) {
        return Err(ModelError::InvalidTemperature(temperature));
    }
    if !scale.is_finite() {
        return Err(ModelError::InvalidScale(scale));
    }
    if let Some(&bad) = grid.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
        return Err(ModelError::InvalidWavelength(bad));
    }
    Ok(grid
        .iter()
        .map(|&w| planck_lambda(w, temperature) * scale)
        .collect())
}

/// Wavelength (µm) of peak `B_λ` according to Wien's displacement law.
pub fn wien_peak_micron(temperature: f64) -> f64 {
    WIEN_B_MICRON / temperature
}

// ---------------------------------------------------------------------------
// SpectralCurve – derived per candidate, never stored
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SpectralCurve {
    pub wavelength_micron: Vec<f64>,
    pub flux: Vec<f64>,
    pub temperature: f64,
    pub scale: f64,
}

impl SpectralCurve {
    pub fn compute(grid: &[f64], temperature: f64, scale: f64) -> Result<Self, ModelError> {
        Ok(SpectralCurve {
            flux: predict(grid, temperature, scale)?,
            wavelength_micron: grid.to_vec(),
            temperature,
            scale,
        })
    }

    /// Grid point with the largest flux.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.wavelength_micron
            .iter()
            .copied()
            .zip(self.flux.iter().copied())
            .filter(|(_, f)| f.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Points that can be drawn on log-log axes.
    pub fn loglog_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.wavelength_micron
            .iter()
            .copied()
            .zip(self.flux.iter().copied())
            .filter(|(w, f)| *w > 0.0 && f.is_finite() && *f > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_grid() -> Vec<f64> {
        wavelength_grid(&SedConfig::default()).unwrap()
    }

    #[test]
    fn grid_is_log_spaced_and_inclusive() {
        let grid = default_grid();
        assert_eq!(grid.len(), 100);
        assert!((grid[0] - 0.1).abs() < 1e-12);
        assert!((grid[99] - 10.0).abs() < 1e-9);
        let r0 = grid[1] / grid[0];
        let r1 = grid[99] / grid[98];
        assert!((r0 - r1).abs() < 1e-9);
    }

    #[test]
    fn invalid_grid_is_rejected() {
        let cfg = SedConfig {
            min_micron: 5.0,
            max_micron: 1.0,
            points: 100,
        };
        assert_eq!(wavelength_grid(&cfg), Err(ModelError::InvalidGrid));
    }

    #[test]
    fn sun_like_peak_is_visible_or_near_ir() {
        let curve = SpectralCurve::compute(&default_grid(), 5778.0, 1.0).unwrap();
        let (peak_w, _) = curve.peak().unwrap();
        assert!((0.38..=1.0).contains(&peak_w), "peak at {peak_w} µm");
        assert!((peak_w - wien_peak_micron(5778.0)).abs() < 0.05);
    }

    #[test]
    fn single_peak_monotone_on_both_sides() {
        let curve = SpectralCurve::compute(&default_grid(), 5778.0, 1.0).unwrap();
        let peak_idx = curve
            .flux
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        for i in 1..=peak_idx {
            assert!(curve.flux[i] > curve.flux[i - 1], "rising side at {i}");
        }
        for i in peak_idx + 1..curve.flux.len() {
            assert!(curve.flux[i] < curve.flux[i - 1], "falling side at {i}");
        }
    }

    #[test]
    fn rayleigh_jeans_tail_is_linear_in_loglog() {
        // Long-wavelength slope approaches -4 in log-log.
        let grid = [100.0, 1000.0];
        let flux = predict(&grid, 5778.0, 1.0).unwrap();
        let slope = (flux[1].log10() - flux[0].log10()) / (grid[1].log10() - grid[0].log10());
        assert!((slope + 4.0).abs() < 0.05, "slope {slope}");
    }

    #[test]
    fn flux_is_linear_in_scale() {
        let grid = default_grid();
        let a = predict(&grid, 5778.0, 1.5).unwrap();
        let b = predict(&grid, 5778.0, 3.0).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(*y, 2.0 * *x);
        }
    }

    #[test]
    fn invalid_inputs_are_errors() {
        let grid = default_grid();
        assert_eq!(
            predict(&grid, 0.0, 1.0),
            Err(ModelError::InvalidTemperature(0.0))
        );
        assert!(matches!(
            predict(&grid, f64::NAN, 1.0),
            Err(ModelError::InvalidTemperature(_))
        ));
        assert!(matches!(
            predict(&grid, 5000.0, f64::INFINITY),
            Err(ModelError::InvalidScale(_))
        ));
        assert_eq!(
            predict(&[1.0, -2.0], 5000.0, 1.0),
            Err(ModelError::InvalidWavelength(-2.0))
        );
    }
}

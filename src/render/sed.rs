use plotters::prelude::*;

use super::{draw_err, PlotKind, PlotRenderer, RenderError};
use crate::blackbody::{wien_peak_micron, SpectralCurve};
use crate::color::SED_COLOR;
use crate::data::model::{Evidence, PlotSlot};

impl PlotRenderer {
    /// Log-log blackbody curve for the candidate's temperature and scale,
    /// with the Wien peak marked.  Always produces a plot for a curve that
    /// has positive flux somewhere on the grid.
    pub fn render_sed(
        &self,
        source_id: &str,
        curve: &SpectralCurve,
    ) -> Result<PlotSlot, RenderError> {
        let points: Vec<(f64, f64)> = curve.loglog_points().collect();
        if points.len() < 2 {
            return Err(RenderError::Evidence(format!(
                "blackbody at {} K has no positive flux on the wavelength grid",
                curve.temperature
            )));
        }

        let (x_lo, x_hi) = bounds(points.iter().map(|p| p.0));
        let (y_lo, y_hi) = bounds(points.iter().map(|p| p.1));
        // Log axes: pad by a factor instead of an offset.
        let y_range = (y_lo / 2.0)..(y_hi * 2.0);
        let peak = wien_peak_micron(curve.temperature);
        let caption = match curve.peak() {
            Some((w, _)) => format!(
                "SED - {source_id} (T = {:.0} K, peak {w:.2} µm)",
                curve.temperature
            ),
            None => format!("SED - {source_id} (T = {:.0} K)", curve.temperature),
        };

        let path = self.path_for(source_id, PlotKind::Sed);
        self.render_png(&path, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(caption, ("sans-serif", 22))
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(80)
                .build_cartesian_2d((x_lo..x_hi).log_scale(), y_range.clone().log_scale())
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .x_desc("Wavelength (microns)")
                .y_desc("Flux Density (scaled B_lambda)")
                .draw()
                .map_err(draw_err)?;

            if (x_lo..=x_hi).contains(&peak) {
                chart
                    .draw_series(std::iter::once(PathElement::new(
                        vec![(peak, y_range.start), (peak, y_range.end)],
                        BLACK.mix(0.25),
                    )))
                    .map_err(draw_err)?;
            }

            chart
                .draw_series(LineSeries::new(points.iter().copied(), SED_COLOR.stroke_width(2)))
                .map_err(draw_err)?;
            Ok(())
        })?;

        Ok(Evidence::Present(path))
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackbody::wavelength_grid;
    use crate::color::MissionColors;
    use crate::config::{PlotConfig, SedConfig};

    #[test]
    fn sun_like_sed_is_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PlotRenderer::new(
            dir.path().join("plots"),
            &PlotConfig::default(),
            MissionColors::default(),
        );
        let grid = wavelength_grid(&SedConfig::default()).unwrap();
        let curve = SpectralCurve::compute(&grid, 5778.0, 1.0).unwrap();
        let slot = renderer.render_sed("KIC-1", &curve).unwrap();
        let expected = dir.path().join("plots").join("KIC-1_sed.png");
        assert_eq!(slot, Evidence::Present(expected.clone()));
        assert!(image::open(&expected).is_ok());
    }

    #[test]
    fn zero_flux_curve_is_a_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = PlotRenderer::new(
            dir.path().join("plots"),
            &PlotConfig::default(),
            MissionColors::default(),
        );
        let grid = wavelength_grid(&SedConfig::default()).unwrap();
        let curve = SpectralCurve::compute(&grid, 5778.0, 0.0).unwrap();
        assert!(renderer.render_sed("A", &curve).is_err());
    }
}

use log::debug;
use plotters::prelude::*;

use super::{draw_err, padded_range, PlotKind, PlotRenderer, RenderError};
use crate::data::model::{Evidence, LightCurveSeries, Mission, PlotSlot};

impl PlotRenderer {
    /// Scatter of time vs normalized flux, coloured by mission.
    ///
    /// `Absent` when there is no light curve, or when it has no finite
    /// samples left to draw.
    pub fn render_light_curve(
        &self,
        source_id: &str,
        mission: &Mission,
        series: &Evidence<LightCurveSeries>,
    ) -> Result<PlotSlot, RenderError> {
        let Evidence::Present(series) = series else {
            return Ok(Evidence::Absent);
        };
        let points: Vec<(f64, f64)> = series.finite_points().collect();
        if points.is_empty() {
            debug!(
                "{source_id}: light curve has {} samples but none finite",
                series.len()
            );
            return Ok(Evidence::Absent);
        }

        let x_range = padded_range(points.iter().map(|p| p.0))
            .ok_or_else(|| RenderError::Evidence("no finite time values".into()))?;
        let y_range = padded_range(points.iter().map(|p| p.1))
            .ok_or_else(|| RenderError::Evidence("no finite flux values".into()))?;
        let color = self.colors().color_for(mission);

        let path = self.path_for(source_id, PlotKind::LightCurve);
        self.render_png(&path, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(
                    format!("Light Curve - {source_id} ({mission})"),
                    ("sans-serif", 22),
                )
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range, y_range)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .x_desc("Time")
                .y_desc("Normalized Flux")
                .draw()
                .map_err(draw_err)?;

            chart
                .draw_series(
                    points
                        .iter()
                        .map(|&(t, f)| Circle::new((t, f), 1, color.filled())),
                )
                .map_err(draw_err)?;
            Ok(())
        })?;

        Ok(Evidence::Present(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::MissionColors;
    use crate::config::PlotConfig;

    fn renderer(dir: &std::path::Path) -> PlotRenderer {
        PlotRenderer::new(dir.join("plots"), &PlotConfig::default(), MissionColors::default())
    }

    #[test]
    fn absent_series_gives_absent_plot() {
        let dir = tempfile::tempdir().unwrap();
        let slot = renderer(dir.path())
            .render_light_curve("A", &Mission::new("kepler"), &Evidence::Absent)
            .unwrap();
        assert_eq!(slot, Evidence::Absent);
        assert!(!dir.path().join("plots").exists());
    }

    #[test]
    fn empty_series_gives_absent_plot() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path());
        let empty = Evidence::Present(LightCurveSeries::default());
        assert_eq!(
            r.render_light_curve("A", &Mission::new("kepler"), &empty).unwrap(),
            Evidence::Absent
        );
        let all_nan = Evidence::Present(LightCurveSeries {
            time: vec![0.0, 1.0],
            flux: vec![f64::NAN, f64::NAN],
        });
        assert_eq!(
            r.render_light_curve("A", &Mission::new("kepler"), &all_nan).unwrap(),
            Evidence::Absent
        );
    }

    #[test]
    fn present_series_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let series = LightCurveSeries {
            time: (0..200).map(|i| i as f64 * 0.02).collect(),
            flux: (0..200)
                .map(|i| if (80..95).contains(&i) { 0.98 } else { 1.0 })
                .collect(),
        };
        let slot = renderer(dir.path())
            .render_light_curve("KIC-1", &Mission::new("kepler"), &Evidence::Present(series))
            .unwrap();
        let expected = dir.path().join("plots").join("KIC-1_lc.png");
        assert_eq!(slot, Evidence::Present(expected.clone()));
        let img = image::open(&expected).unwrap();
        assert_eq!((img.width(), img.height()), (1000, 600));
    }
}

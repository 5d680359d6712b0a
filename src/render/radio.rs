use plotters::prelude::*;

use super::{draw_err, padded_range, PlotKind, PlotRenderer, RenderError};
use crate::color::RADIO_COLOR;
use crate::data::model::{Evidence, PlotSlot, RadioHitSet};

impl PlotRenderer {
    /// Scatter of frequency (MHz) vs signal-to-noise.  `Absent` when the
    /// candidate has no hits.
    pub fn render_radio(
        &self,
        source_id: &str,
        hits: &RadioHitSet,
    ) -> Result<PlotSlot, RenderError> {
        if hits.is_empty() {
            return Ok(Evidence::Absent);
        }
        let points: Vec<(f64, f64)> = hits
            .hits
            .iter()
            .copied()
            .filter(|(f, s)| f.is_finite() && s.is_finite())
            .collect();
        // Hits exist but none can be placed on the axes.
        if points.is_empty() {
            return Err(RenderError::Evidence(format!(
                "{} radio hits, none with finite frequency and SNR",
                hits.len()
            )));
        }

        let x_range = padded_range(points.iter().map(|p| p.0))
            .ok_or_else(|| RenderError::Evidence("no finite frequencies".into()))?;
        let y_range = padded_range(points.iter().map(|p| p.1))
            .ok_or_else(|| RenderError::Evidence("no finite SNR values".into()))?;

        let path = self.path_for(source_id, PlotKind::Radio);
        self.render_png(&path, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(format!("Radio Hits - {source_id}"), ("sans-serif", 22))
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range, y_range)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .x_desc("Frequency (MHz)")
                .y_desc("Signal-to-Noise Ratio")
                .draw()
                .map_err(draw_err)?;

            chart
                .draw_series(
                    points
                        .iter()
                        .map(|&(f, s)| Circle::new((f, s), 3, RADIO_COLOR.filled())),
                )
                .map_err(draw_err)?;
            Ok(())
        })?;

        Ok(Evidence::Present(path))
    }
}

use std::collections::{BTreeMap, BTreeSet};

use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

use crate::data::model::Mission;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            RGBColor(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Line colour of the blackbody curve.
pub const SED_COLOR: RGBColor = RGBColor(200, 70, 40);
/// Marker colour of radio hits.
pub const RADIO_COLOR: RGBColor = RGBColor(40, 90, 190);
const DEFAULT_COLOR: RGBColor = RGBColor(110, 110, 110);

// ---------------------------------------------------------------------------
// Color mapping: mission → colour
// ---------------------------------------------------------------------------

/// Maps the missions present in a batch to distinct colours, so light curves
/// from the same survey look alike across reports.
#[derive(Debug, Clone, Default)]
pub struct MissionColors {
    mapping: BTreeMap<Mission, RGBColor>,
}

impl MissionColors {
    /// Build the map from every mission seen in the batch.  Sorting keeps the
    /// assignment independent of row order.
    pub fn new<'a>(missions: impl IntoIterator<Item = &'a Mission>) -> Self {
        let unique: BTreeSet<&Mission> = missions.into_iter().collect();
        let palette = generate_palette(unique.len());
        let mapping = unique
            .into_iter()
            .zip(palette)
            .map(|(m, c)| (m.clone(), c))
            .collect();
        MissionColors { mapping }
    }

    pub fn color_for(&self, mission: &Mission) -> RGBColor {
        self.mapping
            .get(mission)
            .copied()
            .unwrap_or(DEFAULT_COLOR)
    }
}

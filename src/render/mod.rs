//! Diagnostic plot rendering.
//!
//! Each renderer takes one kind of evidence and either publishes a PNG at a
//! deterministic path or reports that there is nothing to draw:
//!
//! ```text
//!   Evidence<LightCurveSeries> ──► render_light_curve ──► plots/<stem>_lc.png    | Absent
//!   SpectralCurve              ──► render_sed         ──► plots/<stem>_sed.png   (always)
//!   RadioHitSet                ──► render_radio       ──► plots/<stem>_radio.png | Absent
//! ```
//!
//! Images are drawn into memory and encoded to `<file>.part` before being
//! renamed into place, so a reader never sees a half-written image.  Text is
//! rendered with an embedded DejaVu Sans registered as `sans-serif`.

pub mod light_curve;
pub mod radio;
pub mod sed;

use std::ffi::OsString;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use serde::Serialize;
use thiserror::Error;

use crate::color::MissionColors;
use crate::config::PlotConfig;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("malformed evidence: {0}")]
    Evidence(String),
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error("encoding PNG failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer panicked: {0}")]
    Panicked(String),
}

pub(crate) fn draw_err<E: fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

const PLOT_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Register the embedded font with plotters once per process.
fn ensure_font() -> Result<(), RenderError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, PLOT_FONT).is_ok());
    if ok {
        Ok(())
    } else {
        Err(RenderError::Draw("embedded plot font could not be loaded".into()))
    }
}

// ---------------------------------------------------------------------------
// Plot kinds and artifact paths
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    LightCurve,
    Sed,
    Radio,
}

impl PlotKind {
    pub const ALL: [PlotKind; 3] = [PlotKind::LightCurve, PlotKind::Sed, PlotKind::Radio];

    /// File-name suffix of the artifact.
    pub fn suffix(self) -> &'static str {
        match self {
            PlotKind::LightCurve => "lc",
            PlotKind::Sed => "sed",
            PlotKind::Radio => "radio",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PlotKind::LightCurve => "Light Curve",
            PlotKind::Sed => "SED and Blackbody Fit",
            PlotKind::Radio => "Radio Spectrogram",
        }
    }
}

/// File-name stem for a source id.  Bytes outside `[A-Za-z0-9._+-]` are
/// written as `~XX` (upper-case hex), so ids like `KIC 8462852` or `J1234/56`
/// stay inside the plots directory and two distinct ids never share a stem.
/// The result is also safe to use unescaped in a relative URL.
pub fn artifact_stem(source_id: &str) -> String {
    let mut stem = String::with_capacity(source_id.len());
    for b in source_id.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'+' | b'-') {
            stem.push(char::from(b));
        } else {
            stem.push_str(&format!("~{b:02X}"));
        }
    }
    stem
}

/// `<plots_dir>/<stem>_<suffix>.png`.  Consumers that want to find plots
/// without reading reports must build paths the same way.
pub fn artifact_path(plots_dir: &Path, source_id: &str, kind: PlotKind) -> PathBuf {
    plots_dir.join(format!("{}_{}.png", artifact_stem(source_id), kind.suffix()))
}

// ---------------------------------------------------------------------------
// PlotRenderer
// ---------------------------------------------------------------------------

/// Shared settings for the three renderers.  Immutable; safe to use from
/// several worker threads at once.
#[derive(Debug, Clone)]
pub struct PlotRenderer {
    plots_dir: PathBuf,
    width: u32,
    height: u32,
    colors: MissionColors,
}

impl PlotRenderer {
    pub fn new(plots_dir: impl Into<PathBuf>, plot: &PlotConfig, colors: MissionColors) -> Self {
        PlotRenderer {
            plots_dir: plots_dir.into(),
            width: plot.width.max(64),
            height: plot.height.max(64),
            colors,
        }
    }

    pub(crate) fn colors(&self) -> &MissionColors {
        &self.colors
    }

    pub(crate) fn path_for(&self, source_id: &str, kind: PlotKind) -> PathBuf {
        artifact_path(&self.plots_dir, source_id, kind)
    }

    /// Draw into an in-memory RGB buffer, then publish it as a PNG at `path`.
    pub(crate) fn render_png<F>(&self, path: &Path, draw: F) -> Result<(), RenderError>
    where
        F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<(), RenderError>,
    {
        ensure_font()?;
        let (w, h) = (self.width, self.height);
        let mut buffer = vec![0u8; (w as usize) * (h as usize) * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (w, h)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            draw(&root)?;
            root.present().map_err(draw_err)?;
        }
        publish_png(path, w, h, buffer)
    }
}

/// Encode `buffer` to `<path>.part`, then rename it over `path`.
pub fn publish_png(
    path: &Path,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
) -> Result<(), RenderError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| RenderError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::Draw("pixel buffer does not match image size".into()))?;

    let tmp = part_path(path);
    if let Err(e) = image.save_with_format(&tmp, ImageFormat::Png) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        RenderError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Staging name used while a file is being written.
pub fn part_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Min/max of the values, widened by 5% (or by 1 for a flat series).
pub(crate) fn padded_range(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let pad = if hi > lo {
        (hi - lo) * 0.05
    } else {
        lo.abs().max(1.0) * 0.05
    };
    Some((lo - pad)..(hi + pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_paths_use_kind_suffix() {
        let dir = Path::new("out/plots");
        assert_eq!(
            artifact_path(dir, "KIC-8462852", PlotKind::LightCurve),
            PathBuf::from("out/plots/KIC-8462852_lc.png")
        );
        assert_eq!(
            artifact_path(dir, "KIC-8462852", PlotKind::Sed),
            PathBuf::from("out/plots/KIC-8462852_sed.png")
        );
        assert_eq!(
            artifact_path(dir, "KIC-8462852", PlotKind::Radio),
            PathBuf::from("out/plots/KIC-8462852_radio.png")
        );
    }

    #[test]
    fn stems_never_escape_plots_dir() {
        assert_eq!(artifact_stem("KIC 8462852"), "KIC~208462852");
        assert_eq!(artifact_stem("../etc/passwd"), "..~2Fetc~2Fpasswd");
        assert_eq!(artifact_stem("TIC+1.2-x"), "TIC+1.2-x");
        assert_eq!(artifact_stem("Ω"), "~CE~A9");
    }

    #[test]
    fn distinct_ids_never_share_a_stem() {
        let ids = ["A B", "A_B", "A/B", "A~20B", "A~B", "A%20B"];
        let stems: std::collections::HashSet<String> =
            ids.iter().map(|id| artifact_stem(id)).collect();
        assert_eq!(stems.len(), ids.len());
    }

    #[test]
    fn text_is_rasterised() {
        let dir = tempfile::tempdir().unwrap();
        let plot = PlotConfig {
            width: 200,
            height: 80,
        };
        let renderer = PlotRenderer::new(dir.path(), &plot, MissionColors::default());
        let path = dir.path().join("text.png");
        renderer
            .render_png(&path, |root| {
                let style = ("sans-serif", 40).into_font().color(&BLACK);
                root.draw_text("SED", &style, (10, 10)).map_err(draw_err)
            })
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        let inked = img.pixels().filter(|p| p.0 != [255, 255, 255]).count();
        assert!(inked > 50, "only {inked} non-white pixels");
    }

    #[test]
    fn padded_range_handles_flat_and_empty() {
        let r = padded_range([1.0, 1.0].into_iter()).unwrap();
        assert!(r.start < 1.0 && r.end > 1.0);
        let r = padded_range([0.0, 10.0].into_iter()).unwrap();
        assert_eq!(r, -0.5..10.5);
        assert!(padded_range(std::iter::empty()).is_none());
    }

    #[test]
    fn publish_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("img.png");
        publish_png(&path, 2, 2, vec![255u8; 12]).unwrap();
        assert!(path.is_file());
        assert!(!part_path(&path).exists());
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }

    #[test]
    fn publish_rejects_mismatched_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.png");
        assert!(publish_png(&path, 4, 4, vec![0u8; 3]).is_err());
        assert!(!path.exists());
    }
}

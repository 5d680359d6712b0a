//! Batch configuration.
//!
//! Everything the pipeline needs is carried in a [`ReportConfig`] that is
//! handed to the composer and the batch driver at construction time, so two
//! batches (e.g. one per mission) can run side by side with different
//! directories.
//!
//! Example `report.toml`:
//! ```toml
//! input_dir = "../outputs"
//! output_dir = "../outputs"
//!
//! [sed]
//! min_micron = 0.1
//! max_micron = 10.0
//! points = 100
//!
//! [plots]
//! width = 1000
//! height = 600
//!
//! [batch]
//! parallel = true
//! threads = 4
//! timeout_secs = 120
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CANDIDATES_FILE: &str = "top_candidates.csv";
pub const RADIO_HITS_FILE: &str = "radio_hits_clean.csv";
pub const PLOTS_DIR: &str = "plots";
pub const MANIFEST_FILE: &str = "batch_manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Root of the upstream pipeline outputs (candidate table, light curves,
    /// radio hits).
    pub input_dir: PathBuf,
    /// Where reports and plots are written.  Defaults to `input_dir`.
    pub output_dir: Option<PathBuf>,
    /// Candidate table; defaults to `<input_dir>/top_candidates.csv`.
    pub candidates: Option<PathBuf>,
    /// Radio-hits table; defaults to `<input_dir>/radio_hits_clean.csv`.
    pub radio_hits: Option<PathBuf>,
    pub sed: SedConfig,
    pub plots: PlotConfig,
    pub batch: BatchConfig,
}

/// Wavelength grid for the blackbody overlay.  Shared by every candidate of a
/// batch so SED plots stay comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SedConfig {
    pub min_micron: f64,
    pub max_micron: f64,
    pub points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub parallel: bool,
    /// Worker threads when `parallel` is set; `None` lets rayon decide.
    pub threads: Option<usize>,
    /// Per-candidate time limit; expiry fails that row only.
    pub timeout_secs: Option<u64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("outputs"),
            output_dir: None,
            candidates: None,
            radio_hits: None,
            sed: SedConfig::default(),
            plots: PlotConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl Default for SedConfig {
    fn default() -> Self {
        Self {
            min_micron: 0.1,
            max_micron: 10.0,
            points: 100,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

impl BatchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl ReportConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.input_dir)
    }

    pub fn plots_dir(&self) -> PathBuf {
        self.output_dir().join(PLOTS_DIR)
    }

    pub fn candidates_path(&self) -> PathBuf {
        self.candidates
            .clone()
            .unwrap_or_else(|| self.input_dir.join(CANDIDATES_FILE))
    }

    pub fn radio_hits_path(&self) -> PathBuf {
        self.radio_hits
            .clone()
            .unwrap_or_else(|| self.input_dir.join(RADIO_HITS_FILE))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir().join(MANIFEST_FILE)
    }

    /// Report for the candidate at `row_index` (zero-based):
    /// `report_{row_index + 1}.{extension}`.  The one-based number is what
    /// downstream tools use to find a report.
    pub fn report_path(&self, row_index: usize, extension: &str) -> PathBuf {
        self.output_dir()
            .join(format!("report_{}.{extension}", row_index + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_input_dir() {
        let cfg = ReportConfig::new("/data/run1");
        assert_eq!(cfg.output_dir(), Path::new("/data/run1"));
        assert_eq!(
            cfg.candidates_path(),
            PathBuf::from("/data/run1/top_candidates.csv")
        );
        assert_eq!(
            cfg.radio_hits_path(),
            PathBuf::from("/data/run1/radio_hits_clean.csv")
        );
        assert_eq!(cfg.plots_dir(), PathBuf::from("/data/run1/plots"));
    }

    #[test]
    fn report_numbers_are_one_based() {
        let mut cfg = ReportConfig::new("in");
        cfg.output_dir = Some(PathBuf::from("out"));
        assert_eq!(cfg.report_path(0, "html"), PathBuf::from("out/report_1.html"));
        assert_eq!(cfg.report_path(4, "json"), PathBuf::from("out/report_5.json"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: ReportConfig = toml::from_str(
            r#"
            input_dir = "x"
            [batch]
            parallel = true
            timeout_secs = 30
            "#,
        )
        .unwrap();
        assert!(cfg.batch.parallel);
        assert_eq!(cfg.batch.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.sed, SedConfig::default());
        assert_eq!(cfg.plots.width, 1000);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<ReportConfig, _> = toml::from_str("input_dri = \"x\"");
        assert!(parsed.is_err());
    }
}

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use thiserror::Error;

use super::{DocumentError, DocumentRenderer, ReportContext};
use crate::batch::CancelToken;
use crate::blackbody::{wavelength_grid, ModelError, SpectralCurve};
use crate::color::MissionColors;
use crate::config::ReportConfig;
use crate::data::loader::load_light_curve;
use crate::data::locator::{filter_radio_hits, EvidenceLocator};
use crate::data::model::{CandidateRecord, Evidence, PlotSlot, RadioHitTable};
use crate::render::{part_path, PlotKind, PlotRenderer, RenderError};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("candidate '{source_id}' cannot be modelled: {source}")]
    Model {
        source_id: String,
        #[source]
        source: ModelError,
    },
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// The caller stopped waiting for this row; nothing more is published.
    #[error("abandoned before the report was written")]
    Abandoned,
    #[error("writing report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What one composition produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedReport {
    pub report: PathBuf,
    pub plots: BTreeMap<PlotKind, PlotSlot>,
}

// ---------------------------------------------------------------------------
// ReportComposer
// ---------------------------------------------------------------------------

/// Builds the report for a single candidate: evidence lookup, the three
/// plots, the document.  Holds only read-only state, so one composer can
/// serve every worker of a batch.
pub struct ReportComposer {
    config: ReportConfig,
    locator: EvidenceLocator,
    radio: Arc<RadioHitTable>,
    plots: PlotRenderer,
    grid: Vec<f64>,
    document: Box<dyn DocumentRenderer>,
}

impl ReportComposer {
    pub fn new(
        config: ReportConfig,
        radio: Arc<RadioHitTable>,
        colors: MissionColors,
        document: Box<dyn DocumentRenderer>,
    ) -> Result<Self, ModelError> {
        let grid = wavelength_grid(&config.sed)?;
        let plots = PlotRenderer::new(config.plots_dir(), &config.plots, colors);
        Ok(ReportComposer {
            locator: EvidenceLocator::new(config.input_dir.clone()),
            config,
            radio,
            plots,
            grid,
            document,
        })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Path of the report for the candidate at `row_index` (zero-based).
    pub fn report_path(&self, row_index: usize) -> PathBuf {
        self.config
            .report_path(row_index, self.document.extension())
    }

    /// Compose the report for the candidate at `row_index`.
    ///
    /// Missing or unplottable evidence only empties the corresponding plot
    /// slot.  Errors are limited to candidates that cannot be modelled
    /// (invalid temperature or scale) and to failures writing the document.
    pub fn compose(
        &self,
        row_index: usize,
        candidate: &CandidateRecord,
    ) -> Result<ComposedReport, ComposeError> {
        self.compose_until(row_index, candidate, &CancelToken::new())
    }

    /// Like [`compose`](Self::compose), but stops publishing once `abandon`
    /// is cancelled.  The token is checked before each plot and before the
    /// document is written.
    pub fn compose_until(
        &self,
        row_index: usize,
        candidate: &CandidateRecord,
        abandon: &CancelToken,
    ) -> Result<ComposedReport, ComposeError> {
        let check = || {
            if abandon.is_cancelled() {
                Err(ComposeError::Abandoned)
            } else {
                Ok(())
            }
        };
        let source_id = candidate.source_id.as_str();
        let curve = SpectralCurve::compute(&self.grid, candidate.temperature, candidate.scale)
            .map_err(|source| ComposeError::Model {
                source_id: source_id.to_string(),
                source,
            })?;

        let mut slots = BTreeMap::new();

        let light_curve = match self.locator.locate(source_id, &candidate.mission) {
            Evidence::Present(path) => match load_light_curve(&path) {
                Ok(series) => Evidence::Present(series),
                Err(e) => {
                    warn!("{source_id}: unreadable light curve {}: {e:#}", path.display());
                    Evidence::Absent
                }
            },
            Evidence::Absent => {
                debug!("{source_id}: no light curve for mission {}", candidate.mission);
                Evidence::Absent
            }
        };
        check()?;
        let slot = self.guarded(PlotKind::LightCurve, source_id, || {
            self.plots
                .render_light_curve(source_id, &candidate.mission, &light_curve)
        });
        slots.insert(PlotKind::LightCurve, slot);

        check()?;
        let slot = self.guarded(PlotKind::Sed, source_id, || {
            self.plots.render_sed(source_id, &curve)
        });
        slots.insert(PlotKind::Sed, slot);

        let hits = filter_radio_hits(&self.radio, source_id);
        debug!("{source_id}: {} radio hits", hits.len());
        check()?;
        let slot = self.guarded(PlotKind::Radio, source_id, || {
            self.plots.render_radio(source_id, &hits)
        });
        slots.insert(PlotKind::Radio, slot);

        let report = self.report_path(row_index);
        let report_dir = report.parent().unwrap_or(Path::new("."));
        let context = ReportContext::new(candidate, &slots, report_dir);
        let bytes = self.document.render(&context)?;
        check()?;
        write_published(&report, &bytes)?;

        Ok(ComposedReport {
            report,
            plots: slots,
        })
    }

    /// Run one renderer, turning an error or a panic into an empty slot.  A
    /// plot left over from an earlier run is removed so the plots directory
    /// only holds images backed by current evidence.
    fn guarded<F>(&self, kind: PlotKind, source_id: &str, render: F) -> PlotSlot
    where
        F: FnOnce() -> Result<PlotSlot, RenderError>,
    {
        let slot = match catch_unwind(AssertUnwindSafe(render)) {
            Ok(Ok(slot)) => slot,
            Ok(Err(e)) => {
                warn!("{source_id}: {} plot failed: {e}", kind.suffix());
                Evidence::Absent
            }
            Err(payload) => {
                let e = RenderError::Panicked(panic_message(payload.as_ref()));
                warn!("{source_id}: {} plot failed: {e}", kind.suffix());
                Evidence::Absent
            }
        };
        if !slot.is_present() {
            let stale = self.plots.path_for(source_id, kind);
            if stale.exists() {
                debug!("{source_id}: removing stale {}", stale.display());
                if let Err(e) = std::fs::remove_file(&stale) {
                    warn!("{source_id}: could not remove stale {}: {e}", stale.display());
                }
            }
        }
        slot
    }
}

/// Write `bytes` to `<path>.part`, then rename over `path`.
fn write_published(path: &Path, bytes: &[u8]) -> Result<(), ComposeError> {
    let io_err = |source| ComposeError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = part_path(path);
    std::fs::write(&tmp, bytes).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        io_err(e)
    })
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

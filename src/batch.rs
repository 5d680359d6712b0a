//! Batch driver: one report per candidate, failures contained per row.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::color::MissionColors;
use crate::config::{BatchConfig, ReportConfig};
use crate::data::loader::{load_candidates, load_radio_hits};
use crate::data::model::{CandidateRecord, CandidateRow, PlotSlot};
use crate::render::{part_path, PlotKind};
use crate::report::composer::{panic_message, ComposedReport, ReportComposer};
use crate::report::DocumentRenderer;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Generated {
        report: PathBuf,
        plots: BTreeMap<PlotKind, PlotSlot>,
    },
    Failed {
        reason: String,
    },
    /// The batch was cancelled before this row started.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    pub row_index: usize,
    /// `row_index + 1`, the number in the report file name.
    pub report_number: usize,
    pub source_id: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub generated: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn from_outcomes(rows: &[RowOutcome]) -> Self {
        rows.iter().fold(BatchSummary::default(), |mut s, row| {
            match row.outcome {
                Outcome::Generated { .. } => s.generated += 1,
                Outcome::Failed { .. } => s.failed += 1,
                Outcome::Cancelled => s.cancelled += 1,
            }
            s
        })
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation: rows not yet started are skipped, rows in
/// flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// BatchDriver
// ---------------------------------------------------------------------------

pub struct BatchDriver {
    composer: Arc<ReportComposer>,
    batch: BatchConfig,
    cancel: CancelToken,
}

impl BatchDriver {
    pub fn new(composer: ReportComposer) -> Self {
        BatchDriver {
            batch: composer.config().batch.clone(),
            composer: Arc::new(composer),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Compose every candidate, in table order.  The returned outcomes are
    /// indexed like `candidates`, whether or not rows ran in parallel.
    pub fn run(&self, candidates: &[CandidateRecord]) -> Vec<RowOutcome> {
        let rows: Vec<CandidateRow> = candidates.iter().cloned().map(Ok).collect();
        self.run_rows(&rows)
    }

    /// Like [`run`](Self::run) for rows as loaded from a candidate table: a
    /// row that could not be read becomes a failed outcome at its position.
    pub fn run_rows(&self, rows: &[CandidateRow]) -> Vec<RowOutcome> {
        if !self.batch.parallel {
            return rows
                .iter()
                .enumerate()
                .map(|(i, row)| self.run_row(i, row))
                .collect();
        }

        let run_parallel = || -> Vec<RowOutcome> {
            rows.par_iter()
                .enumerate()
                .map(|(i, row)| self.run_row(i, row))
                .collect()
        };
        match self.batch.threads {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(run_parallel),
                Err(e) => {
                    warn!("Could not start {n} worker threads ({e}); using the global pool");
                    run_parallel()
                }
            },
            None => run_parallel(),
        }
    }

    fn run_row(&self, row_index: usize, row: &CandidateRow) -> RowOutcome {
        let source_id = match row {
            Ok(candidate) => candidate.source_id.clone(),
            Err(defect) => defect.source_id.clone(),
        };
        let outcome = if self.cancel.is_cancelled() {
            Outcome::Cancelled
        } else {
            let result = match row {
                Ok(candidate) => self.compose_isolated(row_index, candidate),
                Err(defect) => Err(defect.reason.clone()),
            };
            match result {
                Ok(done) => {
                    info!("Generated report: {}", done.report.display());
                    Outcome::Generated {
                        report: done.report,
                        plots: done.plots,
                    }
                }
                Err(reason) => {
                    error!("Report {} ({source_id}) failed: {reason}", row_index + 1);
                    Outcome::Failed { reason }
                }
            }
        };
        RowOutcome {
            row_index,
            report_number: row_index + 1,
            source_id,
            outcome,
        }
    }

    fn compose_isolated(
        &self,
        row_index: usize,
        candidate: &CandidateRecord,
    ) -> Result<ComposedReport, String> {
        match self.batch.timeout() {
            None => compose_caught(&self.composer, row_index, candidate, &CancelToken::new()),
            Some(limit) => compose_with_timeout(
                Arc::clone(&self.composer),
                row_index,
                candidate.clone(),
                limit,
            ),
        }
    }
}

fn compose_caught(
    composer: &ReportComposer,
    row_index: usize,
    candidate: &CandidateRecord,
    abandon: &CancelToken,
) -> Result<ComposedReport, String> {
    let compose = || composer.compose_until(row_index, candidate, abandon);
    match catch_unwind(AssertUnwindSafe(compose)) {
        Ok(Ok(done)) => Ok(done),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

/// Compose on a helper thread and give up waiting after `limit`.  On expiry
/// the helper is told to stop publishing: it finishes the step it is in but
/// writes no further plots and no report, so a row reported as failed has
/// no report file.
fn compose_with_timeout(
    composer: Arc<ReportComposer>,
    row_index: usize,
    candidate: CandidateRecord,
    limit: Duration,
) -> Result<ComposedReport, String> {
    let (tx, rx) = mpsc::channel();
    let abandon = CancelToken::new();
    let worker_abandon = abandon.clone();
    let spawned = std::thread::Builder::new()
        .name(format!("compose-{}", row_index + 1))
        .spawn(move || {
            let result = compose_caught(&composer, row_index, &candidate, &worker_abandon);
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        return Err(format!("could not start worker thread: {e}"));
    }
    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            abandon.cancel();
            Err(format!("timed out after {:.1}s", limit.as_secs_f64()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err("worker exited without a result".into()),
    }
}

// ---------------------------------------------------------------------------
// Whole-batch entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct BatchManifest<'a> {
    pub summary: BatchSummary,
    /// Report numbers follow the candidate table's row order; they identify a
    /// report only for this run of this table.
    pub rows: &'a [RowOutcome],
}

/// Load inputs described by `config`, compose every report, and write the
/// batch manifest.  Errors returned here are input-fatal; per-candidate
/// failures are inside the returned outcomes.
pub fn run_from_config(
    config: &ReportConfig,
    document: Box<dyn DocumentRenderer>,
    cancel: CancelToken,
) -> Result<Vec<RowOutcome>> {
    let rows = load_candidates(&config.candidates_path())?;
    let radio = load_radio_hits(&config.radio_hits_path())?;
    info!("{} candidates, {} radio hits", rows.len(), radio.len());

    let missions = rows.iter().filter_map(|row| row.as_ref().ok()).map(|c| &c.mission);
    let colors = MissionColors::new(missions);
    let composer = ReportComposer::new(config.clone(), Arc::new(radio), colors, document)
        .context("invalid SED wavelength grid")?;
    let driver = BatchDriver::new(composer).with_cancel_token(cancel);

    let outcomes = driver.run_rows(&rows);
    write_manifest(&config.manifest_path(), &outcomes)?;
    Ok(outcomes)
}

pub fn write_manifest(path: &Path, rows: &[RowOutcome]) -> Result<()> {
    let manifest = BatchManifest {
        summary: BatchSummary::from_outcomes(rows),
        rows,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let tmp = part_path(path);
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing manifest")?;
    std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("publishing {}", path.display()))?;
    Ok(())
}

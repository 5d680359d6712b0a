use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Evidence – explicit presence / absence of a piece of evidence
// ---------------------------------------------------------------------------

/// A piece of per-candidate evidence (or an artifact derived from it) that may
/// legitimately be missing.  Absence is a valid state, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Evidence<T> {
    Present(T),
    Absent,
}

impl<T> Evidence<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Evidence::Present(_))
    }
}

/// A plot slot in a composed report: the published image path, or nothing.
pub type PlotSlot = Evidence<PathBuf>;

// ---------------------------------------------------------------------------
// Mission – the survey a candidate came from
// ---------------------------------------------------------------------------

/// Survey tag (`kepler`, `tess`, ...).  Kept verbatim because it is also the
/// name of the light-curve directory for that survey.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Mission(String);

impl Mission {
    pub fn new(tag: impl Into<String>) -> Self {
        Mission(tag.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord – one row of the candidate table
// ---------------------------------------------------------------------------

/// One flagged source under review.  Immutable once loaded; its position in
/// the table decides the report number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub source_id: String,
    pub mission: Mission,
    pub techno_score: f64,
    pub anomaly_score: f64,
    pub transit_power: f64,
    pub ir_excess: f64,
    pub hi_hit_count: u64,
    /// Effective temperature in Kelvin, only used for the SED plot.
    pub temperature: f64,
    /// Flux normalisation applied to the blackbody model.
    pub scale: f64,
}

/// A candidate-table row whose values could not be read.  The row keeps its
/// report number; the batch records it as failed.
#[derive(Debug, Clone, PartialEq)]
pub struct RowDefect {
    /// May be empty when the id itself is missing.
    pub source_id: String,
    pub reason: String,
}

/// One row of the candidate table, in table order.
pub type CandidateRow = Result<CandidateRecord, RowDefect>;

/// Column names the candidate table must provide.
pub const CANDIDATE_COLUMNS: [&str; 9] = [
    "source_id",
    "mission",
    "techno_score",
    "anomaly_score",
    "transit_power",
    "ir_excess",
    "hi_hit_count",
    "temperature",
    "scale",
];

// ---------------------------------------------------------------------------
// Light curves
// ---------------------------------------------------------------------------

/// Ordered `(time, normalized_flux)` samples for one candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightCurveSeries {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
}

impl LightCurveSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Samples where both coordinates are finite (NaN gaps are common in
    /// processed light curves).
    pub fn finite_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time
            .iter()
            .zip(self.flux.iter())
            .map(|(&t, &f)| (t, f))
            .filter(|(t, f)| t.is_finite() && f.is_finite())
    }
}

// ---------------------------------------------------------------------------
// Radio hits
// ---------------------------------------------------------------------------

/// A single row of the global radio-hits table.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioHit {
    pub source_id: String,
    pub freq_mhz: f64,
    pub snr: f64,
}

/// The hits belonging to one candidate, as `(frequency MHz, SNR)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RadioHitSet {
    pub hits: Vec<(f64, f64)>,
}

impl RadioHitSet {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// The whole radio-hits table, loaded once per batch and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct RadioHitTable {
    pub rows: Vec<RadioHit>,
}

impl RadioHitTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

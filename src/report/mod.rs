pub mod composer;
pub mod html;
pub mod json;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::data::model::{CandidateRecord, Evidence, PlotSlot};
use crate::render::PlotKind;

/// Text shown in place of a plot that could not be produced.
pub const PLOT_UNAVAILABLE: &str = "No plot available";

#[derive(Debug, Error)]
#[error("document rendering failed: {0}")]
pub struct DocumentError(pub String);

/// Turns a report context into document bytes.  The pipeline does not care
/// which markup comes out, only that it is deterministic for a given context.
pub trait DocumentRenderer: Send + Sync {
    /// Extension of the produced file, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, context: &ReportContext) -> Result<Vec<u8>, DocumentError>;
}

// ---------------------------------------------------------------------------
// ReportContext – everything a document renderer may show
// ---------------------------------------------------------------------------

/// Scalar fields (already formatted for display) plus one link per plot
/// slot.  Links are relative to the directory holding the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportContext {
    pub fields: BTreeMap<&'static str, String>,
    pub plots: BTreeMap<PlotKind, Evidence<String>>,
}

impl ReportContext {
    pub fn new(
        candidate: &CandidateRecord,
        slots: &BTreeMap<PlotKind, PlotSlot>,
        report_dir: &Path,
    ) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("source_id", candidate.source_id.clone());
        fields.insert("mission", candidate.mission.to_string());
        fields.insert("techno_score", format_score(candidate.techno_score));
        fields.insert("anomaly_score", format_score(candidate.anomaly_score));
        fields.insert("transit_power", format_score(candidate.transit_power));
        fields.insert("ir_excess", format_score(candidate.ir_excess));
        fields.insert("hi_hit_count", candidate.hi_hit_count.to_string());
        fields.insert("temperature", format!("{:.0}", candidate.temperature));
        fields.insert("scale", format_score(candidate.scale));

        // Every slot is present in the context, absent ones included.
        let plots = PlotKind::ALL
            .iter()
            .map(|kind| {
                let link = match slots.get(kind) {
                    Some(Evidence::Present(path)) => {
                        Evidence::Present(relative_link(path, report_dir))
                    }
                    _ => Evidence::Absent,
                };
                (*kind, link)
            })
            .collect();

        ReportContext { fields, plots }
    }

    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn plot(&self, kind: PlotKind) -> Evidence<&str> {
        match self.plots.get(&kind) {
            Some(Evidence::Present(link)) => Evidence::Present(link.as_str()),
            _ => Evidence::Absent,
        }
    }
}

/// Fixed three-decimal display used for every floating-point diagnostic.
pub fn format_score(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v.is_infinite() {
        let s = if v > 0.0 { "inf" } else { "-inf" };
        s.to_string()
    } else {
        format!("{v:.3}")
    }
}

/// Path of `target` as seen from `base`, with `/` separators; falls back to
/// the full path when `target` is not under `base`.
pub fn relative_link(target: &Path, base: &Path) -> String {
    match target.strip_prefix(base) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => target.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Mission;
    use std::path::PathBuf;

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            source_id: "KIC-8462852".into(),
            mission: Mission::new("kepler"),
            techno_score: 0.91234,
            anomaly_score: 2.0,
            transit_power: -0.0004,
            ir_excess: f64::NAN,
            hi_hit_count: 7,
            temperature: 6750.0,
            scale: 1.0,
        }
    }

    #[test]
    fn scores_use_three_decimals() {
        assert_eq!(format_score(0.91234), "0.912");
        assert_eq!(format_score(2.0), "2.000");
        assert_eq!(format_score(0.0005), "0.001");
        assert_eq!(format_score(f64::NAN), "nan");
        assert_eq!(format_score(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn context_formats_fields_and_keeps_every_slot() {
        let mut slots = BTreeMap::new();
        slots.insert(
            PlotKind::Sed,
            Evidence::Present(PathBuf::from("out/plots/KIC-8462852_sed.png")),
        );
        slots.insert(PlotKind::Radio, Evidence::Absent);

        let ctx = ReportContext::new(&candidate(), &slots, Path::new("out"));
        assert_eq!(ctx.field("techno_score"), "0.912");
        assert_eq!(ctx.field("transit_power"), "-0.000");
        assert_eq!(ctx.field("ir_excess"), "nan");
        assert_eq!(ctx.field("hi_hit_count"), "7");
        assert_eq!(ctx.plots.len(), 3);
        assert_eq!(ctx.plot(PlotKind::Sed), Evidence::Present("plots/KIC-8462852_sed.png"));
        assert_eq!(ctx.plot(PlotKind::LightCurve), Evidence::Absent);
        assert_eq!(ctx.plot(PlotKind::Radio), Evidence::Absent);
    }

    #[test]
    fn links_outside_report_dir_stay_absolute() {
        assert_eq!(
            relative_link(Path::new("/srv/plots/a.png"), Path::new("/home/out")),
            "/srv/plots/a.png"
        );
    }
}

use std::path::PathBuf;

use super::model::{Evidence, Mission, RadioHitSet, RadioHitTable};

// ---------------------------------------------------------------------------
// Evidence locator: candidate → evidence on disk / in shared tables
// ---------------------------------------------------------------------------

/// Resolves where a candidate's evidence lives under the input directory.
///
/// Layout (produced by the upstream processing pipeline):
/// ```text
///  <input_dir>/
///    ├── top_candidates.csv
///    ├── radio_hits_clean.csv
///    ├── kepler/processed_<source_id>.csv
///    └── tess/processed_<source_id>.csv
/// ```
#[derive(Debug, Clone)]
pub struct EvidenceLocator {
    input_dir: PathBuf,
}

impl EvidenceLocator {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        EvidenceLocator {
            input_dir: input_dir.into(),
        }
    }

    /// Where the light curve for `(source_id, mission)` is expected to be.
    pub fn light_curve_path(&self, source_id: &str, mission: &Mission) -> PathBuf {
        self.input_dir
            .join(mission.as_str())
            .join(format!("processed_{source_id}.csv"))
    }

    /// Light-curve file for a candidate, or `Absent` when no such file exists.
    pub fn locate(&self, source_id: &str, mission: &Mission) -> Evidence<PathBuf> {
        let path = self.light_curve_path(source_id, mission);
        if path.is_file() {
            Evidence::Present(path)
        } else {
            Evidence::Absent
        }
    }
}

/// Radio hits belonging to `source_id`, in table order.  Never fails; a
/// candidate without hits gets an empty set.
pub fn filter_radio_hits(table: &RadioHitTable, source_id: &str) -> RadioHitSet {
    RadioHitSet {
        hits: table
            .rows
            .iter()
            .filter(|hit| hit.source_id == source_id)
            .map(|hit| (hit.freq_mhz, hit.snr))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::RadioHit;

    fn hit(source_id: &str, freq_mhz: f64, snr: f64) -> RadioHit {
        RadioHit {
            source_id: source_id.into(),
            freq_mhz,
            snr,
        }
    }

    #[test]
    fn missing_light_curve_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let locator = EvidenceLocator::new(dir.path());
        assert_eq!(
            locator.locate("KIC-404", &Mission::new("kepler")),
            Evidence::Absent
        );
    }

    #[test]
    fn existing_light_curve_is_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("tess")).unwrap();
        let expected = dir.path().join("tess").join("processed_TIC-7.csv");
        std::fs::write(&expected, "time,flux\n0,1\n").unwrap();

        let locator = EvidenceLocator::new(dir.path());
        assert_eq!(
            locator.locate("TIC-7", &Mission::new("tess")),
            Evidence::Present(expected)
        );
        // Same id under another mission is a different file.
        assert_eq!(
            locator.locate("TIC-7", &Mission::new("kepler")),
            Evidence::Absent
        );
    }

    #[test]
    fn radio_filter_keeps_matching_rows_only() {
        let table = RadioHitTable {
            rows: vec![
                hit("A", 1420.0, 10.0),
                hit("B", 1421.0, 5.0),
                hit("A", 1419.5, 7.5),
            ],
        };
        let hits = filter_radio_hits(&table, "A");
        assert_eq!(hits.hits, vec![(1420.0, 10.0), (1419.5, 7.5)]);
    }

    #[test]
    fn radio_filter_without_match_is_empty() {
        let table = RadioHitTable {
            rows: vec![hit("B", 1421.0, 5.0)],
        };
        assert!(filter_radio_hits(&table, "A").is_empty());
        assert!(filter_radio_hits(&RadioHitTable::default(), "A").is_empty());
    }
}

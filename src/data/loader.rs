use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{debug, warn};

use super::model::{
    CandidateRecord, CandidateRow, LightCurveSeries, Mission, RadioHit, RadioHitTable, RowDefect,
    CANDIDATE_COLUMNS,
};
use super::table::{read_csv, read_table, Cell, Table};

// ---------------------------------------------------------------------------
// Candidate table
// ---------------------------------------------------------------------------

/// Load the candidate table (`.csv` or `.parquet`).
///
/// Fatal for the batch: an unreadable file, a missing required column or a
/// duplicated `source_id`.  A row with an unreadable value is kept as a
/// [`RowDefect`] so it fails on its own.
pub fn load_candidates(path: &Path) -> Result<Vec<CandidateRow>> {
    let table = read_table(path)
        .with_context(|| format!("reading candidate table {}", path.display()))?;
    let rows = candidates_from_table(&table)?;
    debug!("Loaded {} candidates from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn candidates_from_table(table: &Table) -> Result<Vec<CandidateRow>> {
    let mut idx = [0usize; CANDIDATE_COLUMNS.len()];
    for (slot, name) in idx.iter_mut().zip(CANDIDATE_COLUMNS) {
        *slot = table.require(name, "candidate table")?;
    }

    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(table.len());

    for (row_no, row) in table.rows.iter().enumerate() {
        let source_id = cell(row, idx[0]).as_text().unwrap_or_default();
        if source_id.is_empty() {
            warn!("Candidate row {row_no}: missing source_id");
            rows.push(Err(RowDefect {
                source_id,
                reason: format!("Row {row_no}: missing source_id"),
            }));
            continue;
        }
        if !seen.insert(source_id.clone()) {
            bail!("Row {row_no}: duplicate source_id '{source_id}'");
        }

        let parsed = parse_candidate(row, &idx, row_no, source_id.clone());
        rows.push(parsed.map_err(|e| {
            warn!("Candidate {source_id}: {e:#}");
            RowDefect {
                source_id,
                reason: format!("{e:#}"),
            }
        }));
    }

    Ok(rows)
}

fn parse_candidate(
    row: &[Cell],
    idx: &[usize; CANDIDATE_COLUMNS.len()],
    row_no: usize,
    source_id: String,
) -> Result<CandidateRecord> {
    let [_, mission, techno, anomaly, transit, ir, hits, temp, scale] = *idx;
    Ok(CandidateRecord {
        mission: Mission::new(text_cell(row, mission, row_no, "mission")?),
        techno_score: float_cell(row, techno, row_no, "techno_score")?,
        anomaly_score: float_cell(row, anomaly, row_no, "anomaly_score")?,
        transit_power: float_cell(row, transit, row_no, "transit_power")?,
        ir_excess: float_cell(row, ir, row_no, "ir_excess")?,
        hi_hit_count: count_cell(row, hits, row_no, "hi_hit_count")?,
        temperature: float_cell(row, temp, row_no, "temperature")?,
        scale: float_cell(row, scale, row_no, "scale")?,
        source_id,
    })
}

// ---------------------------------------------------------------------------
// Light curves
// ---------------------------------------------------------------------------

/// Load a processed light curve (`time`, `flux` columns).
///
/// Empty cells become NaN and are skipped at plot time; non-numeric text is
/// an error, which the composer treats as a failed plot.
pub fn load_light_curve(path: &Path) -> Result<LightCurveSeries> {
    let table =
        read_csv(path).with_context(|| format!("reading light curve {}", path.display()))?;
    let t_idx = table.require("time", "light curve")?;
    let f_idx = table.require("flux", "light curve")?;

    let mut series = LightCurveSeries {
        time: Vec::with_capacity(table.len()),
        flux: Vec::with_capacity(table.len()),
    };
    for (row_no, row) in table.rows.iter().enumerate() {
        series.time.push(float_cell(row, t_idx, row_no, "time")?);
        series.flux.push(float_cell(row, f_idx, row_no, "flux")?);
    }
    Ok(series)
}

// ---------------------------------------------------------------------------
// Radio hits
// ---------------------------------------------------------------------------

/// Load the global radio-hits table (`source_id`, `freq`, `snr`).
///
/// A table that does not exist is read as empty: every candidate then simply
/// has no radio evidence.
pub fn load_radio_hits(path: &Path) -> Result<RadioHitTable> {
    if !path.exists() {
        warn!(
            "Radio hits table {} not found; no candidate will have radio evidence",
            path.display()
        );
        return Ok(RadioHitTable::default());
    }
    let table = read_table(path)
        .with_context(|| format!("reading radio hits table {}", path.display()))?;
    radio_hits_from_table(&table)
}

/// Rows with an unreadable value are skipped with a warning; they only take
/// evidence away from the candidate they name.
pub fn radio_hits_from_table(table: &Table) -> Result<RadioHitTable> {
    let sid = table.require("source_id", "radio hits table")?;
    let freq = table.require("freq", "radio hits table")?;
    let snr = table.require("snr", "radio hits table")?;

    let parse = |row_no: usize, row: &[Cell]| -> Result<RadioHit> {
        Ok(RadioHit {
            source_id: text_cell(row, sid, row_no, "source_id")?,
            freq_mhz: float_cell(row, freq, row_no, "freq")?,
            snr: float_cell(row, snr, row_no, "snr")?,
        })
    };

    let mut rows = Vec::with_capacity(table.len());
    for (row_no, row) in table.rows.iter().enumerate() {
        match parse(row_no, row) {
            Ok(hit) => rows.push(hit),
            Err(e) => warn!("Skipping radio hit: {e:#}"),
        }
    }

    Ok(RadioHitTable { rows })
}

// -- Cell helpers --

fn cell(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&Cell::Null)
}

fn text_cell(row: &[Cell], idx: usize, row_no: usize, col: &str) -> Result<String> {
    match cell(row, idx).as_text() {
        Some(s) => Ok(s),
        None => bail!("Row {row_no}, {col}: missing value"),
    }
}

fn float_cell(row: &[Cell], idx: usize, row_no: usize, col: &str) -> Result<f64> {
    let value = cell(row, idx);
    match value.as_f64() {
        Some(v) => Ok(v),
        None => bail!("Row {row_no}, {col}: '{value}' is not a number"),
    }
}

fn count_cell(row: &[Cell], idx: usize, row_no: usize, col: &str) -> Result<u64> {
    let value = cell(row, idx);
    match value.as_count() {
        Some(v) => Ok(v),
        None => bail!("Row {row_no}, {col}: '{value}' is not a non-negative integer"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    const HEADER: &str =
        "source_id,mission,techno_score,anomaly_score,transit_power,ir_excess,hi_hit_count,temperature,scale";

    #[test]
    fn loads_candidates_in_table_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "top_candidates.csv",
            &format!(
                "{HEADER},extra\n\
                 KIC-2,kepler,0.9,0.5,1.25,0.1,3,5778,1.0,x\n\
                 TIC-1,tess,0.8,0.4,0.5,0.2,0,4000,2.0,y\n"
            ),
        );
        let candidates: Vec<CandidateRecord> = load_candidates(&path)
            .unwrap()
            .into_iter()
            .map(|row| row.unwrap())
            .collect();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].source_id, "KIC-2");
        assert_eq!(candidates[0].mission.as_str(), "kepler");
        assert_eq!(candidates[0].hi_hit_count, 3);
        assert_eq!(candidates[1].source_id, "TIC-1");
        assert_eq!(candidates[1].scale, 2.0);
    }

    #[test]
    fn missing_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "top_candidates.csv",
            "source_id,mission,techno_score\nA,kepler,0.1\n",
        );
        let err = load_candidates(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing required column 'anomaly_score'"));
    }

    #[test]
    fn duplicate_source_id_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "top_candidates.csv",
            &format!("{HEADER}\nA,kepler,0,0,0,0,0,5000,1\nA,tess,0,0,0,0,0,5000,1\n"),
        );
        let err = load_candidates(&path).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate source_id 'A'"));
    }

    #[test]
    fn unreadable_value_fails_only_its_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "top_candidates.csv",
            &format!(
                "{HEADER}\n\
                 A,kepler,0.5,0,0,0,1,5000,1\n\
                 B,kepler,0.5,0,0,0,1,n/a,1\n\
                 C,tess,0.5,0,0,0,-2,4000,1\n\
                 ,tess,0.5,0,0,0,0,4000,1\n\
                 E,tess,,0,0,0,0,4000,1\n"
            ),
        );
        let rows = load_candidates(&path).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows[0].is_ok());

        let defect = rows[1].as_ref().unwrap_err();
        assert_eq!(defect.source_id, "B");
        assert!(defect.reason.contains("temperature"), "{}", defect.reason);

        let defect = rows[2].as_ref().unwrap_err();
        assert_eq!(defect.source_id, "C");
        assert!(defect.reason.contains("hi_hit_count"));

        assert_eq!(rows[3].as_ref().unwrap_err().source_id, "");
        // An empty numeric cell is a missing value, not a defect.
        assert!(rows[4].as_ref().unwrap().techno_score.is_nan());
    }

    #[test]
    fn unreadable_table_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_candidates(&dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn light_curve_with_gaps_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let ok = write_file(dir.path(), "ok.csv", "time,flux\n0.0,1.0\n0.5,\n1.0,0.98\n");
        let series = load_light_curve(&ok).unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.flux[1].is_nan());

        let bad = write_file(dir.path(), "bad.csv", "time,flux\n0.0,bright\n");
        let err = load_light_curve(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("not a number"));
    }

    #[test]
    fn missing_radio_table_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_radio_hits(&dir.path().join("radio_hits_clean.csv")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn radio_table_parses_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "radio_hits_clean.csv",
            "source_id,freq,snr,drift\nA,1420.4,12.5,0.1\nB,1420.6,8.0,0.0\n",
        );
        let table = load_radio_hits(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].freq_mhz, 1420.4);
        assert_eq!(table.rows[1].source_id, "B");
    }

    #[test]
    fn malformed_radio_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "radio_hits_clean.csv",
            "source_id,freq,snr\nA,1420.4,12.5\nB,L-band,8.0\nC,1421.0,9.0\n",
        );
        let table = load_radio_hits(&path).unwrap();
        let ids: Vec<&str> = table.rows.iter().map(|h| h.source_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn radio_table_without_required_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "hits.csv", "source_id,freq\nA,1420.4\n");
        let err = load_radio_hits(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing required column 'snr'"));
    }
}

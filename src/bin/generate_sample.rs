use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a small synthetic pipeline output tree to try the report builder on.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Directory to create
    #[arg(default_value = "sample_outputs")]
    dir: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

struct SampleCandidate {
    source_id: &'static str,
    mission: &'static str,
    temperature: f64,
    scale: f64,
    /// Fractional transit depth; `None` leaves the light curve out.
    transit_depth: Option<f64>,
    radio_hits: usize,
}

const fn sample(
    source_id: &'static str,
    mission: &'static str,
    temperature: f64,
    scale: f64,
    transit_depth: Option<f64>,
    radio_hits: usize,
) -> SampleCandidate {
    SampleCandidate {
        source_id,
        mission,
        temperature,
        scale,
        transit_depth,
        radio_hits,
    }
}

const CANDIDATES: [SampleCandidate; 6] = [
    sample("KIC-8462852", "kepler", 6750.0, 1.0, Some(0.2), 3),
    sample("KIC-5520878", "kepler", 5200.0, 0.8, Some(0.01), 0),
    sample("TIC 400799224", "tess", 3400.0, 2.5, Some(0.05), 5),
    sample("TIC-141146667", "tess", 4100.0, 1.2, None, 1),
    sample("EPIC-204278916", "k2", 3100.0, 1.0, Some(0.65), 0),
    sample("KIC-12557548", "kepler", 4300.0, 0.6, None, 0),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// 30 days at ~30 minute cadence with one box-shaped transit per 7.3 days.
fn light_curve(depth: f64, rng: &mut SimpleRng) -> Vec<(f64, f64)> {
    let period = 7.3;
    let duration = 0.25;
    (0..1440)
        .map(|i| {
            let t = i as f64 * 0.0208;
            let phase = (t + 1.0) % period;
            let dip = if phase < duration { depth } else { 0.0 };
            (t, 1.0 - dip + rng.gauss(0.0, 0.002))
        })
        .collect()
}

fn write_light_curve(path: &Path, points: &[(f64, f64)]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(["time", "flux"])?;
    for (t, f) in points {
        wtr.write_record([format!("{t:.5}"), format!("{f:.6}")])?;
    }
    wtr.flush()?;
    Ok(())
}

fn candidate_batch(rng: &mut SimpleRng) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("source_id", DataType::Utf8, false),
        Field::new("mission", DataType::Utf8, false),
        Field::new("techno_score", DataType::Float64, false),
        Field::new("anomaly_score", DataType::Float64, false),
        Field::new("transit_power", DataType::Float64, false),
        Field::new("ir_excess", DataType::Float64, false),
        Field::new("hi_hit_count", DataType::UInt64, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("scale", DataType::Float64, false),
    ]));

    let n = CANDIDATES.len();
    let scores: Vec<f64> = (0..n).map(|i| 0.95 - 0.1 * i as f64).collect();
    let anomaly: Vec<f64> = (0..n).map(|_| rng.next_f64() * 4.0).collect();
    let transit: Vec<f64> = CANDIDATES
        .iter()
        .map(|c| c.transit_depth.unwrap_or(0.0) * 10.0)
        .collect();
    let ir: Vec<f64> = (0..n).map(|_| rng.gauss(0.0, 0.3)).collect();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from_iter_values(CANDIDATES.iter().map(|c| c.source_id))),
            Arc::new(StringArray::from_iter_values(CANDIDATES.iter().map(|c| c.mission))),
            Arc::new(Float64Array::from(scores)),
            Arc::new(Float64Array::from(anomaly)),
            Arc::new(Float64Array::from(transit)),
            Arc::new(Float64Array::from(ir)),
            Arc::new(UInt64Array::from_iter_values(
                CANDIDATES.iter().map(|c| c.radio_hits as u64),
            )),
            Arc::new(Float64Array::from_iter_values(CANDIDATES.iter().map(|c| c.temperature))),
            Arc::new(Float64Array::from_iter_values(CANDIDATES.iter().map(|c| c.scale))),
        ],
    )
    .context("building candidate batch")
}

fn write_csv_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let header: Vec<&str> = batch.schema_ref().fields().iter().map(|f| f.name().as_str()).collect();
    wtr.write_record(&header)?;
    for row in 0..batch.num_rows() {
        let record: Vec<String> = batch
            .columns()
            .iter()
            .map(|col| arrow::util::display::array_value_to_string(col, row))
            .collect::<Result<_, _>>()?;
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_parquet_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn write_radio_hits(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(["source_id", "freq", "snr"])?;
    let mut written = 0;
    for c in &CANDIDATES {
        for _ in 0..c.radio_hits {
            let freq = 1420.405 + rng.gauss(0.0, 2.0);
            let snr = 5.0 + rng.next_f64() * 20.0;
            wtr.write_record([c.source_id.to_string(), format!("{freq:.4}"), format!("{snr:.2}")])?;
            written += 1;
        }
    }
    wtr.flush()?;
    Ok(written)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    std::fs::create_dir_all(&args.dir)
        .with_context(|| format!("creating {}", args.dir.display()))?;

    let batch = candidate_batch(&mut rng)?;
    write_csv_batch(&args.dir.join("top_candidates.csv"), &batch)?;
    write_parquet_batch(&args.dir.join("top_candidates.parquet"), &batch)?;
    println!("{}", pretty_format_batches(std::slice::from_ref(&batch))?);

    let mut curves = 0;
    for c in &CANDIDATES {
        if let Some(depth) = c.transit_depth {
            let path = args
                .dir
                .join(c.mission)
                .join(format!("processed_{}.csv", c.source_id));
            write_light_curve(&path, &light_curve(depth, &mut rng))?;
            curves += 1;
        }
    }
    let hits = write_radio_hits(&args.dir.join("radio_hits_clean.csv"), &mut rng)?;

    println!(
        "Wrote {} candidates, {curves} light curves and {hits} radio hits to {}",
        CANDIDATES.len(),
        args.dir.display()
    );
    Ok(())
}

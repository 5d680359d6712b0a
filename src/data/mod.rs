/// Data layer: candidate and evidence types, table loading, evidence lookup.
///
/// Architecture:
/// ```text
///  top_candidates.{csv,parquet}   radio_hits_clean.csv   <mission>/processed_<id>.csv
///            │                            │                          │
///            ▼                            ▼                          ▼
///     table → loader               table → loader                 locator
///            │                            │                          │
///            ▼                            ▼                          ▼
///   Vec<CandidateRecord>           RadioHitTable             Evidence<PathBuf>
///                                         │
///                                         ▼
///                                  filter_radio_hits → RadioHitSet
/// ```

pub mod loader;
pub mod locator;
pub mod model;
pub mod table;

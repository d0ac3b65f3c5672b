//! Balanced synthetic dataset generation and its CSV encoding.
//!
//! Rows are grouped per label in `RiskLevel::ALL` order; each row merges one
//! terrain and one weather fragment drawn under the label's bias. The CSV
//! header is the schema feature order followed by `risk_level`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TrekError};
use crate::schema::{feature_names, RiskLevel, TrailSegment, TARGET_COLUMN};
use crate::simulate::{sample_segment, RiskBias};

/// A labeled trail segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetRow {
    pub segment: TrailSegment,
    pub label: RiskLevel,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub rows: Vec<DatasetRow>,
}

/// On-disk row layout. Field order is the column order.
#[derive(Serialize, Deserialize)]
struct CsvRow {
    slope_angle: f64,
    altitude_change: f64,
    weather_severity: i32,
    trail_difficulty: i32,
    path_width_m: f64,
    visibility_km: f64,
    risk_level: RiskLevel,
}

impl From<&DatasetRow> for CsvRow {
    fn from(row: &DatasetRow) -> Self {
        let s = &row.segment;
        CsvRow {
            slope_angle: s.slope_angle,
            altitude_change: s.altitude_change,
            weather_severity: s.weather_severity,
            trail_difficulty: s.trail_difficulty,
            path_width_m: s.path_width_m,
            visibility_km: s.visibility_km,
            risk_level: row.label,
        }
    }
}

impl From<CsvRow> for DatasetRow {
    fn from(r: CsvRow) -> Self {
        DatasetRow {
            segment: TrailSegment {
                slope_angle: r.slope_angle,
                altitude_change: r.altitude_change,
                weather_severity: r.weather_severity,
                trail_difficulty: r.trail_difficulty,
                path_width_m: r.path_width_m,
                visibility_km: r.visibility_km,
            },
            label: r.risk_level,
        }
    }
}

/// Expected CSV header: features in schema order, then the target column.
pub fn csv_header() -> Vec<String> {
    let mut header = feature_names();
    header.push(TARGET_COLUMN.to_string());
    header
}

/// Generate `n_per_class` rows for every risk level from a single seeded stream.
pub fn generate(n_per_class: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = Vec::with_capacity(n_per_class * RiskLevel::ALL.len());
    for label in RiskLevel::ALL {
        let bias = RiskBias::from(label);
        debug!(label = %label, bias = bias.tag(), n_per_class, "generating rows");
        for _ in 0..n_per_class {
            rows.push(DatasetRow { segment: sample_segment(&mut rng, bias), label });
        }
    }
    info!(rows = rows.len(), n_per_class, seed, "generated synthetic dataset");
    Dataset { rows }
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row count per label, in label order. Labels with no rows are omitted.
    pub fn label_counts(&self) -> BTreeMap<RiskLevel, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.rows {
            *counts.entry(row.label).or_insert(0) += 1;
        }
        counts
    }

    // ── CSV encoding ──────────────────────────────────────────────────────

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            w.write_record(csv_header())?;
        }
        for row in &self.rows {
            w.serialize(CsvRow::from(row))?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(buf)
    }

    /// Decode a dataset, validating the header against the schema.
    /// `source_name` is only used in diagnostics.
    pub fn read_csv<R: io::Read>(reader: R, source_name: &str) -> Result<Dataset> {
        let mut r = csv::Reader::from_reader(reader);
        let header: Vec<String> = r.headers()?.iter().map(str::to_string).collect();
        let expected = csv_header();
        if header != expected {
            return Err(TrekError::MalformedDataset {
                line: 1,
                message: format!("header {header:?} does not match schema {expected:?}"),
            });
        }

        let mut rows = Vec::new();
        for record in r.deserialize::<CsvRow>() {
            let row = record.map_err(|e| TrekError::MalformedDataset {
                line: e.position().map_or(0, |p| p.line()),
                message: e.to_string(),
            })?;
            rows.push(DatasetRow::from(row));
        }

        if rows.is_empty() {
            return Err(TrekError::EmptyDataset { source_name: source_name.to_string() });
        }
        Ok(Dataset { rows })
    }

    // ── Files ─────────────────────────────────────────────────────────────

    /// Write the CSV file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_csv_bytes()?)?;
        info!(path = %path.display(), rows = self.rows.len(), "dataset written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Dataset> {
        let file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TrekError::DatasetNotFound { path: path.to_path_buf() });
            }
            Err(e) => return Err(e.into()),
        };
        let dataset = Dataset::read_csv(io::BufReader::new(file), &path.display().to_string())?;
        info!(path = %path.display(), rows = dataset.len(), "dataset loaded");
        Ok(dataset)
    }
}

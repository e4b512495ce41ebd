use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Deserialize)]
struct DitMeasurement {
    et: f64,
    e_minus_ei: f64,
    dit_estimate: f64,
    #[serde(default = "resolved_by_default")]
    peak_resolved: bool,
}

fn resolved_by_default() -> bool {
    true
}

/// Dit extracted per trap level, as written to the data file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DitMeasurements {
    pub et: Vec<f64>,
    pub e_minus_ei: Vec<f64>,
    pub dit: Vec<f64>,
    pub peak_resolved: Vec<bool>,
}

impl DitMeasurements {
    pub fn len(&self) -> usize {
        self.et.len()
    }

    pub fn is_empty(&self) -> bool {
        self.et.is_empty()
    }

    /// Rows whose Gp/w peak lay inside the frequency sweep.
    pub fn resolved(&self) -> DitMeasurements {
        let mut out = DitMeasurements::default();
        for i in (0..self.len()).filter(|&i| self.peak_resolved[i]) {
            out.et.push(self.et[i]);
            out.e_minus_ei.push(self.e_minus_ei[i]);
            out.dit.push(self.dit[i]);
            out.peak_resolved.push(true);
        }
        out
    }
}

/// Reads the `et`, `e_minus_ei`, `dit_estimate` and `peak_resolved` columns;
/// other columns are ignored.
pub fn read_csv<P: AsRef<Path>>(file_path: P) -> Result<DitMeasurements> {
    let csv_text = fs::read_to_string(file_path)?;
    parse_csv(&csv_text)
}

pub fn parse_csv(csv_text: &str) -> Result<DitMeasurements> {
    let mut measurements = DitMeasurements::default();
    let mut rdr = csv::Reader::from_reader(csv_text.as_bytes());
    for result in rdr.deserialize() {
        let record: DitMeasurement = result?;
        measurements.et.push(record.et);
        measurements.e_minus_ei.push(record.e_minus_ei);
        measurements.dit.push(record.dit_estimate);
        measurements.peak_resolved.push(record.peak_resolved);
    }

    Ok(measurements)
}

#[test]
fn test_parse_data_csv() {
    let text = "et,e_minus_ei,psi_s,dit_estimate\n0.2,0.36,0.0,1.5e11\n0.3,0.26,-0.1,9e10\n";
    let m = parse_csv(text).unwrap();
    assert_eq!(m.len(), 2);
    assert_eq!(m.et, vec![0.2, 0.3]);
    assert_eq!(m.e_minus_ei, vec![0.36, 0.26]);
    assert_eq!(m.dit, vec![1.5e11, 9e10]);
    assert_eq!(m.peak_resolved, vec![true, true]);
}

#[test]
fn test_unresolved_rows_are_dropped() {
    let text = "et,e_minus_ei,dit_estimate,peak_resolved\n\
                0.2,0.36,1.5e11,true\n\
                0.8,-0.24,2e11,false\n";
    let m = parse_csv(text).unwrap();
    assert_eq!(m.len(), 2);
    let r = m.resolved();
    assert_eq!(r.len(), 1);
    assert_eq!(r.et, vec![0.2]);
    assert_eq!(r.dit, vec![1.5e11]);
}

#[test]
fn test_parse_rejects_missing_column() {
    let text = "et,psi_s\n0.2,0.0\n";
    assert!(parse_csv(text).is_err());
}

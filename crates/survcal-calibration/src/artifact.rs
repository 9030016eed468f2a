//! CSV persistence of calibration results.
//!
//! The artifact has a header row followed by one row per prior draw:
//!
//! ```text
//! Cohort ID,Likelihood Weight,Mortality Prob
//! 0,0.0041,0.0712
//! ```
//!
//! Columns are read by position, so the header text itself is not checked.

use std::{fmt::Display, path::Path};

use serde::{Deserialize, Serialize};

use crate::CalibrationError;

/// Number of columns of a calibration artifact.
pub const ARTIFACT_COLUMNS: usize = 3;

/// One weighted prior draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRow {
    #[serde(rename = "Cohort ID")]
    pub cohort_id: u64,
    /// Normalized likelihood weight.
    #[serde(rename = "Likelihood Weight")]
    pub weight: f64,
    #[serde(rename = "Mortality Prob")]
    pub mortality_prob: f64,
}

/// Writes `rows` with the artifact header, replacing any existing file.
///
/// # Errors
///
/// Returns [`CalibrationError::Io`] if the file cannot be written.
pub fn write_artifact<P>(path: P, rows: &[CalibrationRow]) -> Result<(), CalibrationError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|source| io_error(path, source))?;
    log::info!("Wrote {} calibration rows to {}", rows.len(), path.display());
    Ok(())
}

/// Reads an artifact written by [`write_artifact`].
///
/// # Errors
///
/// Returns [`CalibrationError::ArtifactFormat`] if a row does not have three
/// numeric columns or a cohort id is not a non-negative integer, and
/// [`CalibrationError::Io`] if the file cannot be read.
pub fn read_artifact<P>(path: P) -> Result<Vec<CalibrationRow>, CalibrationError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let columns = read_columns(path, ARTIFACT_COLUMNS)?;
    let [ids, weights, probs] = &columns[..] else {
        unreachable!("read_columns returns exactly {ARTIFACT_COLUMNS} columns")
    };

    ids.iter()
        .zip(weights)
        .zip(probs)
        .enumerate()
        .map(|(i, ((&id, &weight), &mortality_prob))| {
            let cohort_id = cohort_id_from_f64(id).ok_or_else(|| CalibrationError::ArtifactFormat {
                path: path.display().to_string(),
                // header occupies line 1
                line: i as u64 + 2,
                reason: format!("cohort id {id} is not a non-negative integer"),
            })?;
            Ok(CalibrationRow {
                cohort_id,
                weight,
                mortality_prob,
            })
        })
        .collect()
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn cohort_id_from_f64(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < u64::MAX as f64)
        .then_some(value as u64)
}

/// Reads a numeric CSV file column by column, skipping the header row.
///
/// Returns `n_cols` vectors of equal length.
///
/// # Errors
///
/// Returns [`CalibrationError::ArtifactFormat`] if a row does not have
/// exactly `n_cols` fields or a field is not a number, and
/// [`CalibrationError::Io`] if the file cannot be read.
pub fn read_columns<P>(path: P, n_cols: usize) -> Result<Vec<Vec<f64>>, CalibrationError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut columns = vec![vec![]; n_cols];
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let line = record.position().map_or(0, csv::Position::line);
        let format_error = |reason: String| CalibrationError::ArtifactFormat {
            path: path.display().to_string(),
            line,
            reason,
        };

        if record.len() != n_cols {
            return Err(format_error(format!(
                "expected {n_cols} columns, found {}",
                record.len()
            )));
        }
        for (column, field) in columns.iter_mut().zip(&record) {
            let value = field
                .trim()
                .parse::<f64>()
                .map_err(|e| format_error(format!("field {field:?} is not a number: {e}")))?;
            column.push(value);
        }
    }
    Ok(columns)
}

/// Writes `header` followed by `rows`, replacing any existing file.
///
/// # Errors
///
/// Returns [`CalibrationError::Io`] if the file cannot be written.
pub fn write_rows<P, I, R, T>(path: P, header: &[&str], rows: I) -> Result<(), CalibrationError>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = T>,
    T: Display,
{
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    writer.write_record(header).map_err(|e| csv_error(path, e))?;
    for row in rows {
        writer
            .write_record(row.into_iter().map(|v| v.to_string()))
            .map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|source| io_error(path, source))?;
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> CalibrationError {
    CalibrationError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn csv_error(path: &Path, err: csv::Error) -> CalibrationError {
    let line = err.position().map_or(0, csv::Position::line);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(source) => io_error(path, source),
        _ => CalibrationError::ArtifactFormat {
            path: path.display().to_string(),
            line,
            reason,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn rows() -> Vec<CalibrationRow> {
        vec![
            CalibrationRow {
                cohort_id: 0,
                weight: 0.25,
                mortality_prob: 0.071_234_5,
            },
            CalibrationRow {
                cohort_id: 1,
                weight: 0.75,
                mortality_prob: 0.1,
            },
        ]
    }

    #[test]
    fn test_header_and_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("CalibrationResults.csv");
        write_artifact(&path, &rows()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().next(),
            Some("Cohort ID,Likelihood Weight,Mortality Prob")
        );
        assert_eq!(read_artifact(&path).unwrap(), rows());
    }

    #[test]
    fn test_read_columns_is_column_major() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");
        fs::write(&path, "a,b\n1,2\n3, 4.5\n").unwrap();
        assert_eq!(
            read_columns(&path, 2).unwrap(),
            vec![vec![1.0, 3.0], vec![2.0, 4.5]]
        );
    }

    #[test]
    fn test_wrong_column_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "a,b,c\n0,0.5,0.1\n1,0.5\n").unwrap();
        let err = read_artifact(&path).unwrap_err();
        assert!(
            matches!(err, CalibrationError::ArtifactFormat { line: 3, .. }),
            "{err:?}"
        );
    }

    #[test]
    fn test_non_numeric_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "a,b,c\n0,heavy,0.1\n").unwrap();
        assert!(matches!(
            read_artifact(&path),
            Err(CalibrationError::ArtifactFormat { line: 2, .. })
        ));
    }

    #[test]
    fn test_fractional_cohort_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "a,b,c\n0,0.5,0.1\n1.5,0.5,0.1\n").unwrap();
        assert!(matches!(
            read_artifact(&path),
            Err(CalibrationError::ArtifactFormat { line: 3, .. })
        ));
    }

    #[test]
    fn test_cohort_id_beyond_u64_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        // 2^64 is exactly representable as f64 but not as u64
        fs::write(&path, "a,b,c\n18446744073709551616,1.0,0.1\n").unwrap();
        assert!(matches!(
            read_artifact(&path),
            Err(CalibrationError::ArtifactFormat { line: 2, .. })
        ));

        // Largest f64 below 2^64
        fs::write(&path, "a,b,c\n18446744073709549568,1.0,0.1\n").unwrap();
        let rows = read_artifact(&path).unwrap();
        assert_eq!(rows[0].cohort_id, 18_446_744_073_709_549_568);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_artifact(dir.path().join("missing.csv")),
            Err(CalibrationError::Io { .. })
        ));
    }

    #[test]
    fn test_write_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("curve.csv");
        write_rows(&path, &["Time", "Alive"], [[0, 10], [3, 7]]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Time,Alive\n0,10\n3,7\n");
    }
}

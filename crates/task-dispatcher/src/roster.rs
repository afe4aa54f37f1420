//! Roster loading: one row per student endpoint

use anyhow::{Context, Result};
use chrono::Utc;
use grader_common::Submission;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Load every roster row, in file order
///
/// A row that cannot be parsed becomes a blank submission so that row
/// indices (and therefore template assignment) stay stable; validation
/// later skips it.
pub fn load_roster(path: &Path) -> Result<Vec<Submission>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open roster {}", path.display()))?;

    let mut submissions = Vec::new();
    for (index, row) in reader.deserialize::<Submission>().enumerate() {
        match row {
            Ok(submission) => submissions.push(submission),
            Err(e) => {
                warn!("Roster row {} is unreadable: {}", index + 1, e);
                submissions.push(Submission::default());
            }
        }
    }

    info!("Loaded {} submissions from {}", submissions.len(), path.display());
    Ok(submissions)
}

#[derive(Serialize)]
struct SampleRow<'a> {
    timestamp: String,
    email: &'a str,
    endpoint: &'a str,
    secret: &'a str,
}

/// Write a one-row roster showing the expected columns
pub fn write_sample(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.serialize(SampleRow {
        timestamp: Utc::now().to_rfc3339(),
        email: "student@example.com",
        endpoint: "http://localhost:8000/api/endpoint",
        secret: "your_secret_key",
    })?;
    writer.flush()?;

    info!("Created sample roster {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_roster_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submissions.csv");

        write_sample(&path).unwrap();
        let roster = load_roster(&path).unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].email, "student@example.com");
        assert_eq!(roster[0].endpoint, "http://localhost:8000/api/endpoint");
        assert!(roster[0].validate().is_ok());
    }

    #[test]
    fn test_blank_and_short_rows_keep_their_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submissions.csv");
        std::fs::write(
            &path,
            "timestamp,email,endpoint,secret\n\
             2025-01-01,a@example.com,http://a:8000, s1 \n\
             2025-01-01,b@example.com,,s2\n\
             2025-01-01,c@example.com\n\
             2025-01-01,d@example.com,http://d:8000,s4\n",
        )
        .unwrap();

        let roster = load_roster(&path).unwrap();

        assert_eq!(roster.len(), 4);
        assert_eq!(roster[0].secret, "s1");
        assert!(roster[1].validate().is_err());
        assert!(roster[2].validate().is_err());
        assert_eq!(roster[3].email, "d@example.com");
    }

    #[test]
    fn test_missing_roster_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_roster(&dir.path().join("missing.csv")).is_err());
    }
}

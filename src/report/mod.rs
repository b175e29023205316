//! Report generation for analysis results
//!
//! Output formatters for a batch of verdicts:
//!
//! - **HTML**: Interactive report with D3.js charts, plus the single-result
//!   authenticity certificate ([`html::write_certificate`])
//! - **JSON**: Machine-readable format for programmatic consumption
//! - **CSV**: Spreadsheet-compatible format for bulk analysis
//!
//! Renderers only read results; checks and labels pass through untouched.
//!
//! # Usage
//!
//! ```ignore
//! use verisight::report;
//!
//! // Automatically picks format based on extension
//! report::generate("report.html", &results)?;  // HTML
//! report::generate("report.json", &results)?;  // JSON
//! report::generate("report.csv", &results)?;   // CSV
//! ```

pub mod csv;
pub mod html;
pub mod json;

use crate::analyzer::{AuthenticityLabel, FileAnalysis};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, results: &[FileAnalysis]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "html" | "htm" => html::write(&mut file, results),
        "json" => json::write(&mut file, results),
        _ => csv::write(&mut file, results),
    }
}

/// Summary statistics for a batch of results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub organic: usize,
    pub inconclusive: usize,
    pub synthetic: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_results(results: &[FileAnalysis]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for r in results {
            match r.result.authenticity_label {
                AuthenticityLabel::LikelyOrganic => summary.organic += 1,
                AuthenticityLabel::Inconclusive => summary.inconclusive += 1,
                AuthenticityLabel::LikelySynthetic => summary.synthetic += 1,
                AuthenticityLabel::Error => summary.error += 1,
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Check, Modality, ModalityDetails, ModalityResult, SentimentLabel};

    // ==========================================================================
    // SUMMARY STATISTICS TESTS
    // ==========================================================================
    //
    // The Summary struct counts verdict labels for a batch of files.
    // This is displayed at the top of reports to give an overview.
    // ==========================================================================

    fn create_test_result(failures: usize) -> FileAnalysis {
        let checks = (0..3)
            .map(|i| {
                let name = format!("Check {}", i);
                if i < failures {
                    Check::fail(&name, "test", "bad")
                } else {
                    Check::pass(&name, "test", "good")
                }
            })
            .collect();
        FileAnalysis {
            file_path: "/test/sample.txt".to_string(),
            file_name: "sample.txt".to_string(),
            modality: Some(Modality::Text),
            result: ModalityResult::from_checks(
                checks,
                ModalityDetails::None,
                SentimentLabel::Neutral,
                50,
            ),
        }
    }

    fn create_error_result() -> FileAnalysis {
        FileAnalysis {
            result: ModalityResult::failure(
                Some(Modality::Text),
                &crate::error::ForensicError::decode("bad"),
            ),
            ..create_test_result(0)
        }
    }

    #[test]
    fn test_summary_empty() {
        let summary = Summary::from_results(&[]);
        assert_eq!(summary, Summary::default());
    }

    #[test]
    fn test_summary_all_organic() {
        // One failure is still organic
        let results = vec![create_test_result(0), create_test_result(1), create_test_result(0)];
        let summary = Summary::from_results(&results);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.organic, 3);
        assert_eq!(summary.inconclusive, 0);
        assert_eq!(summary.synthetic, 0);
    }

    #[test]
    fn test_summary_mixed() {
        let results = vec![
            create_test_result(0),
            create_test_result(1),
            create_test_result(2),
            create_test_result(3),
            create_error_result(),
        ];
        let summary = Summary::from_results(&results);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.organic, 2);
        assert_eq!(summary.inconclusive, 1);
        assert_eq!(summary.synthetic, 1);
        assert_eq!(summary.error, 1);
    }

    // ==========================================================================
    // FORMAT SELECTION TESTS
    // ==========================================================================

    #[test]
    fn test_generate_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![create_test_result(2)];

        let html_path = dir.path().join("r.HTML");
        generate(&html_path, &results).unwrap();
        assert!(std::fs::read_to_string(&html_path).unwrap().starts_with("<!DOCTYPE html>"));

        let json_path = dir.path().join("r.json");
        generate(&json_path, &results).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(v["summary"]["inconclusive"], 1);

        let csv_path = dir.path().join("r.txt");
        generate(&csv_path, &results).unwrap();
        assert!(std::fs::read_to_string(&csv_path).unwrap().starts_with(csv::HEADER));
    }
}

//! JSON report output

use crate::analyzer::FileAnalysis;
use crate::report::Summary;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    summary: Summary,
    files: &'a [FileAnalysis],
}

/// Summary plus every result exactly as the analyzer returned it
pub fn write<W: Write>(writer: &mut W, results: &[FileAnalysis]) -> io::Result<()> {
    let report = JsonReport {
        generated_at: chrono::Local::now().to_rfc3339(),
        summary: Summary::from_results(results),
        files: results,
    };
    serde_json::to_writer_pretty(&mut *writer, &report)?;
    writeln!(writer)?;
    Ok(())
}

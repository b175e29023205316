//! CSV report output, one row per file

use crate::analyzer::FileAnalysis;
use std::io::{self, Write};

pub const HEADER: &str = "file_name,file_path,modality,authenticity_label,authenticity_score,sentiment_label,sentiment_score,failed_checks,reasoning";

/// Quote a field when it contains a delimiter, quote or line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

pub fn write<W: Write>(writer: &mut W, results: &[FileAnalysis]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)?;

    for r in results {
        let failed: Vec<&str> = r.result.failed_checks().map(|c| c.name.as_str()).collect();
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{}",
            escape(&r.file_name),
            escape(&r.file_path),
            r.modality.map(|m| m.as_str()).unwrap_or("unknown"),
            r.result.authenticity_label,
            r.result.authenticity_score,
            r.result.sentiment_label,
            r.result.sentiment_score,
            escape(&failed.join("; ")),
            escape(&r.result.reasoning),
        )?;
    }

    Ok(())
}

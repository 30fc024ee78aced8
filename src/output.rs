use crate::types::Result;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Write a report to a JSON file
pub fn write_json_file<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// Render a report as a JSON string
pub fn to_json_string<T: Serialize>(report: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write a report to stdout
pub fn write_json_stdout<T: Serialize>(report: &T) -> Result<()> {
    let json = to_json_string(report)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json)?;
    Ok(())
}

/// Write a report to `out` if given, stdout otherwise
pub fn emit_json<T: Serialize>(report: &T, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            write_json_file(report, path)?;
            eprintln!("Report written to: {}", path.display());
            Ok(())
        }
        None => write_json_stdout(report),
    }
}

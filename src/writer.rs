use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::info;

use crate::{DeltaLapError, comparison::ComparisonOutcome};

/// Pretty-print a comparison outcome as JSON into `file`.
pub fn write_report(file: &Path, outcome: &ComparisonOutcome) -> Result<(), DeltaLapError> {
    let report_file = File::create(file).map_err(|e| DeltaLapError::WriterError { source: e })?;
    let mut report_writer = BufWriter::new(report_file);
    write_outcome(&mut report_writer, outcome)?;
    report_writer
        .flush()
        .map_err(|e| DeltaLapError::WriterError { source: e })?;
    info!("Wrote comparison report to {:?}", file);
    Ok(())
}

pub fn write_outcome<W: Write>(writer: &mut W, outcome: &ComparisonOutcome) -> Result<(), DeltaLapError> {
    serde_json::to_writer_pretty(&mut *writer, outcome)
        .map_err(|e| DeltaLapError::ReportSerializeError { source: e })?;
    writeln!(writer).map_err(|e| DeltaLapError::WriterError { source: e })
}

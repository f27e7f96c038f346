use std::path::Path;

use log::{info, warn};

use crate::{
    DeltaLapError,
    telemetry::{Lap, Session, SessionInfo, SessionRecord, TelemetrySample},
};

/// Read a JSON-lines session file and group its samples into laps.
pub fn load_session_jsonl(source_file: &Path) -> Result<Session, DeltaLapError> {
    let records = serde_jsonlines::json_lines(source_file)
        .map_err(|e| DeltaLapError::SessionLoaderError { source: e })?
        .collect::<Result<Vec<SessionRecord>, std::io::Error>>()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                warn!("Could not parse {:?}: {}", source_file, e);
                DeltaLapError::InvalidSessionFile {
                    path: source_file.display().to_string(),
                }
            }
            _ => DeltaLapError::SessionLoaderError { source: e },
        })?;

    let session = group_records(records);
    if session.laps.is_empty() {
        return Err(DeltaLapError::EmptySession {
            path: source_file.display().to_string(),
        });
    }

    info!(
        "Loaded {:?}, found {} laps for {}",
        source_file,
        session.laps.len(),
        session.driver_name_or("unknown driver")
    );
    Ok(session)
}

/// Consecutive samples sharing a lap number form one lap.
pub fn group_records(records: impl IntoIterator<Item = SessionRecord>) -> Session {
    let mut info = SessionInfo::default();
    let mut laps = Vec::new();
    let mut cur_lap_no: Option<u32> = None;
    let mut cur_samples: Vec<TelemetrySample> = Vec::new();

    for record in records {
        match record {
            SessionRecord::DataPoint(point) => {
                if let Some(lap_no) = cur_lap_no.filter(|lap_no| *lap_no != point.lap_number) {
                    laps.push(Lap::from_samples(lap_no, std::mem::take(&mut cur_samples)));
                }
                cur_lap_no = Some(point.lap_number);
                cur_samples.push(point.sample);
            }
            SessionRecord::SessionChange(session_info) => {
                if cur_lap_no.is_some() || !laps.is_empty() {
                    warn!("Ignoring session change after telemetry samples: {:?}", session_info);
                    continue;
                }
                info = session_info;
            }
        }
    }
    if let Some(lap_no) = cur_lap_no {
        laps.push(Lap::from_samples(lap_no, cur_samples));
    }

    let mut session = Session::new(info, laps);
    session.mark_fastest_lap();
    session
}

use super::{QueryTable, BACKTRACE_COLUMNS};
use crate::document::TraceDocument;
use crate::error::Error;
use crate::settings::TIME_PROFILE_SCHEMA;
use crate::types::{Sample, SampleSource};

const TIME_COLUMNS: &[&str] = &["time", "sample-time"];
const WEIGHT_COLUMNS: &[&str] = &["weight"];

/// Loads the CPU samples of the `time-profile` table. Each sample lasts for its
/// weight.
pub fn load_cpu_samples(
    document: &TraceDocument,
    target_pid: Option<u32>,
) -> Result<Vec<Sample>, Error> {
    let table = QueryTable::find(document, TIME_PROFILE_SCHEMA)?;
    let mut samples = Vec::with_capacity(table.len());
    let mut skipped = 0;
    for row in table.rows() {
        if row.is_foreign(target_pid)? {
            skipped += 1;
            continue;
        }
        let thread = row.thread()?;
        let timestamp_ms = row.required_ms("timestamp", TIME_COLUMNS)?;
        let duration_ms = row.required_ms("weight", WEIGHT_COLUMNS)?;
        let backtrace = row.backtrace(BACKTRACE_COLUMNS)?;
        samples.push(Sample {
            thread,
            timestamp_ms,
            duration_ms,
            source: SampleSource::CpuProfile,
            backtrace,
        });
    }
    log::debug!(
        "Loaded {} CPU samples, skipped {skipped} from other processes",
        samples.len()
    );
    Ok(samples)
}

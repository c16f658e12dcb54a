use super::{QueryTable, BACKTRACE_COLUMNS};
use crate::document::TraceDocument;
use crate::error::Error;
use crate::settings::SYSCALL_SCHEMA;
use crate::types::{Sample, SampleSource, SymbolEntry, UNATTRIBUTED_ADDRESS};

const START_COLUMNS: &[&str] = &["start", "start-time"];
const DURATION_COLUMNS: &[&str] = &["duration"];
const NAME_COLUMNS: &[&str] = &["syscall", "name", "signature"];

/// Loads the `syscall` table. The leaf frame of each sample names the syscall,
/// followed by the recorded backtrace if there is one.
pub fn load_syscall_samples(
    document: &TraceDocument,
    target_pid: Option<u32>,
) -> Result<Vec<Sample>, Error> {
    let table = QueryTable::find(document, SYSCALL_SCHEMA)?;
    let mut samples = Vec::with_capacity(table.len());
    for row in table.rows() {
        if row.is_foreign(target_pid)? {
            continue;
        }
        let thread = row.thread()?;
        let timestamp_ms = row.required_ms("timestamp", START_COLUMNS)?;
        let duration_ms = row.required_ms("duration", DURATION_COLUMNS)?;
        let name = row.label(NAME_COLUMNS)?.unwrap_or("syscall");
        let mut backtrace = vec![SymbolEntry::resolved(UNATTRIBUTED_ADDRESS, name)];
        backtrace.extend(row.backtrace(BACKTRACE_COLUMNS)?);
        samples.push(Sample {
            thread,
            timestamp_ms,
            duration_ms,
            source: SampleSource::Syscall,
            backtrace,
        });
    }
    log::debug!("Loaded {} syscall samples", samples.len());
    Ok(samples)
}

use super::{QueryTable, BACKTRACE_COLUMNS};
use crate::document::TraceDocument;
use crate::error::Error;
use crate::settings::VIRTUAL_MEMORY_SCHEMA;
use crate::types::{Sample, SampleSource, SymbolEntry};

const START_COLUMNS: &[&str] = &["start", "start-time"];
const DURATION_COLUMNS: &[&str] = &["duration"];
const OPERATION_COLUMNS: &[&str] = &["operation", "vm-op", "type"];

/// Loads the `virtual-memory` table. The leaf frame of each sample is a
/// synthetic frame naming the operation, followed by the recorded backtrace.
pub fn load_virtual_memory_samples(
    document: &TraceDocument,
    target_pid: Option<u32>,
) -> Result<Vec<Sample>, Error> {
    let table = QueryTable::find(document, VIRTUAL_MEMORY_SCHEMA)?;
    let mut samples = Vec::with_capacity(table.len());
    for row in table.rows() {
        if row.is_foreign(target_pid)? {
            continue;
        }
        let thread = row.thread()?;
        let timestamp_ms = row.required_ms("timestamp", START_COLUMNS)?;
        let duration_ms = row.required_ms("duration", DURATION_COLUMNS)?;
        let operation = row.label(OPERATION_COLUMNS)?.unwrap_or("Unknown");

        let mut backtrace = vec![SymbolEntry::vm_operation(operation)];
        backtrace.extend(row.backtrace(BACKTRACE_COLUMNS)?);
        samples.push(Sample {
            thread,
            timestamp_ms,
            duration_ms,
            source: SampleSource::VirtualMemory,
            backtrace,
        });
    }
    log::debug!("Loaded {} virtual memory samples", samples.len());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VM_OPERATION_ADDRESS;

    #[test]
    fn operation_becomes_the_leaf_frame() {
        let document = TraceDocument::parse(
            r#"<trace-query-result><node>
<schema name="virtual-memory">
  <col><mnemonic>start</mnemonic></col>
  <col><mnemonic>duration</mnemonic></col>
  <col><mnemonic>thread</mnemonic></col>
  <col><mnemonic>operation</mnemonic></col>
  <col><mnemonic>backtrace</mnemonic></col>
</schema>
<row>
  <start-time id="1">7000000</start-time>
  <duration id="2">20000</duration>
  <thread id="3" fmt="Main Thread 0x1"><tid id="4">1</tid></thread>
  <vm-op id="5" fmt="Zero Fill">Zero Fill</vm-op>
  <backtrace id="6"><frame id="7" name="memset" addr="0x40"/></backtrace>
</row>
<row>
  <start-time id="8">8000000</start-time>
  <duration ref="2"/>
  <thread ref="3"/>
  <vm-op id="9" fmt="Page In">Page In</vm-op>
  <sentinel/>
</row>
</node></trace-query-result>"#,
        )
        .unwrap();

        let samples = load_virtual_memory_samples(&document, None).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(
            samples[0].backtrace,
            vec![
                SymbolEntry::resolved(VM_OPERATION_ADDRESS, "VM: Zero Fill"),
                SymbolEntry::resolved(0x40, "memset"),
            ]
        );
        assert_eq!(samples[0].duration_ms, 0.02);
        assert_eq!(
            samples[1].backtrace,
            vec![SymbolEntry::resolved(VM_OPERATION_ADDRESS, "VM: Page In")]
        );
    }
}

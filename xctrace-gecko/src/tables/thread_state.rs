use super::QueryTable;
use crate::document::TraceDocument;
use crate::error::Error;
use crate::settings::THREAD_STATE_SCHEMA;
use crate::types::{Sample, SampleSource};

const START_COLUMNS: &[&str] = &["start", "start-time"];
const DURATION_COLUMNS: &[&str] = &["duration"];
const STATE_COLUMNS: &[&str] = &["state", "thread-state"];

/// Loads the idle intervals of the `thread-state` table. Every interval in which
/// a thread was not running becomes a sample with an empty backtrace; running
/// intervals are covered by the CPU samples.
pub fn load_thread_state_samples(
    document: &TraceDocument,
    target_pid: Option<u32>,
) -> Result<Vec<Sample>, Error> {
    let table = QueryTable::find(document, THREAD_STATE_SCHEMA)?;
    let mut samples = Vec::new();
    for row in table.rows() {
        if row.is_foreign(target_pid)? {
            continue;
        }
        let thread = row.thread()?;
        let timestamp_ms = row.required_ms("timestamp", START_COLUMNS)?;
        let duration_ms = row.required_ms("duration", DURATION_COLUMNS)?;
        let state = row.label(STATE_COLUMNS)?.ok_or(Error::MissingField {
            table: THREAD_STATE_SCHEMA,
            field: "state",
        })?;
        if is_running(state) {
            continue;
        }
        samples.push(Sample {
            thread,
            timestamp_ms,
            duration_ms,
            source: SampleSource::ThreadState,
            backtrace: Vec::new(),
        });
    }
    log::debug!("Loaded {} idle thread state samples", samples.len());
    Ok(samples)
}

fn is_running(state: &str) -> bool {
    state.eq_ignore_ascii_case("running")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_idle_states_become_samples() {
        let document = TraceDocument::parse(
            r#"<trace-query-result><node>
<schema name="thread-state">
  <col><mnemonic>start</mnemonic></col>
  <col><mnemonic>duration</mnemonic></col>
  <col><mnemonic>thread</mnemonic></col>
  <col><mnemonic>state</mnemonic></col>
</schema>
<row>
  <start-time id="1">1000000</start-time>
  <duration id="2">500000</duration>
  <thread id="3" fmt="Main Thread 0x1"><tid id="4">1</tid></thread>
  <thread-state id="5" fmt="Running">Running</thread-state>
</row>
<row>
  <start-time id="6">1500000</start-time>
  <duration id="7">3000000</duration>
  <thread ref="3"/>
  <thread-state id="8" fmt="Blocked">Blocked</thread-state>
</row>
<row>
  <start-time id="9">4500000</start-time>
  <duration ref="2"/>
  <thread ref="3"/>
  <thread-state ref="5"/>
</row>
</node></trace-query-result>"#,
        )
        .unwrap();

        let samples = load_thread_state_samples(&document, None).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].timestamp_ms, 1.5);
        assert_eq!(samples[0].duration_ms, 3.0);
        assert!(samples[0].backtrace.is_empty());
        assert_eq!(samples[0].source, SampleSource::ThreadState);
    }
}

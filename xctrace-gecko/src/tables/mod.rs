//! Typed access to the tables of an `xctrace export --xpath` query result.
//!
//! A query result holds one `<node>` per table. Its `<schema>` child lists the
//! columns by mnemonic, and every following `<row>` has one child element per
//! column, in column order. Empty cells are `<sentinel/>`.

mod images;
mod syscall;
mod thread_state;
mod time_profile;
mod virtual_memory;

pub use images::load_images;
pub use syscall::load_syscall_samples;
pub use thread_state::load_thread_state_samples;
pub use time_profile::load_cpu_samples;
pub use virtual_memory::load_virtual_memory_samples;

use crate::document::{Node, TraceDocument};
use crate::error::Error;
use crate::fast_hash_map::FastHashMap;
use crate::types::{SymbolEntry, ThreadDescriptor};

const THREAD_COLUMNS: &[&str] = &["thread"];
const PROCESS_COLUMNS: &[&str] = &["process"];
pub(crate) const BACKTRACE_COLUMNS: &[&str] = &["stack", "backtrace", "user-backtrace"];

pub struct QueryTable<'a> {
    schema: &'static str,
    columns: FastHashMap<String, usize>,
    rows: Vec<Node<'a>>,
}

impl<'a> QueryTable<'a> {
    pub fn find(document: &'a TraceDocument, schema: &'static str) -> Result<Self, Error> {
        for node in document.root().descendants("node") {
            let Some(schema_node) = node.child("schema") else {
                continue;
            };
            if schema_node.attribute("name") != Some(schema) {
                continue;
            }
            let columns = schema_node
                .children()
                .filter(|child| child.has_tag("col"))
                .enumerate()
                .filter_map(|(index, col)| {
                    Some((col.child("mnemonic")?.text()?.to_owned(), index))
                })
                .collect();
            let rows = node.children().filter(|child| child.has_tag("row")).collect();
            return Ok(QueryTable {
                schema,
                columns,
                rows,
            });
        }
        Err(Error::MissingTable(schema.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_, 'a>> + '_ {
        self.rows.iter().map(move |node| Row {
            table: self,
            node: *node,
        })
    }
}

pub struct Row<'t, 'a> {
    table: &'t QueryTable<'a>,
    node: Node<'a>,
}

impl<'a> Row<'_, 'a> {
    /// The resolved cell for the first of `mnemonics` that the table has.
    /// Returns `None` for empty cells and absent columns.
    pub fn cell(&self, mnemonics: &[&str]) -> Result<Option<Node<'a>>, Error> {
        let Some(position) = mnemonics
            .iter()
            .find_map(|mnemonic| self.table.columns.get(*mnemonic))
        else {
            return Ok(None);
        };
        match self.node.children().nth(*position) {
            Some(cell) if !cell.is_sentinel() => cell.resolve().map(Some),
            _ => Ok(None),
        }
    }

    pub fn required(&self, field: &'static str, mnemonics: &[&str]) -> Result<Node<'a>, Error> {
        self.cell(mnemonics)?.ok_or(Error::MissingField {
            table: self.table.schema,
            field,
        })
    }

    /// A required numeric cell, such as a timestamp or a duration in nanoseconds.
    pub fn required_u64(&self, field: &'static str, mnemonics: &[&str]) -> Result<u64, Error> {
        let node = self.required(field, mnemonics)?;
        let text = node.text().ok_or(Error::MissingField {
            table: self.table.schema,
            field,
        })?;
        parse_number(text).ok_or_else(|| self.invalid(field, text))
    }

    /// A required nanosecond cell, converted to milliseconds.
    pub fn required_ms(&self, field: &'static str, mnemonics: &[&str]) -> Result<f64, Error> {
        Ok(self.required_u64(field, mnemonics)? as f64 / 1_000_000.0)
    }

    /// The cell's text, or the formatted value for cells that have no text.
    pub fn label(&self, mnemonics: &[&str]) -> Result<Option<&'a str>, Error> {
        Ok(self
            .cell(mnemonics)?
            .and_then(|node| node.text().or_else(|| node.formatted())))
    }

    pub fn thread(&self) -> Result<ThreadDescriptor, Error> {
        let thread = self.required("thread id", THREAD_COLUMNS)?;
        let tid_text = thread
            .resolved_child("tid")?
            .and_then(|tid| tid.text())
            .ok_or(Error::MissingField {
                table: self.table.schema,
                field: "thread id",
            })?;
        let tid = parse_number(tid_text).ok_or_else(|| self.invalid("thread id", tid_text))?;
        Ok(ThreadDescriptor {
            name: thread_name(thread.formatted(), tid),
            tid,
        })
    }

    /// The pid of the row's process, from the process column or from the thread.
    pub fn pid(&self) -> Result<Option<u32>, Error> {
        let process = match self.cell(PROCESS_COLUMNS)? {
            Some(process) => Some(process),
            None => match self.cell(THREAD_COLUMNS)? {
                Some(thread) => thread.resolved_child("process")?,
                None => None,
            },
        };
        let Some(process) = process else {
            return Ok(None);
        };
        Ok(process
            .resolved_child("pid")?
            .and_then(|pid| pid.text())
            .and_then(|pid| pid.parse::<u32>().ok()))
    }

    /// Whether this row should be skipped because it belongs to another process.
    pub fn is_foreign(&self, target_pid: Option<u32>) -> Result<bool, Error> {
        let Some(target_pid) = target_pid else {
            return Ok(false);
        };
        Ok(matches!(self.pid()?, Some(pid) if pid != target_pid))
    }

    /// The row's backtrace, leaf frame first. Empty if the cell is empty.
    pub fn backtrace(&self, mnemonics: &[&str]) -> Result<Vec<SymbolEntry>, Error> {
        let Some(cell) = self.cell(mnemonics)? else {
            return Ok(Vec::new());
        };
        let backtrace = if cell.has_tag("backtrace") {
            cell
        } else {
            match cell.resolved_child("backtrace")? {
                Some(backtrace) => backtrace,
                None => return Ok(Vec::new()),
            }
        };

        let mut frames = Vec::new();
        for frame in backtrace.children().filter(|child| child.has_tag("frame")) {
            let frame = frame.resolve()?;
            let Some(address) = frame.attribute("addr").and_then(parse_number) else {
                log::trace!("Skipping frame without address in {}", self.table.schema);
                continue;
            };
            let entry = match frame.attribute("name") {
                Some(name) if !name.is_empty() && !name.starts_with("0x") => {
                    SymbolEntry::resolved(address, name)
                }
                _ => SymbolEntry::unresolved(address),
            };
            frames.push(entry);
        }
        Ok(frames)
    }

    fn invalid(&self, field: &'static str, value: &str) -> Error {
        Error::InvalidField {
            table: self.table.schema,
            field,
            value: value.to_owned(),
        }
    }
}

/// Parses decimal numbers and `0x`-prefixed hex numbers.
pub fn parse_number(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Turns the exporter's thread label, e.g. `Main Thread  0x1a2b3 (MyApp, pid: 812)`,
/// into a thread name.
pub fn thread_name(formatted: Option<&str>, tid: u64) -> String {
    let mut name = strip_process_suffix(formatted.unwrap_or_default().trim());
    if let Some((rest, last)) = name.rsplit_once(char::is_whitespace) {
        if last.starts_with("0x") {
            name = rest.trim_end();
        }
    } else if name.starts_with("0x") {
        name = "";
    }
    if name.is_empty() {
        format!("Thread <{tid}>")
    } else {
        name.to_owned()
    }
}

/// Removes a trailing `(<process>, pid: <n>)`. The process name may contain
/// parentheses itself.
fn strip_process_suffix(name: &str) -> &str {
    let Some(inner) = name.strip_suffix(')') else {
        return name;
    };
    let Some((process, pid)) = inner.rsplit_once(", pid: ") else {
        return name;
    };
    if pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_digit()) {
        return name;
    }
    let mut depth = 0usize;
    for (index, c) in process.char_indices().rev() {
        match c {
            ')' => depth += 1,
            '(' if depth == 0 => return name[..index].trim_end(),
            '(' => depth -= 1,
            _ => {}
        }
    }
    name
}

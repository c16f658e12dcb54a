//! The settings probe: everything we need to know about a run before loading
//! any of its tables, taken from the trace's table of contents
//! (`xctrace export --toc`).

use std::collections::BTreeSet;

use crate::document::{Node, TraceDocument};
use crate::error::Error;

pub const TIME_PROFILE_SCHEMA: &str = "time-profile";
pub const THREAD_STATE_SCHEMA: &str = "thread-state";
pub const VIRTUAL_MEMORY_SCHEMA: &str = "virtual-memory";
pub const SYSCALL_SCHEMA: &str = "syscall";

/// Sampling interval used when the recording asked for high-frequency sampling.
pub const HIGH_FREQUENCY_INTERVAL_MS: f64 = 1.0;
pub const DEFAULT_INTERVAL_MS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDevice {
    pub platform: String,
    pub name: Option<String>,
    /// E.g. `17.0.3 (21A360)`.
    pub os_version: Option<String>,
}

impl TargetDevice {
    /// Whether the recording was made on a different device than the one
    /// running the conversion. The libraries of such devices only exist in the
    /// device support directory on this machine.
    pub fn is_remote(&self) -> bool {
        self.platform != "macOS" && !self.platform.contains("Simulator")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProcess {
    pub name: String,
    pub pid: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub run: u32,
    pub device: Option<TargetDevice>,
    pub process: Option<TargetProcess>,
    pub tables: BTreeSet<String>,
    pub high_frequency_sampling: bool,
}

impl RunSettings {
    pub fn probe(toc: &TraceDocument, run: u32) -> Result<Self, Error> {
        let run_node = toc
            .root()
            .descendants("run")
            .find(|node| node.attribute("number").and_then(|n| n.parse().ok()) == Some(run))
            .ok_or(Error::RunNotFound(run))?;

        let target = run_node.descendants("target").next();
        let device = target.and_then(|t| t.child("device")).map(parse_device);
        let process = target.and_then(|t| t.child("process")).map(parse_process);

        let mut tables = BTreeSet::new();
        let mut high_frequency_sampling = false;
        for table in run_node.descendants("table") {
            if let Some(schema) = table.attribute("schema") {
                tables.insert(schema.to_owned());
            }
            if matches!(
                table.attribute("high-frequency-sampling"),
                Some("1" | "true" | "yes")
            ) {
                high_frequency_sampling = true;
            }
        }

        let settings = RunSettings {
            run,
            device,
            process,
            tables,
            high_frequency_sampling,
        };
        log::debug!("Run {run}: {settings:?}");
        Ok(settings)
    }

    pub fn has_table(&self, schema: &str) -> bool {
        self.tables.contains(schema)
    }

    pub fn has_thread_state(&self) -> bool {
        self.has_table(THREAD_STATE_SCHEMA)
    }

    pub fn has_virtual_memory(&self) -> bool {
        self.has_table(VIRTUAL_MEMORY_SCHEMA)
    }

    pub fn has_syscall(&self) -> bool {
        self.has_table(SYSCALL_SCHEMA)
    }

    pub fn sampling_interval_ms(&self) -> f64 {
        if self.high_frequency_sampling {
            HIGH_FREQUENCY_INTERVAL_MS
        } else {
            DEFAULT_INTERVAL_MS
        }
    }

    pub fn target_pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid)
    }

    pub fn target_name(&self) -> Option<&str> {
        self.process.as_ref().map(|p| p.name.as_str())
    }
}

fn parse_device(node: Node<'_>) -> TargetDevice {
    TargetDevice {
        platform: node.attribute("platform").unwrap_or("macOS").to_owned(),
        name: node.attribute("name").map(ToOwned::to_owned),
        os_version: node.attribute("os-version").map(ToOwned::to_owned),
    }
}

fn parse_process(node: Node<'_>) -> TargetProcess {
    TargetProcess {
        name: node.attribute("name").unwrap_or_default().to_owned(),
        // "All Processes" recordings use a negative pid.
        pid: node
            .attribute("pid")
            .and_then(|pid| pid.parse::<i64>().ok())
            .and_then(|pid| u32::try_from(pid).ok()),
    }
}

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Could not resolve reference to <{tag}> with id {id}")]
    ReferenceResolution { tag: String, id: u64 },

    #[error("Row in table {table} is missing the required field {field}")]
    MissingField {
        table: &'static str,
        field: &'static str,
    },

    #[error("Row in table {table} has an invalid value for {field}: {value:?}")]
    InvalidField {
        table: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("No device support symbols for OS version {os_version} in {}", .searched.display())]
    UnresolvableDeviceSupport {
        os_version: String,
        searched: PathBuf,
    },

    #[error("The trace does not contain a run with number {0}")]
    RunNotFound(u32),

    #[error("The exported document does not contain a table with schema {0}")]
    MissingTable(String),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not run {tool}: {source}")]
    ToolLaunch {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ExternalTool {
        tool: &'static str,
        status: ExitStatus,
        stderr: String,
    },
}

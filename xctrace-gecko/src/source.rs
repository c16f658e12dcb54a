//! Where the exported XML documents come from.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::Error;

/// Provides the XML documents of a trace.
pub trait TraceSource: Sync {
    /// The table of contents, as written by `xctrace export --toc`.
    fn toc(&self) -> Result<String, Error>;

    /// The query result for the table with the given schema in the given run.
    fn table(&self, run: u32, schema: &str) -> Result<String, Error>;
}

/// A directory of documents that were exported ahead of time, named `toc.xml`
/// and `<schema>.xml`.
#[derive(Debug, Clone)]
pub struct ExportDirectory {
    dir: PathBuf,
}

impl ExportDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ExportDirectory { dir: dir.into() }
    }

    fn read(&self, file_name: &str) -> Result<String, Error> {
        let path = self.dir.join(file_name);
        log::debug!("Reading {}", path.display());
        std::fs::read_to_string(&path).map_err(|source| Error::Io { path, source })
    }
}

impl TraceSource for ExportDirectory {
    fn toc(&self) -> Result<String, Error> {
        self.read("toc.xml")
    }

    fn table(&self, _run: u32, schema: &str) -> Result<String, Error> {
        self.read(&format!("{schema}.xml"))
    }
}

/// Exports the documents from a `.trace` bundle by running `xctrace`.
#[derive(Debug, Clone)]
pub struct XctraceExport {
    trace: PathBuf,
}

impl XctraceExport {
    pub fn new(trace: impl Into<PathBuf>) -> Self {
        XctraceExport {
            trace: trace.into(),
        }
    }

    fn export(&self, query: &[&str]) -> Result<String, Error> {
        // xcrun finds the xctrace of the selected Xcode installation.
        let mut command = Command::new("xcrun");
        command
            .arg("xctrace")
            .arg("export")
            .arg("--input")
            .arg(&self.trace)
            .args(query);
        log::debug!("Running {command:?}");
        let output = command.output().map_err(|source| Error::ToolLaunch {
            tool: "xctrace",
            source,
        })?;
        if !output.status.success() {
            return Err(Error::ExternalTool {
                tool: "xctrace",
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TraceSource for XctraceExport {
    fn toc(&self) -> Result<String, Error> {
        self.export(&["--toc"])
    }

    fn table(&self, run: u32, schema: &str) -> Result<String, Error> {
        let xpath = table_xpath(run, schema);
        self.export(&["--xpath", &xpath])
    }
}

/// The query that selects one table of one run from a trace's table of contents.
pub fn table_xpath(run: u32, schema: &str) -> String {
    format!(r#"/trace-toc/run[@number="{run}"]/data/table[@schema="{schema}"]"#)
}

/// Picks the source for `input`: directories hold pre-exported documents,
/// except for `.trace` bundles which are directories too.
pub fn source_for_input(input: &Path) -> Box<dyn TraceSource> {
    let is_trace_bundle = input.extension().is_some_and(|ext| ext == "trace");
    if input.is_dir() && !is_trace_bundle {
        Box::new(ExportDirectory::new(input))
    } else {
        Box::new(XctraceExport::new(input))
    }
}

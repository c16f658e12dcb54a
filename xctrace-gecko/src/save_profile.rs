use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::{Compression, GzBuilder};
use gecko_profile::ProfileBuilder;

use crate::error::Error;

// Profile JSON is highly repetitive; higher levels barely shrink it further.
const GZIP_COMPRESSION_LEVEL: u32 = 2;

/// Writes the profile as JSON, gzip-compressed if `output_path` ends in `.gz`.
pub fn save_profile_to_file(profile: &ProfileBuilder, output_path: &Path) -> Result<(), Error> {
    let io_error = |source| Error::Io {
        path: output_path.to_owned(),
        source,
    };
    let output_file = File::create(output_path).map_err(io_error)?;

    let writer = BufWriter::new(output_file);
    let is_gz = output_path.extension() == Some(OsStr::new("gz"));
    if is_gz {
        let name_without_gz = output_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let builder = GzBuilder::new().filename(name_without_gz.as_bytes());
        let gz = builder.write(writer, Compression::new(GZIP_COMPRESSION_LEVEL));
        let mut gz = BufWriter::new(gz);
        serde_json::to_writer(&mut gz, profile).map_err(|err| io_error(err.into()))?;
        let gz = gz.into_inner().map_err(|err| io_error(err.into_error()))?;
        gz.finish().map_err(io_error)?.flush().map_err(io_error)?;
    } else {
        let mut writer = writer;
        serde_json::to_writer(&mut writer, profile).map_err(|err| io_error(err.into()))?;
        writer.flush().map_err(io_error)?;
    }
    log::info!("Saved profile to {}", output_path.display());
    Ok(())
}

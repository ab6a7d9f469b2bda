use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::gateway::ExportArtifact;

/// Write the downloaded artifact into the export directory under the
/// format's filename, matching the names the server advertises. Overwrites a
/// previous export of the same format.
pub fn save_report_artifact(dir: &Path, artifact: &ExportArtifact) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(artifact.format.file_name());
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&artifact.bytes)?;
    writer.flush()?;
    Ok(path)
}

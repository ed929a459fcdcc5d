//! Output path templates such as `{filePath}/{fileBase}-{timeStamp}.md`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use mdcc_shared::{MdccError, Result};

/// `chrono` format for `{timeStamp}`.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Resolve `template` for `file` using the current local time.
pub fn resolve(template: &str, file: &Path) -> Result<PathBuf> {
    resolve_at(template, file, Local::now())
}

/// Resolve `template` for `file` at a fixed instant.
///
/// Unknown `{placeholders}` are left as written.
pub fn resolve_at(template: &str, file: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    if template.trim().is_empty() {
        return Err(MdccError::template("output template is empty"));
    }

    let file_name = file.display().to_string();
    let file_path = file
        .parent()
        .map(|p| p.display().to_string())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());
    let file_base = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_ext = file
        .extension()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let time_stamp = now.format(TIMESTAMP_FORMAT).to_string();

    let resolved = template
        .replace("{fileName}", &file_name)
        .replace("{filePath}", &file_path)
        .replace("{fileBase}", &file_base)
        .replace("{fileExt}", &file_ext)
        .replace("{timeStamp}", &time_stamp);

    if resolved.trim().is_empty() {
        return Err(MdccError::template(format!(
            "'{template}' resolves to an empty path for {file_name}"
        )));
    }

    Ok(PathBuf::from(resolved))
}

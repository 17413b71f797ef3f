use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only CSV file.
///
/// Writes the header only when the file is new or empty, so reruns keep
/// appending to the same log. Every row is flushed before returning; a failed
/// write is an error rather than a silently lost record.
pub struct CsvFile {
    path: PathBuf,
    file: fs::File,
}

impl CsvFile {
    pub fn open_with_header<S: AsRef<str>>(path: impl AsRef<Path>, header: &[S]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existing_len = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let mut csv = Self { path, file };
        if existing_len == 0 {
            csv.append_row(header)?;
        }
        Ok(csv)
    }

    pub fn append_row<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let mut line = String::new();
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            push_field(&mut line, field.as_ref());
        }
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .and_then(|()| self.file.flush())
            .with_context(|| format!("failed to write to {}", self.path.display()))
    }
}

fn push_field(line: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        line.push('"');
        line.push_str(&field.replace('"', "\"\""));
        line.push('"');
    } else {
        line.push_str(field);
    }
}

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::RadioDnsError;

/// Where a finished SI document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    /// Overwritten if it exists.
    File(PathBuf),
}

impl OutputTarget {
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::File(path.to_path_buf()),
            None => Self::Stdout,
        }
    }

    pub fn write(&self, document: &[u8]) -> Result<(), RadioDnsError> {
        match self {
            Self::Stdout => write_stdout(document).map_err(|source| RadioDnsError::OutputWriteFailure {
                target: "standard output".to_string(),
                source,
            }),
            Self::File(path) => {
                std::fs::write(path, document).map_err(|source| RadioDnsError::OutputWriteFailure {
                    target: path.display().to_string(),
                    source,
                })
            }
        }
    }
}

fn write_stdout(document: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(document)?;
    stdout.write_all(b"\n")?;
    stdout.flush()
}

//! `parlor render`: format a message file (or stdin) as an HTML fragment

use crate::error::{ParlorError, Result};
use crate::formatter;
use anyhow::Context;
use std::io::Read;
use std::path::Path;

/// Read the message source
///
/// # Errors
///
/// Returns error if the file or stdin cannot be read
pub fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(ParlorError::from)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .map_err(ParlorError::from)
                .context("Failed to read standard input")?;
            Ok(content)
        }
    }
}

/// Print the formatted fragment for `path` (stdin when `None`)
pub fn run_render(path: Option<&Path>, assistant: bool) -> Result<()> {
    let content = read_source(path)?;
    tracing::debug!("Rendering {} bytes (assistant={})", content.len(), assistant);
    println!("{}", formatter::format(&content, assistant));
    Ok(())
}

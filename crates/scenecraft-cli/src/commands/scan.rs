use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use scenecraft::scanner::scan;

/// Print the findings for the code in `file`. Returns whether it passed.
pub fn scan_file(file: &Path) -> Result<bool> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let findings = scan(&source);
    if findings.is_empty() {
        println!("{} {}", style("✓").green(), style("No findings").dim());
        return Ok(true);
    }

    for finding in &findings {
        println!("{}", style(finding.category.description()).yellow().bold());
        for occurrence in &finding.occurrences {
            println!(
                "  {} {}",
                style(format!("{:>4}:", occurrence.line)).dim(),
                occurrence.snippet
            );
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_scan_file() {
        let mut clean = NamedTempFile::new().unwrap();
        writeln!(clean, "bpy.ops.mesh.primitive_cube_add()").unwrap();
        assert!(scan_file(clean.path()).unwrap());

        let mut flagged = NamedTempFile::new().unwrap();
        writeln!(flagged, "import subprocess").unwrap();
        assert!(!scan_file(flagged.path()).unwrap());
    }

    #[test]
    fn test_scan_missing_file() {
        assert!(scan_file(Path::new("/nonexistent/script.py")).is_err());
    }
}

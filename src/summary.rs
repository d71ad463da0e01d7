use anyhow::{Context, Result};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

const RULE_WIDTH: usize = 50;

/// End-of-run totals, printed once after the download loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub files: usize,
    pub total_rows: u64,
    pub data_dir: PathBuf,
}

impl Summary {
    /// Count the `.parquet` files now in `data_dir`, including ones left by
    /// earlier runs.
    pub fn collect(data_dir: &Path, total_rows: u64) -> Result<Self> {
        let files = fs::read_dir(data_dir)
            .with_context(|| format!("listing {}", data_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".parquet"))
            .count();
        let data_dir = fs::canonicalize(data_dir)
            .with_context(|| format!("resolving {}", data_dir.display()))?;
        Ok(Self {
            files,
            total_rows,
            data_dir,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(f, "{}", rule)?;
        writeln!(f, "TOTAL")?;
        writeln!(f, "Files in data directory: {}", self.files)?;
        writeln!(f, "Total rows downloaded:   {}", thousands(self.total_rows))?;
        writeln!(f, "Saved to:                {}", self.data_dir.display())?;
        write!(f, "{}", rule)
    }
}

/// `1234567` -> `1,234,567`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

use std::{fs, path::Path};

use serde::Serialize;
use tracing::info;
use tsbench_stats::RunSummary;

use crate::{BenchmarkRunnerConfig, Error, Result};

/// What `--results-file` receives: the settings of a run next to its outcome
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunResults<'a> {
    pub config: &'a BenchmarkRunnerConfig,
    pub summary: &'a RunSummary,
}

impl RunResults<'_> {
    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string_pretty()?;
        fs::write(path, json).map_err(|source| Error::ResultsFile {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "wrote results file");
        Ok(())
    }
}

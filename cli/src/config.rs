//! TOML configuration loading and validation.

use std::fmt;
use std::path::{Path, PathBuf};

use nanosweep::BackendKind;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration (`sweep.toml`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    pub input: InputConfig,
    pub sweep: SweepConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_true")]
    pub show_progress: bool,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            workers: default_workers(),
            show_progress: default_true(),
            progress_every: default_progress_every(),
        }
    }
}

fn default_workers() -> usize {
    4
}
fn default_true() -> bool {
    true
}
fn default_progress_every() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub path: PathBuf,
}

/// Indicator family to sweep over `windows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepKind {
    Sma,
    Ema,
    Rsi,
    Bbands,
    Crossover,
}

impl fmt::Display for SweepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepKind::Sma => "sma",
            SweepKind::Ema => "ema",
            SweepKind::Rsi => "rsi",
            SweepKind::Bbands => "bbands",
            SweepKind::Crossover => "crossover",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub kind: SweepKind,
    pub windows: Vec<usize>,
    /// Pivot window for `crossover`; `windows` are the slow candidates.
    #[serde(default)]
    pub fast: Option<usize>,
    #[serde(default = "default_num_std")]
    pub num_std: f64,
}

fn default_num_std() -> f64 {
    2.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("sweep_report.json")
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.engine.workers == 0 {
            return Err(Error::Config("workers must be > 0".into()));
        }
        if self.engine.progress_every == 0 {
            return Err(Error::Config("progress_every must be > 0".into()));
        }
        if self.sweep.windows.is_empty() {
            return Err(Error::Config("windows must not be empty".into()));
        }
        if self.sweep.windows.contains(&0) {
            return Err(Error::Config("windows must be > 0".into()));
        }
        if self.sweep.num_std.is_nan() || self.sweep.num_std <= 0.0 {
            return Err(Error::Config("num_std must be > 0".into()));
        }
        match (self.sweep.kind, self.sweep.fast) {
            (SweepKind::Crossover, None) => {
                return Err(Error::Config("crossover requires `fast`".into()));
            }
            (SweepKind::Crossover, Some(0)) => {
                return Err(Error::Config("fast must be > 0".into()));
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[engine]
backend = "distributed"
workers = 8
show_progress = false
progress_every = 5

[input]
path = "data/close.json"

[sweep]
kind = "bbands"
windows = [10, 20, 50]
num_std = 2.5

[output]
path = "out/bbands.json"
"#
    }

    #[test]
    fn parse_example_config() {
        let config = Config::from_toml(example_toml()).unwrap();
        assert_eq!(config.engine.backend, BackendKind::Distributed);
        assert_eq!(config.engine.workers, 8);
        assert!(!config.engine.show_progress);
        assert_eq!(config.sweep.kind, SweepKind::Bbands);
        assert_eq!(config.sweep.windows, vec![10, 20, 50]);
        assert_eq!(config.sweep.num_std, 2.5);
        assert_eq!(config.output.path, PathBuf::from("out/bbands.json"));
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_toml(
            r#"
[input]
path = "close.csv"

[sweep]
kind = "sma"
windows = [5]
"#,
        )
        .unwrap();
        assert_eq!(config.engine.backend, BackendKind::Sequential);
        assert_eq!(config.engine.workers, 4);
        assert!(config.engine.show_progress);
        assert_eq!(config.sweep.num_std, 2.0);
        assert_eq!(config.output.path, PathBuf::from("sweep_report.json"));
    }

    #[test]
    fn validate_catches_empty_windows() {
        let mut config = Config::from_toml(example_toml()).unwrap();
        config.sweep.windows.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_zero_window() {
        let mut config = Config::from_toml(example_toml()).unwrap();
        config.sweep.windows.push(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_zero_workers() {
        let mut config = Config::from_toml(example_toml()).unwrap();
        config.engine.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_bad_num_std() {
        let mut config = Config::from_toml(example_toml()).unwrap();
        config.sweep.num_std = 0.0;
        assert!(config.validate().is_err());
        config.sweep.num_std = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn crossover_requires_fast() {
        let toml = example_toml().replace("\"bbands\"", "\"crossover\"");
        assert!(matches!(Config::from_toml(&toml), Err(Error::Config(_))));

        let toml = toml.replace("num_std = 2.5", "num_std = 2.5\nfast = 5");
        let config = Config::from_toml(&toml).unwrap();
        assert_eq!(config.sweep.fast, Some(5));
    }

    #[test]
    fn unknown_backend_rejected() {
        let toml = example_toml().replace("\"distributed\"", "\"gpu\"");
        assert!(matches!(Config::from_toml(&toml), Err(Error::ConfigParse(_))));
    }
}

// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::{load::Source, process::NormalizeOptions, synthetic::SyntheticConfig};

pub const CONFIG_ENV: &str = "FUNDNORM_CONFIG";
pub const CSV_ENV: &str = "FUNDNORM_CSV";
pub const SEED_ENV: &str = "FUNDNORM_SEED";
pub const OUT_DIR_ENV: &str = "FUNDNORM_OUT_DIR";

/// Where the dataset is expected, relative to a base directory.
const DATA_FILE: &str = "data/startup_funding.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input locations, probed in order.
    pub candidates: Vec<PathBuf>,
    /// Seed for column backfill; unset means fresh randomness per run.
    pub seed: Option<u64>,
    pub synthetic: SyntheticConfig,
    /// Export destination.
    pub out_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let mut candidates = vec![PathBuf::from(DATA_FILE)];
        if let Some(exe_dir) = env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            candidates.push(exe_dir.join(DATA_FILE));
        }
        Self {
            candidates,
            seed: None,
            synthetic: SyntheticConfig::default(),
            out_dir: PathBuf::from("out"),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file named by `FUNDNORM_CONFIG`, then the
    /// individual environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_yaml_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        info!(
            candidates = ?config.candidates,
            seed = ?config.seed,
            out_dir = %config.out_dir.display(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `FUNDNORM_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(csv) = lookup(CSV_ENV) {
            self.candidates.insert(0, PathBuf::from(csv));
        }
        if let Some(seed) = lookup(SEED_ENV) {
            let seed = seed.trim().parse::<u64>().with_context(|| {
                format!("{} must be an unsigned integer, got {:?}", SEED_ENV, seed)
            })?;
            self.seed = Some(seed);
        }
        if let Some(dir) = lookup(OUT_DIR_ENV) {
            self.out_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn source(&self) -> Source {
        Source::Paths(self.candidates.clone())
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            seed: self.seed,
            synthetic: self.synthetic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_probe_the_working_directory_first() {
        let config = Config::default();
        assert_eq!(config.candidates[0], PathBuf::from("data/startup_funding.csv"));
        assert_eq!(config.synthetic, SyntheticConfig::default());
        assert_eq!(config.seed, None);
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() -> Result<()> {
        let config = Config::from_yaml_str(
            "candidates: [/srv/funding.csv]\nseed: 9\nsynthetic:\n  sample_cap: 100\n",
        )?;
        assert_eq!(config.candidates, vec![PathBuf::from("/srv/funding.csv")]);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.synthetic.sample_cap, 100);
        assert_eq!(config.synthetic.seed, 42);
        assert_eq!(config.out_dir, PathBuf::from("out"));
        Ok(())
    }

    #[test]
    fn yaml_file_errors_name_the_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "seed: [not, a, number]\n")?;
        let err = Config::from_yaml_file(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing config"));
        Ok(())
    }

    #[test]
    fn env_overrides() -> Result<()> {
        let vars: HashMap<&str, &str> = [
            (CSV_ENV, "/tmp/upload.csv"),
            (SEED_ENV, " 17 "),
            (OUT_DIR_ENV, "/tmp/exports"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()))?;
        assert_eq!(config.candidates[0], PathBuf::from("/tmp/upload.csv"));
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.out_dir, PathBuf::from("/tmp/exports"));
        assert_eq!(config.normalize_options().seed, Some(17));
        Ok(())
    }

    #[test]
    fn bad_seed_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|k| (k == SEED_ENV).then(|| "forty-two".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(SEED_ENV));
    }
}

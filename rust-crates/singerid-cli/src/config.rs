//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use singerid_classifier::{LabelSet, DEFAULT_LABELS};
use singerid_features::FeatureConfig;
use std::path::{Path, PathBuf};

/// SingerID configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SingerIdConfig {
    /// Path to configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Exported classifier (ONNX)
    pub model_path: PathBuf,

    /// Class names in model output order
    pub labels: Vec<String>,

    /// Text file with one class name per line; overrides `labels` when set
    pub labels_file: Option<PathBuf>,

    /// Where per-request scratch files go (None = system temp dir)
    pub scratch_dir: Option<PathBuf>,

    /// Number of threads for ONNX Runtime
    pub num_threads: usize,

    /// Spectrogram and tensor parameters
    pub features: FeatureConfig,
}

impl Default for SingerIdConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            model_path: singerid_paths::default_model_path()
                .unwrap_or_else(|_| PathBuf::from(singerid_paths::DEFAULT_MODEL_FILE)),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            labels_file: None,
            scratch_dir: None,
            num_threads: 4,
            features: FeatureConfig::default(),
        }
    }
}

impl SingerIdConfig {
    /// Load configuration from the default location, or create it
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path())
    }

    /// Load configuration from `path`, writing the defaults there if it is missing
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref().to_path_buf();

        let config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

            let mut config: SingerIdConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

            config.config_path = config_path;
            config
        } else {
            let config = Self {
                config_path,
                ..Self::default()
            };
            config.save().context("Failed to save default config")?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = self.to_toml()?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            anyhow::bail!("num_threads must be at least 1");
        }
        self.features
            .validate()
            .context("Invalid [features] configuration")?;
        self.label_set()?;
        Ok(())
    }

    pub fn label_set(&self) -> Result<LabelSet> {
        match &self.labels_file {
            Some(path) => LabelSet::from_file(path)
                .with_context(|| format!("Failed to load labels from {}", path.display())),
            None => LabelSet::new(self.labels.iter().cloned())
                .context("Invalid labels in configuration"),
        }
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(singerid_paths::default_scratch_dir)
    }

    /// Get default config path
    fn default_config_path() -> PathBuf {
        singerid_paths::get_config_file()
            .unwrap_or_else(|_| PathBuf::from("singerid").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = SingerIdConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.config_path, path);
        assert_eq!(config.labels.len(), 11);
        assert_eq!(config.num_threads, 4);
        assert_eq!(config.features, FeatureConfig::default());
    }

    #[test]
    fn test_saved_config_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = SingerIdConfig::load_from(&path).unwrap();
        config.model_path = PathBuf::from("/models/singers.onnx");
        config.scratch_dir = Some(dir.path().join("scratch"));
        config.num_threads = 2;
        config.features.jpeg_quality = 90;
        config.save().unwrap();

        let reloaded = SingerIdConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.model_path, PathBuf::from("/models/singers.onnx"));
        assert_eq!(reloaded.scratch_dir(), dir.path().join("scratch"));
        assert_eq!(reloaded.num_threads, 2);
        assert_eq!(reloaded.features.jpeg_quality, 90);
        assert_eq!(reloaded.labels, config.labels);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "labels = [\"Alpha\", \"Beta\"]\n\n[features]\nn_mels = 64\n",
        )
        .unwrap();

        let config = SingerIdConfig::load_from(&path).unwrap();
        assert_eq!(config.label_set().unwrap().len(), 2);
        assert_eq!(config.features.n_mels, 64);
        assert_eq!(config.features.hop_length, 512);
        assert_eq!(config.num_threads, 4);
    }

    #[test]
    fn test_labels_file_overrides_inline_labels() {
        let dir = tempdir().unwrap();
        let labels = dir.path().join("labels.txt");
        std::fs::write(&labels, "Asha Bhosle\n\n  Kishore Kumar  \nMukesh\n").unwrap();

        let path = dir.path().join("config.toml");
        std::fs::write(&path, format!("labels_file = {:?}\n", labels.display().to_string())).unwrap();

        let config = SingerIdConfig::load_from(&path).unwrap();
        let set = config.label_set().unwrap();
        assert_eq!(set.as_slice(), ["Asha Bhosle", "Kishore Kumar", "Mukesh"]);
        assert_eq!(config.labels.len(), 11);
    }

    #[test]
    fn test_missing_labels_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let absent = dir.path().join("absent.txt");
        std::fs::write(&path, format!("labels_file = {:?}\n", absent.display().to_string())).unwrap();

        assert!(SingerIdConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();

        let empty_labels = dir.path().join("labels.toml");
        std::fs::write(&empty_labels, "labels = []\n").unwrap();
        assert!(SingerIdConfig::load_from(&empty_labels).is_err());

        let zero_hop = dir.path().join("hop.toml");
        std::fs::write(&zero_hop, "[features]\nhop_length = 0\n").unwrap();
        assert!(SingerIdConfig::load_from(&zero_hop).is_err());

        let garbage = dir.path().join("garbage.toml");
        std::fs::write(&garbage, "this is = = not toml").unwrap();
        assert!(SingerIdConfig::load_from(&garbage).is_err());
    }
}

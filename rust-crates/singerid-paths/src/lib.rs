//! Cross-platform path utilities for SingerID.
//!
//! Single source of truth for where SingerID keeps its configuration, its
//! model artifact and the short-lived files produced while classifying an
//! upload.
//!
//! # Platform Behavior
//!
//! | Platform | Data Directory | Config Directory |
//! |----------|----------------|------------------|
//! | Linux    | `~/.local/share/singerid` | `~/.config/singerid` |
//! | macOS    | `~/Library/Application Support/singerid` | Same as data dir |
//! | Windows  | `%APPDATA%/singerid` | Same as data dir |
//!
//! Scratch artifacts live under `$TMPDIR/singerid` unless the caller picks
//! another directory. Every request gets its own UUID so two uploads never
//! share a file name.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Errors specific to path operations.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine data directory")]
    NoDataDirectory,

    #[error("Could not determine config directory")]
    NoConfigDirectory,

    #[error("Invalid audio extension: {0:?}")]
    InvalidExtension(String),
}

/// Application identifier used in path construction.
const APP_NAME: &str = "singerid";

/// Configuration file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default classifier artifact name inside the models directory.
pub const DEFAULT_MODEL_FILE: &str = "musician_recognition_model.onnx";

/// Get the application data directory.
///
/// Creates the directory if it doesn't exist with secure permissions (0o700).
pub fn get_data_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().ok_or(PathError::NoDataDirectory)?;
    let data_dir = base_dir.join(APP_NAME);

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&data_dir, perms)
                .with_context(|| format!("Failed to set permissions on {}", data_dir.display()))?;
        }
    }

    Ok(data_dir)
}

/// Get the configuration directory.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/singerid`
/// - **macOS / Windows**: config lives with data
pub fn get_config_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let config_base = dirs::config_dir().ok_or(PathError::NoConfigDirectory)?;
        let config_dir = config_base.join(APP_NAME);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).with_context(|| {
                format!(
                    "Failed to create config directory: {}",
                    config_dir.display()
                )
            })?;

            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&config_dir, perms).ok();
        }

        Ok(config_dir)
    }

    #[cfg(not(target_os = "linux"))]
    {
        get_data_dir()
    }
}

/// Path of the TOML configuration file.
pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the models directory (`<data_dir>/models`).
pub fn get_models_dir() -> Result<PathBuf> {
    let models_dir = get_data_dir()?.join("models");

    if !models_dir.exists() {
        fs::create_dir_all(&models_dir).with_context(|| {
            format!(
                "Failed to create models directory: {}",
                models_dir.display()
            )
        })?;
    }

    Ok(models_dir)
}

/// Default location of the classifier artifact.
///
/// Does not check that the file exists; loading the model reports that.
pub fn default_model_path() -> Result<PathBuf> {
    Ok(get_models_dir()?.join(DEFAULT_MODEL_FILE))
}

/// Default directory for per-request scratch artifacts (`$TMPDIR/singerid`).
pub fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join(APP_NAME)
}

/// The two transient files belonging to one classification request.
///
/// Removing the files is tied to `Drop`, so an early return on error still
/// leaves the scratch directory clean. [`ScratchArtifacts::cleanup`] does the
/// same eagerly and reports failures.
#[derive(Debug)]
pub struct ScratchArtifacts {
    request_id: Uuid,
    audio_path: PathBuf,
    spectrogram_path: PathBuf,
    cleaned: bool,
}

impl ScratchArtifacts {
    /// Reserve unique paths for a new request inside `scratch_dir`.
    ///
    /// `audio_extension` is the extension of the uploaded file (`"wav"`,
    /// `"mp3"`, ...). Nothing is written yet; the directory is created.
    pub fn new<P: AsRef<Path>>(scratch_dir: P, audio_extension: &str) -> Result<Self> {
        let scratch_dir = scratch_dir.as_ref();
        let ext = audio_extension.trim_start_matches('.');
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(PathError::InvalidExtension(audio_extension.to_string()).into());
        }

        fs::create_dir_all(scratch_dir).with_context(|| {
            format!(
                "Failed to create scratch directory: {}",
                scratch_dir.display()
            )
        })?;

        let request_id = Uuid::new_v4();
        let stem = format!("{}-{}", APP_NAME, request_id);
        let audio_path = scratch_dir.join(format!("{}-audio.{}", stem, ext.to_lowercase()));
        let spectrogram_path = scratch_dir.join(format!("{}-spectrogram.jpg", stem));

        debug!("Reserved scratch artifacts for request {}", request_id);

        Ok(Self {
            request_id,
            audio_path,
            spectrogram_path,
            cleaned: false,
        })
    }

    /// Identifier shared by both artifact names.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Where the copy of the uploaded audio goes.
    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    /// Where the rendered spectrogram JPEG goes.
    pub fn spectrogram_path(&self) -> &Path {
        &self.spectrogram_path
    }

    /// Copy the uploaded file into the scratch audio slot.
    pub fn stage_audio<P: AsRef<Path>>(&self, source: P) -> Result<u64> {
        let source = source.as_ref();
        fs::copy(source, &self.audio_path).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                source.display(),
                self.audio_path.display()
            )
        })
    }

    /// Delete both artifacts. Files that were never written are ignored.
    pub fn cleanup(&mut self) -> Result<()> {
        self.cleaned = true;
        for path in [&self.audio_path, &self.spectrogram_path] {
            remove_if_exists(path)?;
        }
        debug!("Removed scratch artifacts for request {}", self.request_id);
        Ok(())
    }
}

impl Drop for ScratchArtifacts {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        if let Err(e) = self.cleanup() {
            warn!("Failed to clean up scratch artifacts: {:#}", e);
        }
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_data_dir_creation() {
        let dir = get_data_dir().expect("Should get data directory");
        assert!(dir.exists(), "Data directory should exist");
        assert!(dir.ends_with("singerid"), "Should end with app name");
    }

    #[test]
    fn test_models_dir() {
        let dir = get_models_dir().expect("Should get models directory");
        assert!(dir.exists(), "Models directory should exist");
        assert!(dir.ends_with("models"), "Should end with 'models'");
    }

    #[test]
    fn test_default_model_path() {
        let path = default_model_path().unwrap();
        assert!(path.ends_with(DEFAULT_MODEL_FILE));
    }

    #[test]
    fn test_config_file_name() {
        let path = get_config_file().unwrap();
        assert!(path.ends_with("config.toml"));
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let dir = tempdir().unwrap();
        let a = ScratchArtifacts::new(dir.path(), "wav").unwrap();
        let b = ScratchArtifacts::new(dir.path(), "wav").unwrap();

        assert_ne!(a.request_id(), b.request_id());
        assert_ne!(a.audio_path(), b.audio_path());
        assert_ne!(a.spectrogram_path(), b.spectrogram_path());
        assert!(a.audio_path().to_string_lossy().ends_with("-audio.wav"));
        assert!(a
            .spectrogram_path()
            .to_string_lossy()
            .ends_with("-spectrogram.jpg"));
    }

    #[test]
    fn test_extension_is_normalized() {
        let dir = tempdir().unwrap();
        let artifacts = ScratchArtifacts::new(dir.path(), ".MP3").unwrap();
        assert_eq!(artifacts.audio_path().extension().unwrap(), "mp3");
    }

    #[test]
    fn test_rejects_bad_extension() {
        let dir = tempdir().unwrap();
        assert!(ScratchArtifacts::new(dir.path(), "").is_err());
        assert!(ScratchArtifacts::new(dir.path(), "../wav").is_err());
    }

    #[test]
    fn test_cleanup_removes_files() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("upload.wav");
        fs::write(&source, b"RIFF").unwrap();

        let mut artifacts = ScratchArtifacts::new(dir.path().join("scratch"), "wav").unwrap();
        artifacts.stage_audio(&source).unwrap();
        fs::write(artifacts.spectrogram_path(), b"jpeg").unwrap();
        assert!(artifacts.audio_path().exists());

        artifacts.cleanup().unwrap();
        assert!(!artifacts.audio_path().exists());
        assert!(!artifacts.spectrogram_path().exists());
        assert!(source.exists(), "Original upload must be left alone");
    }

    #[test]
    fn test_drop_removes_files() {
        let dir = tempdir().unwrap();
        let (audio, image) = {
            let artifacts = ScratchArtifacts::new(dir.path(), "wav").unwrap();
            fs::write(artifacts.audio_path(), b"data").unwrap();
            fs::write(artifacts.spectrogram_path(), b"data").unwrap();
            (
                artifacts.audio_path().to_path_buf(),
                artifacts.spectrogram_path().to_path_buf(),
            )
        };
        assert!(!audio.exists());
        assert!(!image.exists());
    }

    #[test]
    fn test_cleanup_tolerates_missing_files() {
        let dir = tempdir().unwrap();
        let mut artifacts = ScratchArtifacts::new(dir.path(), "wav").unwrap();
        assert!(artifacts.cleanup().is_ok());
    }
}

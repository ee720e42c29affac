//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione del motore e del front-end CLI.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con i parametri di esecuzione
//! - Fornisce validazione dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `workers`: Richieste elaborate in parallelo (default: 1 = sequenziale)
//! - `max_files_per_batch`: Limite file per batch (1-20, default: 20)
//! - `max_file_size`: Dimensione massima per file in byte (default: 10 MiB)
//! - `perceptual_quantizer`: Usa libimagequant se disponibile (default: true)
//! - `post_optimize`: Applica oxipng / strip marker JPEG (default: true)
//! - `json_output`: Output JSON-lines per uso programmatico (default: false)
//!
//! I preset degli encoder (qualità 85, WebP method 6, 256 colori) sono costanti
//! e non fanno parte della configurazione.
//!
//! ## Esempio:
//! ```rust
//! let config = Config {
//!     workers: 4,
//!     post_optimize: false,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hard ceiling on files per batch
pub const MAX_FILES_PER_BATCH: usize = 20;
/// Default per-file size limit (10 MiB)
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Engine and front-end configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of requests compressed concurrently (1 = strictly sequential)
    pub workers: usize,
    /// Batch size limit enforced at the boundary
    pub max_files_per_batch: usize,
    /// Per-file size limit in bytes
    pub max_file_size: usize,
    /// Prefer libimagequant for palette quantization
    pub perceptual_quantizer: bool,
    /// Run lossless post-optimizers after encoding
    pub post_optimize: bool,
    /// Output progress and status as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 1,
            max_files_per_batch: MAX_FILES_PER_BATCH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            perceptual_quantizer: true,
            post_optimize: true,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.max_files_per_batch == 0 || self.max_files_per_batch > MAX_FILES_PER_BATCH {
            return Err(anyhow::anyhow!(
                "Files per batch must be between 1 and {}",
                MAX_FILES_PER_BATCH
            ));
        }

        if self.max_file_size == 0 {
            return Err(anyhow::anyhow!("Maximum file size must be greater than 0"));
        }

        Ok(())
    }

    /// Load configuration from file; a missing file yields the defaults
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = 2;
        config.max_files_per_batch = 21;
        assert!(config.validate().is_err());

        config.max_files_per_batch = 0;
        assert!(config.validate().is_err());

        config.max_files_per_batch = 5;
        config.max_file_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.workers, 1);
        assert_eq!(config.max_files_per_batch, 20);
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
        assert!(config.perceptual_quantizer);
        assert!(config.post_optimize);
        assert!(!config.json_output);
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            workers: 4,
            max_files_per_batch: 10,
            max_file_size: 1024,
            perceptual_quantizer: false,
            post_optimize: false,
            json_output: true,
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config, original_config);
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.json");
        tokio::fs::write(&config_path, r#"{ "workers": 3 }"#).await.unwrap();

        let config = Config::from_file(&config_path).await.unwrap();
        assert_eq!(config.workers, 3);
        assert_eq!(config.max_files_per_batch, 20);
    }

    #[tokio::test]
    async fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.json");
        tokio::fs::write(&config_path, r#"{ "max_files_per_batch": 50 }"#).await.unwrap();

        assert!(Config::from_file(&config_path).await.is_err());
    }
}

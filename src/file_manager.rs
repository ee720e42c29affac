//! # File Management Module
//!
//! Operazioni sui file per il front-end CLI. Il motore lavora solo in memoria:
//! qui si leggono gli input e si scrivono gli output.
//!
//! ## Responsabilità:
//! - Discovery ricorsiva delle immagini nelle directory passate da riga di comando
//! - Calcolo del path di output (l'estensione segue il formato risolto)
//! - Lettura/scrittura asincrona con `tokio::fs`
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati cercati nelle directory:
//! PNG, JPG, JPEG, WebP. I file indicati esplicitamente vengono sempre inclusi:
//! è il rilevamento del contenuto a decidere se sono validi.

use crate::format::EncodedFormat;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Manages file operations and discovery
pub struct FileManager;

impl FileManager {
    /// Expand the command line inputs into a sorted list of files
    pub fn find_image_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_file() {
                files.push(input.clone());
                continue;
            }
            if !input.is_dir() {
                return Err(anyhow::anyhow!("Input does not exist: {}", input.display()));
            }

            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| Self::is_supported_extension(p))
                .collect();
            found.sort();
            debug!("Found {} image(s) under {}", found.len(), input.display());
            files.extend(found);
        }

        Ok(files)
    }

    /// Check if a file extension is one of the accepted image formats
    pub fn is_supported_extension(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            matches!(ext_lower.as_str(), "jpg" | "jpeg" | "png" | "webp")
        } else {
            false
        }
    }

    /// Display name used as the request filename
    pub fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// `<output_dir>/<stem>.<extension of the resolved format>`
    pub fn output_path(input: &Path, output_dir: &Path, format: EncodedFormat) -> Result<PathBuf> {
        let file_stem = input
            .file_stem()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", input.display()))?
            .to_string_lossy();
        Ok(output_dir.join(format!("{}.{}", file_stem, format.extension())))
    }

    pub async fn read_file(path: &Path) -> Result<Vec<u8>> {
        fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Write bytes, creating parent directories when needed
    pub async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create parent directories for {}", path.display()))?;
        }
        fs::write(path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}

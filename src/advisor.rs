//! # Format Advisor Module
//!
//! Analisi di un'immagine per suggerire il formato di output più adatto.
//!
//! ## Euristica:
//! - Trasparenza effettiva → `Modern` (WebP conserva l'alpha a costo ridotto)
//! - Sorgente già indicizzata → `PaletteRaster`
//! - Immagine "semplice" (icone, loghi) → `PaletteRaster`
//!   - < 100k pixel: meno di 256 colori distinti
//!   - altrimenti: ridotta a 100x100, meno di 100 colori distinti
//! - Tutto il resto (foto) → `Modern`
//!
//! ## Report `inspect`:
//! Formato, dimensioni, modalità colore, numero di colori distinti e fascia
//! di palette (≤64 / ≤128 / ≤256 / truecolor).

use crate::detector::{self, DecodedImage, SourceImage};
use crate::error::CompressError;
use crate::format::{ColorMode, OutputFormat};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

const SMALL_IMAGE_PIXELS: u64 = 100_000;
const SAMPLE_SIDE: u32 = 100;
const SIMPLE_SMALL_MAX_COLORS: usize = 256;
const SIMPLE_SAMPLED_MAX_COLORS: usize = 100;

/// How many palette entries the image needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteBucket {
    UpTo64,
    UpTo128,
    UpTo256,
    Truecolor,
}

impl PaletteBucket {
    pub fn from_color_count(colors: usize) -> Self {
        match colors {
            0..=64 => PaletteBucket::UpTo64,
            65..=128 => PaletteBucket::UpTo128,
            129..=256 => PaletteBucket::UpTo256,
            _ => PaletteBucket::Truecolor,
        }
    }
}

impl fmt::Display for PaletteBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaletteBucket::UpTo64 => "64 colors or less",
            PaletteBucket::UpTo128 => "128 colors or less",
            PaletteBucket::UpTo256 => "256 colors or less",
            PaletteBucket::Truecolor => "truecolor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub source: SourceImage,
    pub distinct_colors: usize,
    pub palette_bucket: PaletteBucket,
    pub uses_transparency: bool,
    pub suggested_format: OutputFormat,
}

/// Suggest an output format for already decoded pixels
pub fn suggest_format(image: &DecodedImage) -> OutputFormat {
    if image.uses_transparency() {
        return OutputFormat::Modern;
    }
    if image.info.color_mode == ColorMode::Indexed {
        return OutputFormat::PaletteRaster;
    }

    let rgba = image.pixels.to_rgba8();
    if is_simple_image(&rgba) {
        OutputFormat::PaletteRaster
    } else {
        OutputFormat::Modern
    }
}

/// Decode and analyse
pub fn inspect(bytes: &[u8]) -> Result<InspectReport, CompressError> {
    let image = detector::decode(bytes)?;
    let distinct_colors = count_colors(&image.pixels.to_rgba8());

    Ok(InspectReport {
        source: image.info,
        distinct_colors,
        palette_bucket: PaletteBucket::from_color_count(distinct_colors),
        uses_transparency: image.uses_transparency(),
        suggested_format: suggest_format(&image),
    })
}

fn is_simple_image(rgba: &RgbaImage) -> bool {
    let pixels = u64::from(rgba.width()) * u64::from(rgba.height());
    if pixels < SMALL_IMAGE_PIXELS {
        count_colors(rgba) < SIMPLE_SMALL_MAX_COLORS
    } else {
        let sample = imageops::resize(rgba, SAMPLE_SIDE, SAMPLE_SIDE, FilterType::Lanczos3);
        count_colors(&sample) < SIMPLE_SAMPLED_MAX_COLORS
    }
}

fn count_colors(rgba: &RgbaImage) -> usize {
    rgba.pixels().map(|p| p.0).collect::<HashSet<[u8; 4]>>().len()
}

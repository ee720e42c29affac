//! JPEG metadata stripping.
//!
//! Drops application (APPn) and comment (COM) segments. ICC profiles (APP2)
//! and the Adobe colour transform marker (APP14) are kept because they change
//! how the pixels render. Scan data is copied untouched.

use super::{PostOptimizeError, PostOptimizer};
use img_parts::jpeg::{markers, Jpeg};
use img_parts::Bytes;

const BACKEND: &str = "jpeg-marker-strip";

#[derive(Debug, Clone, Copy, Default)]
pub struct JpegMarkerStripper;

impl JpegMarkerStripper {
    fn is_strippable(marker: u8) -> bool {
        match marker {
            markers::APP2 | markers::APP14 => false,
            markers::APP0..=markers::APP15 | markers::COM => true,
            _ => false,
        }
    }
}

impl PostOptimizer for JpegMarkerStripper {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn optimize(&self, bytes: &[u8]) -> Result<Vec<u8>, PostOptimizeError> {
        let failed = |message: String| PostOptimizeError::Failed {
            backend: BACKEND,
            message,
        };

        let mut jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes))
            .map_err(|e| failed(format!("failed to parse JPEG: {}", e)))?;
        jpeg.segments_mut()
            .retain(|segment| !Self::is_strippable(segment.marker()));

        let mut output = Vec::with_capacity(bytes.len());
        jpeg.encoder()
            .write_to(&mut output)
            .map_err(|e| failed(format!("failed to write JPEG: {}", e)))?;
        Ok(output)
    }
}

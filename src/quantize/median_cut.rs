//! Median-cut palette quantization.
//!
//! Always-available fallback backend: pure Rust, no optional dependency,
//! deterministic (colors are processed in sorted order, never hash order).
//! Images that already use no more than `max_colors` distinct colors are
//! mapped exactly.

use super::{IndexedImage, QuantizeError, Quantizer};
use image::RgbaImage;

#[derive(Debug, Clone, Copy)]
struct ColorCount {
    rgba: [u8; 4],
    count: u32,
}

/// Range `start..end` of the (reordered) color histogram
#[derive(Debug, Clone, Copy)]
struct ColorBox {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MedianCutQuantizer;

impl Quantizer for MedianCutQuantizer {
    fn name(&self) -> &'static str {
        "median-cut"
    }

    fn quantize(&self, image: &RgbaImage, max_colors: u16) -> Result<IndexedImage, QuantizeError> {
        if max_colors < 2 || max_colors > 256 {
            return Err(QuantizeError::InvalidColorCount(max_colors));
        }

        let (width, height) = image.dimensions();
        let mut histogram = build_histogram(image);

        let boxes = if histogram.len() <= max_colors as usize {
            (0..histogram.len())
                .map(|i| ColorBox { start: i, end: i + 1 })
                .collect()
        } else {
            split_boxes(&mut histogram, max_colors as usize)
        };

        let palette: Vec<[u8; 4]> = boxes.iter().map(|b| average_color(&histogram[b.start..b.end])).collect();

        // color -> palette index, sorted for binary search
        let mut lookup: Vec<(u32, u8)> = Vec::with_capacity(histogram.len());
        for (index, color_box) in boxes.iter().enumerate() {
            for entry in &histogram[color_box.start..color_box.end] {
                lookup.push((pack(entry.rgba), index as u8));
            }
        }
        lookup.sort_unstable_by_key(|&(key, _)| key);

        let mut indices = Vec::with_capacity((width as usize) * (height as usize));
        for pixel in image.pixels() {
            let key = pack(pixel.0);
            let position = lookup
                .binary_search_by_key(&key, |&(k, _)| k)
                .map_err(|_| QuantizeError::Failed {
                    backend: "median-cut",
                    message: format!("color {:08x} missing from histogram", key),
                })?;
            indices.push(lookup[position].1);
        }

        Ok(IndexedImage {
            width,
            height,
            palette,
            indices,
        })
    }
}

fn pack(rgba: [u8; 4]) -> u32 {
    u32::from_be_bytes(rgba)
}

/// Distinct colors with their pixel counts, sorted by packed value
fn build_histogram(image: &RgbaImage) -> Vec<ColorCount> {
    let mut packed: Vec<u32> = image.pixels().map(|p| pack(p.0)).collect();
    packed.sort_unstable();

    let mut histogram: Vec<ColorCount> = Vec::new();
    for key in packed {
        match histogram.last_mut() {
            Some(last) if pack(last.rgba) == key => last.count += 1,
            _ => histogram.push(ColorCount {
                rgba: key.to_be_bytes(),
                count: 1,
            }),
        }
    }
    histogram
}

/// Widest channel of a box as (channel, range)
fn widest_channel(entries: &[ColorCount]) -> (usize, u8) {
    let mut best = (0, 0);
    for channel in 0..4 {
        let (min, max) = entries.iter().fold((u8::MAX, u8::MIN), |(lo, hi), e| {
            (lo.min(e.rgba[channel]), hi.max(e.rgba[channel]))
        });
        let range = max.saturating_sub(min);
        if range > best.1 {
            best = (channel, range);
        }
    }
    best
}

fn split_boxes(histogram: &mut [ColorCount], max_colors: usize) -> Vec<ColorBox> {
    let mut boxes = vec![ColorBox {
        start: 0,
        end: histogram.len(),
    }];

    while boxes.len() < max_colors {
        // Box con il canale più esteso; a parità vince il primo
        let mut candidate: Option<(usize, usize, u8)> = None;
        for (i, b) in boxes.iter().enumerate() {
            if b.end - b.start < 2 {
                continue;
            }
            let (channel, range) = widest_channel(&histogram[b.start..b.end]);
            if candidate.map_or(true, |(_, _, best)| range > best) {
                candidate = Some((i, channel, range));
            }
        }

        let Some((box_index, channel, _)) = candidate else {
            break;
        };

        let ColorBox { start, end } = boxes[box_index];
        let slice = &mut histogram[start..end];
        slice.sort_by_key(|e| (e.rgba[channel], pack(e.rgba)));

        // Weighted median along the chosen channel
        let total: u64 = slice.iter().map(|e| u64::from(e.count)).sum();
        let mut cumulative = 0u64;
        let mut split = slice.len() / 2;
        for (i, entry) in slice.iter().enumerate() {
            cumulative += u64::from(entry.count);
            if cumulative * 2 >= total {
                split = i + 1;
                break;
            }
        }
        let split = split.clamp(1, slice.len() - 1);

        boxes[box_index] = ColorBox {
            start,
            end: start + split,
        };
        boxes.push(ColorBox {
            start: start + split,
            end,
        });
    }

    boxes
}

/// Pixel-count weighted mean of a box
fn average_color(entries: &[ColorCount]) -> [u8; 4] {
    let mut sums = [0u64; 4];
    let mut total = 0u64;
    for entry in entries {
        let weight = u64::from(entry.count);
        for (sum, &channel) in sums.iter_mut().zip(entry.rgba.iter()) {
            *sum += u64::from(channel) * weight;
        }
        total += weight;
    }
    if total == 0 {
        return [0, 0, 0, 0];
    }
    let mut color = [0u8; 4];
    for (out, sum) in color.iter_mut().zip(sums) {
        *out = ((sum + total / 2) / total) as u8;
    }
    color
}

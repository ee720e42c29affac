//! In-memory fixtures shared by the unit tests

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// Smooth photographic-like gradient (many distinct colors)
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    let w = width.max(2) - 1;
    let h = height.max(2) - 1;
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / w) as u8,
            (y * 255 / h) as u8,
            ((x + y) * 255 / (w + h)) as u8,
        ])
    })
}

/// Gradient with a horizontal alpha ramp
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    let rgb = gradient_rgb(width, height);
    let w = width.max(2) - 1;
    RgbaImage::from_fn(width, height, |x, y| {
        let p = rgb.get_pixel(x, y).0;
        Rgba([p[0], p[1], p[2], (x * 255 / w) as u8])
    })
}

pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn jpeg_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// Lossless WebP written by the `image` crate
pub fn webp_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
        .unwrap();
    buf
}

/// Lossy WebP with an alpha channel, written by libwebp
pub fn webp_lossy_rgba_bytes(image: &RgbaImage) -> Vec<u8> {
    webp::Encoder::from_rgba(image.as_raw(), image.width(), image.height())
        .encode(80.0)
        .to_vec()
}

/// Indexed PNG (colour type 3) with a four-entry palette
pub fn palette_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let palette: [u8; 12] = [255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
    let indices: Vec<u8> = (0..width * height).map(|i| (i % 4) as u8).collect();

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_palette(palette.to_vec());
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&indices).unwrap();
        writer.finish().unwrap();
    }
    buf
}

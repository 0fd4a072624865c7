// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Serializes rendered images.  The pixels are copied out of the
//! `RenderedImage` before anything is drawn over them, so an image can
//! be encoded any number of times, with or without decoration.

use image::png::PNGEncoder;
use image::ColorType;
use itertools::iproduct;
use std::cmp::max;
use std::fs::File;
use std::path::Path;

use errors::{RenderError, Result};
use render::RenderedImage;

/// Bracket color.
const BRACKET_RGB: [u8; 3] = [255, 255, 255];
const BRACKET_ALPHA: u8 = 220;
const LABEL_ALPHA: u8 = 255;

/// Encodes the image as an 8-bit RGBA PNG.
pub fn encode_png(image: &RenderedImage) -> Result<Vec<u8>> {
    write_png(image, None, Vec::new())
}

/// Encodes the image as an 8-bit RGBA PNG with a "]" shaped bracket
/// drawn down the right-hand edge, marking the vertical extent of the
/// viewport, and the viewport's `scale` printed beside it.
pub fn encode_png_with_bracket(image: &RenderedImage, scale: f64) -> Result<Vec<u8>> {
    write_png(image, Some(scale), Vec::new())
}

/// Encodes the image and writes it to `outfile`, with the scale bracket
/// if `bracket` carries the viewport's scale.
pub fn save_png<P: AsRef<Path>>(image: &RenderedImage, bracket: Option<f64>, outfile: P) -> Result<()> {
    let output = File::create(outfile.as_ref()).map_err(|e| RenderError::output(&outfile, e))?;
    write_png(image, bracket, output)?;
    Ok(())
}

fn write_png<W: ::std::io::Write>(image: &RenderedImage, bracket: Option<f64>, mut output: W) -> Result<W> {
    let mut bytes = image.to_rgba_bytes();
    if let Some(scale) = bracket {
        let (width, height) = (image.width() as usize, image.height() as usize);
        draw_bracket(&mut bytes, width, height);
        draw_label(&mut bytes, width, height, &scale_label(scale));
    }
    PNGEncoder::new(&mut output).encode(&bytes, image.width(), image.height(), ColorType::RGBA(8))?;
    Ok(output)
}

/// Geometry of the scale bracket for a `width` by `height` image:
/// (left, right, top, bottom, thickness), all in pixels.
fn bracket_geometry(width: usize, height: usize) -> (usize, usize, usize, usize, usize) {
    let bar_width = max(12, (width as f64 * 0.045) as usize);
    let padding = max(8, (width as f64 * 0.02) as usize);
    let thickness = max(2, (bar_width as f64 * 0.25) as usize);
    let right = width.saturating_sub(padding);
    let left = right.saturating_sub(bar_width);
    let bottom = height.saturating_sub(padding);
    (left, right, padding, bottom, thickness)
}

fn blend(bytes: &mut [u8], width: usize, height: usize, x: usize, y: usize, alpha: u8) {
    if x >= width || y >= height {
        return;
    }
    let offset = (y * width + x) * 4;
    let alpha = u32::from(alpha);
    for (channel, &ink) in bytes[offset..offset + 3].iter_mut().zip(BRACKET_RGB.iter()) {
        let mixed = (u32::from(ink) * alpha + u32::from(*channel) * (255 - alpha) + 127) / 255;
        *channel = mixed as u8;
    }
}

fn fill_rect(bytes: &mut [u8], width: usize, height: usize, xs: (usize, usize), ys: (usize, usize)) {
    for y in ys.0..ys.1 {
        for x in xs.0..xs.1 {
            blend(bytes, width, height, x, y, BRACKET_ALPHA);
        }
    }
}

/// Draws the top, right and bottom strokes of the bracket.  Strokes are
/// centered on their nominal line, and corners are only painted once.
fn draw_bracket(bytes: &mut [u8], width: usize, height: usize) {
    let (left, right, top, bottom, thickness) = bracket_geometry(width, height);
    if left >= right || top >= bottom {
        return;
    }
    let half = thickness / 2;
    let band = |line: usize| (line.saturating_sub(half), line.saturating_sub(half) + thickness);
    let (top_a, top_b) = band(top);
    let (bottom_a, bottom_b) = band(bottom);
    let (right_a, right_b) = band(right);

    fill_rect(bytes, width, height, (left, right_b), (top_a, top_b));
    fill_rect(bytes, width, height, (left, right_b), (bottom_a, bottom_b));
    fill_rect(bytes, width, height, (right_a, right_b), (top_b, bottom_a));
}

/// The scale in exponent notation with two decimals and a signed,
/// two-digit exponent: `1.50e+00`, `2.50e-04`.
fn scale_label(scale: f64) -> String {
    let formatted = format!("{:.2e}", scale);
    match formatted.find('e') {
        Some(index) => {
            let exponent = formatted[index + 1..].parse::<i32>().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", &formatted[..index], sign, exponent.abs())
        }
        None => formatted,
    }
}

/// 3x5 glyphs, one row per entry, most significant of the three bits on
/// the left.  Covers everything `scale_label` can produce.
fn glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        'e' => [0b000, 0b110, 0b111, 0b100, 0b011],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        _ => [0; 5],
    }
}

/// Where a label of `chars` glyphs goes and how big a glyph cell is:
/// (x, y, cell).  Glyphs are about 4% of the image height tall, and the
/// label ends two cells short of the bracket, just below its top
/// stroke.  `x` may be negative on narrow images, in which case the
/// label is clipped on the left.
fn label_geometry(width: usize, height: usize, chars: usize) -> (isize, usize, usize) {
    let bar_width = max(12, (width as f64 * 0.045) as usize);
    let padding = max(8, (width as f64 * 0.02) as usize);
    let font_size = max(12, (height as f64 * 0.04) as usize);
    let cell = max(1, font_size / 5);
    let label_width = (chars * 4 * cell).saturating_sub(cell);
    let left = width as isize - (bar_width + padding) as isize;
    (left - (label_width + 2 * cell) as isize, padding + 6, cell)
}

fn draw_label(bytes: &mut [u8], width: usize, height: usize, label: &str) {
    let (x, y, cell) = label_geometry(width, height, label.chars().count());
    for (index, c) in label.chars().enumerate() {
        let glyph_x = x + (index * 4 * cell) as isize;
        for (row, &bits) in glyph(c).iter().enumerate() {
            for column in 0..3 {
                if bits & (0b100_u8 >> column) == 0 {
                    continue;
                }
                let cell_x = glyph_x + (column * cell) as isize;
                for (dx, dy) in iproduct!(0..cell, 0..cell) {
                    let px = cell_x + dx as isize;
                    if px >= 0 {
                        blend(bytes, width, height, px as usize, y + row * cell + dy, LABEL_ALPHA);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planes::Viewport;
    use render::{render, RenderRequest};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn small_image() -> RenderedImage {
        let request = RenderRequest::new(Viewport::default(), 200, 100, 30).unwrap();
        render(&request)
    }

    #[test]
    fn encodes_a_png() {
        let bytes = encode_png(&small_image()).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE[..]);
    }

    #[test]
    fn png_decodes_back_to_the_same_pixels() {
        let image = small_image();
        let bytes = encode_png(&image).unwrap();
        let decoded = ::image::load_from_memory(&bytes).unwrap().to_rgba();
        assert_eq!(decoded.dimensions(), (200, 100));
        assert_eq!(decoded.into_raw(), image.to_rgba_bytes());
    }

    #[test]
    fn bracket_leaves_the_source_image_alone() {
        let image = small_image();
        let before = image.clone();
        let plain = encode_png(&image).unwrap();
        let bracketed = encode_png_with_bracket(&image, 1.5).unwrap();
        assert_ne!(plain, bracketed);
        assert_eq!(image, before);
    }

    #[test]
    fn bracket_geometry_matches_image_size() {
        // 800 wide: bar 36, padding 16, thickness 9
        assert_eq!(bracket_geometry(800, 600), (748, 784, 16, 584, 9));
        // small images fall back to the minimums
        assert_eq!(bracket_geometry(100, 100), (80, 92, 8, 92, 3));
    }

    #[test]
    fn bracket_brightens_the_right_edge() {
        let image = small_image();
        let mut bytes = image.to_rgba_bytes();
        draw_bracket(&mut bytes, 200, 100);
        let (_, right, _, _, _) = bracket_geometry(200, 100);
        let offset = (50 * 200 + right) * 4;
        assert!(bytes[offset] >= 220);
        assert!(bytes[offset + 1] >= 220);
        assert!(bytes[offset + 2] >= 220);
        // the far left column is untouched
        let row_start = 50 * 200 * 4;
        assert_eq!(
            &bytes[row_start..row_start + 4],
            &image.to_rgba_bytes()[row_start..row_start + 4]
        );
    }

    #[test]
    fn labels_use_signed_two_digit_exponents() {
        assert_eq!(scale_label(1.5), "1.50e+00");
        assert_eq!(scale_label(0.00025), "2.50e-04");
        assert_eq!(scale_label(1234.5), "1.23e+03");
    }

    #[test]
    fn label_is_drawn_left_of_the_bracket() {
        let (width, height) = (800, 600);
        let mut bytes = vec![0; width * height * 4];
        draw_label(&mut bytes, width, height, "1.50e+00");
        // 800x600: cell 4, label 124 wide, bracket starts at 748
        let (x, y, cell) = label_geometry(width, height, 8);
        assert_eq!((x, y, cell), (616, 22, 4));
        // '1' has its top stroke in the middle column
        let lit = |px: usize, py: usize| bytes[(py * width + px) * 4] == 255;
        assert!(!lit(616, 22));
        assert!(lit(620, 22));
        assert!(bytes[..y * width * 4].iter().all(|&b| b == 0));
        let (left, _, _, _, _) = bracket_geometry(width, height);
        for row in y..y + 5 * cell {
            for column in left - 2 * cell..width {
                assert!(!lit(column, row));
            }
        }
    }

    #[test]
    fn label_clips_on_narrow_images() {
        let (width, height) = (50, 50);
        let mut bytes = vec![0; width * height * 4];
        draw_label(&mut bytes, width, height, "1.50e+00");
        assert!(bytes.iter().any(|&b| b == 255));
    }

    #[test]
    fn different_scales_give_different_labels() {
        let image = small_image();
        assert_ne!(
            encode_png_with_bracket(&image, 1.5).unwrap(),
            encode_png_with_bracket(&image, 0.25).unwrap()
        );
    }

    #[test]
    fn save_png_reports_unwritable_paths() {
        match save_png(&small_image(), None, "/nonexistent/dir/out.png") {
            Err(RenderError::OutputFailure { ref path, .. }) => {
                assert_eq!(path, "/nonexistent/dir/out.png");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn save_png_writes_a_file() {
        let dir = ::tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        save_png(&small_image(), Some(1.5), &path).unwrap();
        let decoded = ::image::open(&path).unwrap().to_rgba();
        assert_eq!(decoded.dimensions(), (200, 100));
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Procedural preview textures for catalog materials

use crate::error::Result;
use crate::materials::{Material, MaterialKind};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Cursor;

/// Edge length of generated textures
pub const TEXTURE_SIZE: u32 = 256;

const BRICK_HEIGHT: u32 = 32;
const BRICK_WIDTH: u32 = 64;
const GRAIN_SPACING: u32 = 8;
const FLOWER_COUNT: usize = 50;

fn shift(color: [u8; 3], delta: i32) -> Rgb<u8> {
    Rgb(color.map(|c| (c as i32 + delta).clamp(0, 255) as u8))
}

/// Render a tileable-looking texture for `material`.
///
/// The pattern depends on the material kind; the noise is seeded from the
/// material id so the same material always yields the same image.
pub fn generate_texture(material: &Material, size: u32) -> RgbImage {
    let size = size.max(1);
    let mut img = RgbImage::from_pixel(size, size, Rgb(material.color));
    let mut rng = StdRng::seed_from_u64(seed_for(&material.id));

    match material.kind {
        MaterialKind::Brick => brick_pattern(&mut img, material.color),
        MaterialKind::Wood => wood_grain(&mut img, material.color, &mut rng),
        MaterialKind::Wallpaper => floral_dots(&mut img, material.color, &mut rng),
        MaterialKind::Concrete => add_noise(&mut img, 20, &mut rng),
        MaterialKind::Paint => add_noise(&mut img, 5, &mut rng),
    }
    img
}

/// Generate and PNG-encode a texture
pub fn texture_png(material: &Material, size: u32) -> Result<Vec<u8>> {
    let img = generate_texture(material, size);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

// FNV-1a
fn seed_for(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

fn brick_pattern(img: &mut RgbImage, base: [u8; 3]) {
    let (w, h) = img.dimensions();
    let mortar = shift(base, -20);
    for (row, y) in (0..h).step_by(BRICK_HEIGHT as usize).enumerate() {
        let offset = if row % 2 == 1 { BRICK_WIDTH / 2 } else { 0 };
        for x in (0..w).step_by(BRICK_WIDTH as usize) {
            let x_pos = ((x + offset) % w) as i32;
            // Two nested outlines give a 2px mortar line
            for inset in 0..2 {
                let rect = Rect::at(x_pos + inset, y as i32 + inset)
                    .of_size(BRICK_WIDTH - 2 - 2 * inset as u32, BRICK_HEIGHT - 2 - 2 * inset as u32);
                draw_hollow_rect_mut(img, rect, mortar);
            }
        }
    }
}

fn wood_grain(img: &mut RgbImage, base: [u8; 3], rng: &mut StdRng) {
    let (w, h) = img.dimensions();
    let grain = shift(base, -15);
    for line in (0..h).step_by(GRAIN_SPACING as usize) {
        for x in 0..w {
            let y = (line as i32 + rng.random_range(-10..10)).clamp(0, h as i32 - 1);
            img.put_pixel(x, y as u32, grain);
        }
    }
}

fn floral_dots(img: &mut RgbImage, base: [u8; 3], rng: &mut StdRng) {
    let (w, h) = img.dimensions();
    let petal = shift(base, 20);
    for _ in 0..FLOWER_COUNT {
        let center = (rng.random_range(0..w) as i32, rng.random_range(0..h) as i32);
        draw_filled_circle_mut(img, center, 3, petal);
    }
}

fn add_noise(img: &mut RgbImage, amplitude: i32, rng: &mut StdRng) {
    for pixel in img.pixels_mut() {
        for c in pixel.0.iter_mut() {
            *c = (*c as i32 + rng.random_range(-amplitude..amplitude)).clamp(0, 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialCatalog;

    #[test]
    fn test_deterministic() {
        let catalog = MaterialCatalog::builtin();
        let concrete = catalog.get("concrete").unwrap();
        assert_eq!(generate_texture(concrete, 64), generate_texture(concrete, 64));
    }

    #[test]
    fn test_brick_has_mortar_lines() {
        let catalog = MaterialCatalog::builtin();
        let brick = catalog.get("brick_red").unwrap();
        let img = generate_texture(brick, TEXTURE_SIZE);
        assert_eq!(img.dimensions(), (TEXTURE_SIZE, TEXTURE_SIZE));
        assert_eq!(img.get_pixel(0, 0), &Rgb([180, 70, 64]));
        assert_eq!(img.get_pixel(20, 15), &Rgb([200, 90, 84]));
    }

    #[test]
    fn test_paint_noise_is_subtle() {
        let catalog = MaterialCatalog::builtin();
        let paint = catalog.get("gray_paint").unwrap();
        let img = generate_texture(paint, 32);
        assert!(img.pixels().all(|p| p.0.iter().all(|&c| (164..=174).contains(&c))));
    }

    #[test]
    fn test_png_signature() {
        let catalog = MaterialCatalog::builtin();
        let bytes = texture_png(catalog.get("wood_oak").unwrap(), 16).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}

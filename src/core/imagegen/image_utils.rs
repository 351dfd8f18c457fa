// Helpers shared by the rank embeds and the palette card.

use super::ImageError;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use std::io::Cursor;

const MAGNITUDE_SUFFIXES: [&str; 6] = ["", "K", "M", "B", "T", "Q"];

const PALETTE_WIDTH: u32 = 400;
const PALETTE_HEIGHT: u32 = 80;
const PALETTE_BACKGROUND: Rgba<u8> = Rgba([47, 49, 54, 255]);
const SWATCH: u32 = 56;
const SWATCH_GAP: u32 = 8;

/// Shorten large numbers for cards: `1500` becomes `2K`, `-2000000` becomes `-2M`.
pub fn humanize_number(number: i64) -> String {
    if number == 0 {
        return "0".to_string();
    }

    let sign = if number < 0 { "-" } else { "" };
    let value = number.unsigned_abs();
    let mut magnitude = 0;
    let mut scaled = value;
    while scaled >= 1000 {
        scaled /= 1000;
        magnitude += 1;
    }
    match MAGNITUDE_SUFFIXES.get(magnitude) {
        Some(suffix) => format!(
            "{}{:.0}{}",
            sign,
            value as f64 / 1000f64.powi(magnitude as i32),
            suffix
        ),
        None => format!(">999{}", MAGNITUDE_SUFFIXES[MAGNITUDE_SUFFIXES.len() - 1]),
    }
}

/// Greyscale weight of an RGB colour.
pub fn luminance(color: [u8; 3]) -> f64 {
    0.2126 * f64::from(color[0]) + 0.7152 * f64::from(color[1]) + 0.0722 * f64::from(color[2])
}

/// Ratio between the brighter and the darker colour, always `>= 1`.
pub fn contrast_ratio(background: [u8; 3], foreground: [u8; 3]) -> f64 {
    let fg = luminance(foreground) + 0.05;
    let bg = luminance(background) + 0.05;
    if bg > fg {
        bg / fg
    } else {
        fg / bg
    }
}

/// Whichever of `a` and `b` stands out more against `background`. Ties go to `a`.
pub fn contrast(background: [u8; 3], a: [u8; 3], b: [u8; 3]) -> [u8; 3] {
    if contrast_ratio(background, a) >= contrast_ratio(background, b) {
        a
    } else {
        b
    }
}

pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// `name`, or `name (nickname)` when the member has a different display name.
pub fn display_name(name: &str, display: &str, max_len: usize) -> String {
    if name == display {
        return name.to_string();
    }
    let room = max_len.saturating_sub(name.chars().count() + 3);
    format!("{} ({})", name, truncate_text(display, room))
}

/// Left edge that centres something `width` pixels wide between `start` and `end`.
pub fn center(start: i32, end: i32, width: i32) -> i32 {
    start + (end - start - width) / 2
}

/// Round the corners of `im` by rewriting its alpha channel.
///
/// The quarter circles are drawn `multiplier` times larger and scaled down to
/// smooth the edge.
pub fn add_corners(im: &mut RgbaImage, radius: u32, multiplier: u32) {
    if radius == 0 {
        return;
    }

    let raw = radius * 2 * multiplier.max(1);
    let half = raw as f64 / 2.0;
    let big = GrayImage::from_fn(raw, raw, |x, y| {
        let dx = x as f64 + 0.5 - half;
        let dy = y as f64 + 0.5 - half;
        if dx * dx + dy * dy <= half * half {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let circle = imageops::resize(&big, radius * 2, radius * 2, FilterType::Lanczos3);

    let (w, h) = im.dimensions();
    for pixel in im.pixels_mut() {
        pixel.0[3] = 255;
    }

    // (source corner in the circle, destination corner in the image)
    let corners = [
        ((0, 0), (0i64, 0i64)),
        ((0, radius), (0, h as i64 - radius as i64)),
        ((radius, 0), (w as i64 - radius as i64, 0)),
        ((radius, radius), (w as i64 - radius as i64, h as i64 - radius as i64)),
    ];
    for ((sx, sy), (dx, dy)) in corners {
        for y in 0..radius {
            for x in 0..radius {
                let (tx, ty) = (dx + x as i64, dy + y as i64);
                if tx < 0 || ty < 0 || tx >= w as i64 || ty >= h as i64 {
                    continue;
                }
                let alpha = circle.get_pixel(sx + x, sy + y).0[0];
                im.get_pixel_mut(tx as u32, ty as u32).0[3] = alpha;
            }
        }
    }
}

/// PNG card with one square swatch per colour, centred on a rounded background.
pub fn render_palette(colors: &[[u8; 3]]) -> Result<Vec<u8>, ImageError> {
    let mut card = RgbaImage::from_pixel(PALETTE_WIDTH, PALETTE_HEIGHT, PALETTE_BACKGROUND);

    let count = colors.len() as u32;
    let row = count * SWATCH + count.saturating_sub(1) * SWATCH_GAP;
    let left = center(0, PALETTE_WIDTH as i32, row as i32).max(0) as i64;
    let top = ((PALETTE_HEIGHT - SWATCH) / 2) as i64;

    for (i, [r, g, b]) in colors.iter().enumerate() {
        let swatch = RgbaImage::from_pixel(SWATCH, SWATCH, Rgba([*r, *g, *b, 255]));
        let x = left + i as i64 * (SWATCH + SWATCH_GAP) as i64;
        imageops::replace(&mut card, &swatch, x, top);
    }
    add_corners(&mut card, 16, 4);

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(card)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ImageError::Io(e.to_string()))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanizes_by_thousands() {
        assert_eq!(humanize_number(0), "0");
        assert_eq!(humanize_number(999), "999");
        assert_eq!(humanize_number(1500), "2K");
        assert_eq!(humanize_number(-2_000_000), "-2M");
        assert_eq!(humanize_number(1_000_000), "1M");
        assert_eq!(humanize_number(i64::MAX), ">999Q");
    }

    #[test]
    fn contrast_prefers_the_readable_color() {
        let white = [255, 255, 255];
        let black = [0, 0, 0];

        assert_eq!(contrast(black, white, black), white);
        assert_eq!(contrast(white, white, black), black);
        assert_eq!(contrast([128, 128, 128], white, white), white);
        assert!(contrast_ratio(black, white) > 20.0);
    }

    #[test]
    fn names_fit_the_card() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a rather long nickname", 10), "a rathe...");
        assert_eq!(display_name("alice", "alice", 20), "alice");
        assert_eq!(display_name("bob", "The Builder Of Things", 16), "bob (The Bui...)");
    }

    #[test]
    fn center_offsets_from_start() {
        assert_eq!(center(0, 100, 40), 30);
        assert_eq!(center(50, 150, 100), 50);
    }

    #[test]
    fn corners_become_transparent() {
        let mut im = RgbaImage::from_pixel(40, 30, Rgba([10, 20, 30, 0]));

        add_corners(&mut im, 10, 6);

        assert_eq!(im.get_pixel(0, 0).0[3], 0);
        assert_eq!(im.get_pixel(39, 29).0[3], 0);
        assert_eq!(im.get_pixel(20, 15).0[3], 255);
        assert_eq!(im.get_pixel(20, 0).0[3], 255);
        assert_eq!(im.get_pixel(20, 15).0[..3], [10, 20, 30]);
    }

    #[test]
    fn palette_swatches_are_centred() {
        let png = render_palette(&[[255, 0, 0], [0, 0, 255]]).unwrap();
        let card = image::load_from_memory(&png).unwrap().to_rgba8();

        assert_eq!(card.dimensions(), (PALETTE_WIDTH, PALETTE_HEIGHT));
        // two swatches and a gap span 120px, so the first starts at 140
        assert_eq!(card.get_pixel(140, 40), &Rgba([255, 0, 0, 255]));
        assert_eq!(card.get_pixel(139, 40), &PALETTE_BACKGROUND);
        assert_eq!(card.get_pixel(204, 40), &Rgba([0, 0, 255, 255]));
        assert_eq!(card.get_pixel(0, 0).0[3], 0);
    }
}

use super::ImageError;
use image::imageops::FilterType;
use rand::seq::SliceRandom;
use rand::Rng;

const CLUSTERS: usize = 10;
const SAMPLE_SIDE: u32 = 290;
const MAX_ROUNDS: usize = 20;

type Pixel = [f64; 4];

fn distance(a: &Pixel, b: &Pixel) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(pixel: &Pixel, centroids: &[Pixel]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::MAX;
    for (index, centroid) in centroids.iter().enumerate() {
        let d = distance(pixel, centroid);
        if d < best_distance {
            best = index;
            best_distance = d;
        }
    }
    best
}

/// Lloyd's k-means, seeded from distinct colours. Clusters that end up with no
/// pixels are dropped, so fewer than `k` centroids may come back.
fn kmeans<R: Rng + ?Sized>(pixels: &[Pixel], k: usize, rng: &mut R) -> Vec<(Pixel, usize)> {
    let mut distinct: Vec<[u64; 4]> = pixels.iter().map(|p| p.map(|c| c as u64)).collect();
    distinct.sort_unstable();
    distinct.dedup();
    let mut centroids: Vec<Pixel> = distinct
        .choose_multiple(rng, k)
        .map(|p| p.map(|c| c as f64))
        .collect();
    let mut assignment = vec![0usize; pixels.len()];

    for _ in 0..MAX_ROUNDS {
        let mut changed = false;
        for (slot, pixel) in assignment.iter_mut().zip(pixels) {
            let index = nearest(pixel, &centroids);
            if *slot != index {
                *slot = index;
                changed = true;
            }
        }

        let mut sums = vec![[0f64; 4]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (&index, pixel) in assignment.iter().zip(pixels) {
            counts[index] += 1;
            for channel in 0..4 {
                sums[index][channel] += pixel[channel];
            }
        }

        let mut next = Vec::with_capacity(centroids.len());
        for (sum, count) in sums.iter().zip(&counts) {
            if *count > 0 {
                next.push(sum.map(|s| s / *count as f64));
            }
        }
        let dropped = next.len() != centroids.len();
        centroids = next;

        if !changed && !dropped {
            break;
        }
    }

    let mut counts = vec![0usize; centroids.len()];
    for pixel in pixels {
        counts[nearest(pixel, &centroids)] += 1;
    }
    centroids.into_iter().zip(counts).collect()
}

/// Dominant colours of an image as `rrggbb` hex strings.
///
/// `ranks` index clusters by abundance, most common first; a rank past the
/// last cluster picks the least common one.
pub fn auto_color<R: Rng + ?Sized>(
    bytes: &[u8],
    ranks: &[usize],
    rng: &mut R,
) -> Result<Vec<String>, ImageError> {
    let image = image::load_from_memory(bytes).map_err(|_| ImageError::InvalidImage)?;
    let sample = image
        .resize_exact(SAMPLE_SIDE, SAMPLE_SIDE, FilterType::Nearest)
        .to_rgba8();

    let pixels: Vec<Pixel> = sample
        .pixels()
        .map(|p| p.0.map(f64::from))
        .collect();

    let mut clusters = kmeans(&pixels, CLUSTERS, rng);
    clusters.sort_by(|a, b| b.1.cmp(&a.1));
    let Some(last) = clusters.len().checked_sub(1) else {
        return Err(ImageError::InvalidImage);
    };

    Ok(ranks
        .iter()
        .map(|&rank| {
            let (centroid, _) = clusters[rank.min(last)];
            format!(
                "{:02x}{:02x}{:02x}",
                centroid[0] as u8, centroid[1] as u8, centroid[2] as u8
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn encode(im: &RgbaImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        im.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn picks_the_most_common_color_first() {
        // Left three quarters red, right quarter blue.
        let im = RgbaImage::from_fn(100, 100, |x, _| {
            if x < 75 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let mut rng = StdRng::seed_from_u64(7);

        let colors = auto_color(&encode(&im), &[0], &mut rng).unwrap();

        assert_eq!(colors, vec!["ff0000".to_string()]);
    }

    #[test]
    fn ranks_past_the_end_clamp_to_the_last_cluster() {
        let im = RgbaImage::from_pixel(16, 16, Rgba([0x12, 0x34, 0x56, 255]));
        let mut rng = StdRng::seed_from_u64(1);

        let colors = auto_color(&encode(&im), &[0, 3, 42], &mut rng).unwrap();

        assert_eq!(colors, vec!["123456"; 3]);
    }

    #[test]
    fn rejects_bytes_that_are_not_an_image() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = auto_color(b"definitely not a png", &[0], &mut rng).unwrap_err();
        assert!(matches!(err, ImageError::InvalidImage));
    }
}

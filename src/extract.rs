//! Dominant-color extraction from logo images.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};
use kmeans_colors::get_kmeans;
use palette::Lab;
use tracing::{debug, info, trace};

use crate::color::{Rgb, lab_to_rgb, to_hsl, to_lab};
use crate::config::ExtractionConfig;
use crate::error::{PaletteError, Result};
use crate::model::ExtractedColor;

// ------------------------------------------------------------
// Flattening
// ------------------------------------------------------------

/// Composite an image over an opaque `fill`, dropping its alpha channel.
///
/// Every pixel becomes `a * color + (1 - a) * fill`, so fully transparent
/// regions turn into the fill and semi-transparent edges blend into it.
pub fn flatten_onto(img: &DynamicImage, fill: Rgb) -> RgbImage {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::new(w, h);

    for (src, dst) in rgba.pixels().zip(out.pixels_mut()) {
        let alpha = src[3] as f32 / 255.0;
        for c in 0..3 {
            let blended = alpha * src[c] as f32 + (1.0 - alpha) * fill[c] as f32;
            dst[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn downscale(img: RgbImage, scale: u32) -> RgbImage {
    let (orig_w, orig_h) = img.dimensions();
    let max_side = orig_w.max(orig_h);
    if max_side <= scale {
        return img;
    }
    let ratio = scale as f32 / max_side as f32;
    let w = ((orig_w as f32) * ratio).round().max(1.0) as u32;
    let h = ((orig_h as f32) * ratio).round().max(1.0) as u32;
    image::imageops::resize(&img, w, h, FilterType::Nearest)
}

// ------------------------------------------------------------
// Palette extraction
// ------------------------------------------------------------

/// Extract up to `n_colors` dominant colors of a logo with their area share.
///
/// Logos with no more distinct colors than requested are counted exactly;
/// otherwise pixels are grouped by k-means in Lab space and each centroid is
/// mapped back to sRGB. Colors come out most frequent first.
pub fn extract_from_image(
    img: &DynamicImage,
    party: &str,
    config: &ExtractionConfig,
) -> Result<Vec<ExtractedColor>> {
    let (w, h) = img.dimensions();
    trace!(party, w, h, n_colors = config.n_colors, "extract::extract_from_image");
    extract_from_flattened(flatten_onto(img, config.fill_color), party, config)
}

/// [`extract_from_image`] for a logo already flattened with [`flatten_onto`].
pub fn extract_from_flattened(
    flat: RgbImage,
    party: &str,
    config: &ExtractionConfig,
) -> Result<Vec<ExtractedColor>> {
    let working = match config.downscale {
        Some(scale) => downscale(flat, scale),
        None => flat,
    };

    let pixels: Vec<Rgb> = working.pixels().map(|p| p.0).collect();
    let total = pixels.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let mut histogram: HashMap<Rgb, usize> = HashMap::new();
    for &px in &pixels {
        *histogram.entry(px).or_insert(0) += 1;
    }

    let counts: HashMap<Rgb, usize> = if histogram.len() <= config.n_colors {
        debug!(party, distinct = histogram.len(), "exact palette");
        histogram
    } else {
        // Collect Lab pixels for k-means
        let lab_pixels: Vec<Lab> = pixels.iter().map(|&px| to_lab(px)).collect();
        let kmeans = get_kmeans(
            config.n_colors,
            config.max_iterations,
            config.convergence,
            false,
            &lab_pixels,
            config.seed,
        );

        let mut members = vec![0usize; kmeans.centroids.len()];
        for &idx in &kmeans.indices {
            members[idx as usize] += 1;
        }

        let mut merged: HashMap<Rgb, usize> = HashMap::new();
        for (&centroid, &count) in kmeans.centroids.iter().zip(&members) {
            if count > 0 {
                *merged.entry(lab_to_rgb(centroid)).or_insert(0) += count;
            }
        }
        debug!(party, distinct = histogram.len(), kept = merged.len(), "k-means palette");
        merged
    };

    let mut colors: Vec<(Rgb, usize)> = counts.into_iter().collect();
    colors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    colors.truncate(config.n_colors);

    Ok(colors
        .into_iter()
        .map(|(rgb, count)| ExtractedColor {
            party: party.to_string(),
            rgb,
            hsl: to_hsl(rgb),
            proportion: count as f64 / total as f64,
        })
        .collect())
}

/// Party code of a logo file: its file name up to the first `.`.
pub fn party_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let party = name.split('.').next()?;
    (!party.is_empty()).then(|| party.to_string())
}

fn logo_party(path: &Path) -> Result<String> {
    party_from_path(path).ok_or_else(|| PaletteError::MalformedField {
        field: "logo file name",
        value: path.display().to_string(),
    })
}

/// Decode a logo file and extract its dominant colors.
pub fn extract_from_path(path: &Path, config: &ExtractionConfig) -> Result<Vec<ExtractedColor>> {
    let party = logo_party(path)?;
    let img = image::open(path).map_err(|e| PaletteError::image(path, e))?;
    extract_from_image(&img, &party, config)
}

/// PNG logos of a directory, in file-name order.
pub fn list_logos(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| PaletteError::io(dir, e))?;
    let mut logos = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PaletteError::io(dir, e))?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            logos.push(path);
        }
    }
    logos.sort();
    Ok(logos)
}

/// Extract the dominant colors of every PNG logo in `dir`.
///
/// When `save_flattened` is given, each flattened logo is also written there
/// under its original file name.
pub fn extract_directory(
    dir: &Path,
    config: &ExtractionConfig,
    save_flattened: Option<&Path>,
) -> Result<Vec<ExtractedColor>> {
    let logos = list_logos(dir)?;
    info!(dir = %dir.display(), logos = logos.len(), "extracting logo colors");

    if let Some(out_dir) = save_flattened {
        fs::create_dir_all(out_dir).map_err(|e| PaletteError::io(out_dir, e))?;
    }

    let mut rows = Vec::new();
    for path in &logos {
        let party = logo_party(path)?;
        let img = image::open(path).map_err(|e| PaletteError::image(path, e))?;
        let flat = flatten_onto(&img, config.fill_color);

        if let (Some(out_dir), Some(name)) = (save_flattened, path.file_name()) {
            let target = out_dir.join(name);
            flat.save(&target).map_err(|e| PaletteError::image(&target, e))?;
        }

        let colors = extract_from_flattened(flat, &party, config)?;
        debug!(logo = %path.display(), colors = colors.len(), "extracted");
        rows.extend(colors);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn half_transparent_logo() -> DynamicImage {
        let img = RgbaImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgba([200, 16, 46, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn transparent_pixels_take_the_fill() {
        let flat = flatten_onto(&half_transparent_logo(), [220, 220, 220]);
        assert_eq!(flat.get_pixel(0, 0).0, [200, 16, 46]);
        assert_eq!(flat.get_pixel(9, 9).0, [220, 220, 220]);
    }

    #[test]
    fn semi_transparent_pixels_blend() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let flat = flatten_onto(&img, [220, 220, 220]);
        assert_eq!(flat.get_pixel(0, 0).0, [110, 110, 110]);
    }

    #[test]
    fn flat_logo_is_counted_exactly() {
        let colors = extract_from_image(&half_transparent_logo(), "PT", &ExtractionConfig::default()).unwrap();

        assert_eq!(colors.len(), 2);
        assert!(colors.iter().all(|c| c.party == "PT"));
        assert!(colors.iter().all(|c| (c.proportion - 0.5).abs() < 1e-12));
        // equal counts order by RGB
        assert_eq!(colors[0].rgb, [200, 16, 46]);
        assert_eq!(colors[1].rgb, [220, 220, 220]);
    }

    #[test]
    fn busy_logo_is_reduced_to_n_colors() {
        let img = RgbaImage::from_fn(32, 32, |x, y| {
            if x < 16 {
                Rgba([200 + (y % 8) as u8, 10, 20, 255])
            } else {
                Rgba([10, 40 + (y % 8) as u8, 200, 255])
            }
        });
        let config = ExtractionConfig {
            n_colors: 2,
            ..ExtractionConfig::default()
        };
        let colors = extract_from_image(&DynamicImage::ImageRgba8(img), "X", &config).unwrap();

        assert_eq!(colors.len(), 2);
        let total: f64 = colors.iter().map(|c| c.proportion).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(colors.iter().any(|c| c.rgb[0] > 190 && c.rgb[2] < 40));
        assert!(colors.iter().any(|c| c.rgb[2] > 190 && c.rgb[0] < 40));
    }

    #[test]
    fn large_logo_is_downscaled_first() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(400, 200, Rgba([0, 80, 160, 255])));
        let config = ExtractionConfig {
            downscale: Some(100),
            ..ExtractionConfig::default()
        };
        let colors = extract_from_image(&img, "BIG", &config).unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].proportion, 1.0);
    }

    #[test]
    fn flattened_input_matches_image_input() {
        let config = ExtractionConfig::default();
        let flat = flatten_onto(&half_transparent_logo(), config.fill_color);
        let from_flat = extract_from_flattened(flat, "PT", &config).unwrap();
        let from_image = extract_from_image(&half_transparent_logo(), "PT", &config).unwrap();
        assert_eq!(from_flat, from_image);
    }

    #[test]
    fn party_code_from_file_name() {
        assert_eq!(party_from_path(Path::new("logos/PSOL.png")).as_deref(), Some("PSOL"));
        assert_eq!(party_from_path(Path::new("PC.do.B.png")).as_deref(), Some("PC"));
        assert_eq!(party_from_path(Path::new(".png")), None);
    }

    #[test]
    fn directory_extraction_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let flattened = dir.path().join("flattened");
        half_transparent_logo().save(dir.path().join("PT.png")).unwrap();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 128, 0, 255])))
            .save(dir.path().join("PV.png"))
            .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a logo").unwrap();

        let rows = extract_directory(dir.path(), &ExtractionConfig::default(), Some(&flattened)).unwrap();

        let parties: Vec<_> = rows.iter().map(|r| r.party.as_str()).collect();
        assert_eq!(parties, vec!["PT", "PT", "PV"]);
        assert!(flattened.join("PT.png").is_file());

        let saved = image::open(flattened.join("PT.png")).unwrap().to_rgb8();
        assert_eq!(saved.get_pixel(9, 0).0, [220, 220, 220]);
        assert_eq!(saved, flatten_onto(&half_transparent_logo(), [220, 220, 220]));

        // the saved copy extracts to the same rows as the directory run
        let again = extract_from_flattened(saved, "PT", &ExtractionConfig::default()).unwrap();
        assert_eq!(again, rows[..2].to_vec());
    }

    #[test]
    fn missing_file_is_an_image_error() {
        let err = extract_from_path(Path::new("/nonexistent/PT.png"), &ExtractionConfig::default()).unwrap_err();
        assert!(matches!(err, PaletteError::Image { .. }));
    }
}

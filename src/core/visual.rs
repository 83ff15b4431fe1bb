//! Damage indicators computed straight from pixels, independent of any
//! trained model.
//!
//! Every scaling constant below is a fixed design parameter. Changing one
//! changes the scores reported for the reference fixtures.

use crate::domain::model::DamageIndicators;
use crate::utils::error::{Result, TriageError};
use image::{GrayImage, Luma, RgbImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Edge density must be strictly above this before it counts as structural damage.
pub const EDGE_DENSITY_THRESHOLD: f64 = 0.15;
pub const EDGE_DENSITY_SCALE: f64 = 3.0;
pub const SMOKE_FIRE_SCALE: f64 = 5.0;
pub const WATER_SCALE: f64 = 4.0;
pub const LAPLACIAN_VARIANCE_NORMALIZER: f64 = 5000.0;

pub const CANNY_LOW_THRESHOLD: i32 = 50;
pub const CANNY_HIGH_THRESHOLD: i32 = 150;

const TAN_22_5: f64 = 0.414_213_562_373_095;
const TAN_67_5: f64 = 2.414_213_562_373_095;

/// Inclusive bounds in 8-bit HSV (hue 0..=180, saturation and value 0..=255).
#[derive(Debug, Clone, Copy)]
struct HsvBand {
    hue: (u8, u8),
    saturation: (u8, u8),
    value: (u8, u8),
}

impl HsvBand {
    fn contains(&self, (h, s, v): (u8, u8, u8)) -> bool {
        (self.hue.0..=self.hue.1).contains(&h)
            && (self.saturation.0..=self.saturation.1).contains(&s)
            && (self.value.0..=self.value.1).contains(&v)
    }
}

// 火焰：橘紅色
const FIRE_BAND: HsvBand = HsvBand {
    hue: (0, 30),
    saturation: (50, 255),
    value: (50, 255),
};

// 濃煙：低飽和、低亮度
const SMOKE_BAND: HsvBand = HsvBand {
    hue: (0, 180),
    saturation: (0, 50),
    value: (0, 80),
};

// 積水：藍色
const WATER_BAND: HsvBand = HsvBand {
    hue: (100, 130),
    saturation: (50, 255),
    value: (50, 255),
};

pub fn structural_score(edge_density: f64) -> f64 {
    if edge_density > EDGE_DENSITY_THRESHOLD {
        (edge_density * EDGE_DENSITY_SCALE).min(1.0)
    } else {
        0.0
    }
}

pub fn smoke_fire_score(fire_ratio: f64, smoke_ratio: f64) -> f64 {
    ((fire_ratio + smoke_ratio) * SMOKE_FIRE_SCALE).min(1.0)
}

pub fn water_score(water_ratio: f64) -> f64 {
    (water_ratio * WATER_SCALE).min(1.0)
}

pub fn debris_score(laplacian_variance: f64) -> f64 {
    (laplacian_variance / LAPLACIAN_VARIANCE_NORMALIZER).min(1.0)
}

/// Raw pixel statistics that the indicator scores are derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStatistics {
    pub edge_density: f64,
    pub fire_ratio: f64,
    pub smoke_ratio: f64,
    pub water_ratio: f64,
    pub laplacian_variance: f64,
    pub brightness: f64,
    pub contrast: f64,
}

impl PixelStatistics {
    pub fn into_indicators(self) -> DamageIndicators {
        DamageIndicators::from_components(
            structural_score(self.edge_density),
            debris_score(self.laplacian_variance),
            smoke_fire_score(self.fire_ratio, self.smoke_ratio),
            water_score(self.water_ratio),
            self.brightness,
            self.contrast,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VisualDamageAnalyzer;

impl VisualDamageAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Never fails: undecodable input yields `DamageIndicators::fallback`.
    pub fn analyze(&self, image_bytes: &[u8]) -> DamageIndicators {
        match self.try_analyze(image_bytes) {
            Ok(indicators) => {
                tracing::debug!(
                    "Visual damage: overall={:.3} structural={:.3} debris={:.3} smoke_fire={:.3} water={:.3}",
                    indicators.overall_damage_score,
                    indicators.structural_damage_score,
                    indicators.debris_presence,
                    indicators.smoke_fire_indicators,
                    indicators.water_damage_indicators
                );
                indicators
            }
            Err(e) => {
                tracing::error!("❌ Visual damage analysis failed: {}", e);
                DamageIndicators::fallback(e.to_string())
            }
        }
    }

    pub fn try_analyze(&self, image_bytes: &[u8]) -> Result<DamageIndicators> {
        let rgb = decode_rgb(image_bytes)?;
        Ok(self.analyze_rgb(&rgb)?.into_indicators())
    }

    pub fn analyze_rgb(&self, image: &RgbImage) -> Result<PixelStatistics> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(TriageError::InvalidImage {
                message: "image has no pixels".to_string(),
            });
        }
        let total = f64::from(width) * f64::from(height);

        let gray = to_gray(image);

        let edges = canny_edges(&gray, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);
        let edge_pixels = edges.pixels().filter(|p| p[0] > 0).count();

        let mut fire = 0usize;
        let mut smoke = 0usize;
        let mut water = 0usize;
        for pixel in image.pixels() {
            let hsv = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
            if FIRE_BAND.contains(hsv) {
                fire += 1;
            }
            if SMOKE_BAND.contains(hsv) {
                smoke += 1;
            }
            if WATER_BAND.contains(hsv) {
                water += 1;
            }
        }

        let (brightness, contrast) = brightness_contrast(image);

        Ok(PixelStatistics {
            edge_density: edge_pixels as f64 / total,
            fire_ratio: fire as f64 / total,
            smoke_ratio: smoke as f64 / total,
            water_ratio: water as f64 / total,
            laplacian_variance: laplacian_variance(&gray),
            brightness,
            contrast,
        })
    }
}

/// Decodes any supported format and drops alpha / expands grayscale to RGB.
pub fn decode_rgb(image_bytes: &[u8]) -> Result<RgbImage> {
    if image_bytes.is_empty() {
        return Err(TriageError::InvalidImage {
            message: "empty image payload".to_string(),
        });
    }
    let decoded = image::load_from_memory(image_bytes)?;
    Ok(decoded.to_rgb8())
}

/// BT.601 luma with 14-bit fixed-point rounding.
pub fn to_gray(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        let (r, g, b) = (u32::from(p[0]), u32::from(p[1]), u32::from(p[2]));
        let luma = (r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14;
        Luma([luma.min(255) as u8])
    })
}

/// 8-bit HSV: hue halved into 0..=180, saturation and value in 0..=255.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (f64::from(r), f64::from(g), f64::from(b));
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { (255.0 * diff / v).round() };

    let h = if diff == 0.0 {
        0.0
    } else {
        let degrees = if v == rf {
            60.0 * (gf - bf) / diff
        } else if v == gf {
            120.0 + 60.0 * (bf - rf) / diff
        } else {
            240.0 + 60.0 * (rf - gf) / diff
        };
        let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
        (degrees / 2.0).round()
    };

    (h.min(180.0) as u8, s.min(255.0) as u8, v as u8)
}

/// Canny on the unsmoothed image: 3x3 Sobel, L1 magnitude, non-maximum
/// suppression along the quantised gradient direction, then hysteresis.
/// A pixel is an edge when its magnitude is above `high`, or above `low` and
/// 8-connected to one that is. Magnitudes outside the image count as 0.
pub fn canny_edges(gray: &GrayImage, low: i32, high: i32) -> GrayImage {
    const CANDIDATE: u8 = 1;
    const EDGE: u8 = 2;

    let (width, height) = gray.dimensions();
    let (w, h) = (width as usize, height as usize);
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);

    let mut dx = vec![0i32; w * h];
    let mut dy = vec![0i32; w * h];
    let mut magnitude = vec![0i32; w * h];
    for y in 0..height {
        for x in 0..width {
            let i = y as usize * w + x as usize;
            dx[i] = i32::from(gx.get_pixel(x, y)[0]);
            dy[i] = i32::from(gy.get_pixel(x, y)[0]);
            magnitude[i] = dx[i].abs() + dy[i].abs();
        }
    }

    let mag_at = |x: i64, y: i64| -> i32 {
        if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
            0
        } else {
            magnitude[y as usize * w + x as usize]
        }
    };

    let mut state = vec![0u8; w * h];
    let mut stack = Vec::new();
    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let m = magnitude[i];
            if m <= low {
                continue;
            }

            let (xi, yi) = (x as i64, y as i64);
            let (ax, ay) = (f64::from(dx[i].abs()), f64::from(dy[i].abs()));
            let is_peak = if ay < ax * TAN_22_5 {
                m > mag_at(xi - 1, yi) && m >= mag_at(xi + 1, yi)
            } else if ay > ax * TAN_67_5 {
                m > mag_at(xi, yi - 1) && m >= mag_at(xi, yi + 1)
            } else {
                let s = if (dx[i] ^ dy[i]) < 0 { -1 } else { 1 };
                m > mag_at(xi - s, yi - 1) && m > mag_at(xi + s, yi + 1)
            };
            if !is_peak {
                continue;
            }

            if m > high {
                state[i] = EDGE;
                stack.push(i);
            } else {
                state[i] = CANDIDATE;
            }
        }
    }

    // 滯後閾值：從強邊緣往 8 鄰域延伸
    while let Some(i) = stack.pop() {
        let (x, y) = ((i % w) as i64, (i / w) as i64);
        for ny in (y - 1)..=(y + 1) {
            for nx in (x - 1)..=(x + 1) {
                if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if state[j] == CANDIDATE {
                    state[j] = EDGE;
                    stack.push(j);
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        if state[y as usize * w + x as usize] == EDGE {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

fn reflect_101(index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }
    let mut i = index;
    if i < 0 {
        i = -i;
    }
    if i >= len {
        i = 2 * len - 2 - i;
    }
    i.clamp(0, len - 1) as usize
}

/// Population variance of the 4-neighbour Laplacian (mirrored borders).
pub fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let (w, h) = (i64::from(width), i64::from(height));
    if w == 0 || h == 0 {
        return 0.0;
    }

    let at = |x: i64, y: i64| -> i64 {
        let px = reflect_101(x, w) as u32;
        let py = reflect_101(y, h) as u32;
        i64::from(gray.get_pixel(px, py)[0])
    };

    let mut responses = Vec::with_capacity((width as usize) * (height as usize));
    for y in 0..h {
        for x in 0..w {
            let value = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4 * at(x, y);
            responses.push(value as f64);
        }
    }

    let n = responses.len() as f64;
    let mean = responses.iter().sum::<f64>() / n;
    responses.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Mean and standard deviation averaged over the RGB channels, scaled to [0, 1].
pub fn brightness_contrast(image: &RgbImage) -> (f64, f64) {
    let n = f64::from(image.width()) * f64::from(image.height());
    if n == 0.0 {
        return (0.0, 0.0);
    }

    let mut sum = [0f64; 3];
    let mut sum_sq = [0f64; 3];
    for pixel in image.pixels() {
        for c in 0..3 {
            let v = f64::from(pixel[c]);
            sum[c] += v;
            sum_sq[c] += v * v;
        }
    }

    let mut mean_total = 0.0;
    let mut stddev_total = 0.0;
    for c in 0..3 {
        let mean = sum[c] / n;
        let variance = (sum_sq[c] / n - mean * mean).max(0.0);
        mean_total += mean;
        stddev_total += variance.sqrt();
    }

    (mean_total / 3.0 / 255.0, stddev_total / 3.0 / 255.0)
}

use image::GrayImage;

/// Row-major `f32` plane used for responses and gradient work.
#[derive(Clone, Debug)]
pub struct FloatImage {
    pub w: usize,
    pub h: usize,
    pub data: Vec<f32>,
}

impl FloatImage {
    pub fn zeros(w: usize, h: usize) -> FloatImage {
        FloatImage {
            w,
            h,
            data: vec![0.0; w * h],
        }
    }

    pub fn from_gray(img: &GrayImage) -> FloatImage {
        FloatImage {
            w: img.width() as usize,
            h: img.height() as usize,
            data: img.as_raw().iter().map(|&v| v as f32).collect(),
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.w + x]
    }

    #[inline]
    fn clamped(&self, x: i64, y: i64) -> f32 {
        let x = x.clamp(0, self.w as i64 - 1) as usize;
        let y = y.clamp(0, self.h as i64 - 1) as usize;
        self.data[y * self.w + x]
    }

    /// Bilinear sample with edge clamping.
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let p00 = self.clamped(x0, y0);
        let p10 = self.clamped(x0 + 1, y0);
        let p01 = self.clamped(x0, y0 + 1);
        let p11 = self.clamped(x0 + 1, y0 + 1);

        let a = p00 + fx * (p10 - p00);
        let b = p01 + fx * (p11 - p01);
        a + fy * (b - a)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::MIN, f32::max)
    }
}

/// Linear min/max contrast stretch to the full 8-bit range.
pub fn normalize_contrast(img: &GrayImage) -> GrayImage {
    let (lo, hi) = img
        .as_raw()
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi <= lo {
        return img.clone();
    }
    let scale = 255.0 / (hi - lo) as f32;
    let mut out = img.clone();
    for p in out.iter_mut() {
        *p = ((*p - lo) as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Grayscale preparation shared by both corner strategies.
pub fn prepare(img: &GrayImage, normalize: bool, sigma: f32) -> FloatImage {
    let base = if normalize {
        normalize_contrast(img)
    } else {
        img.clone()
    };
    if sigma > 0.0 {
        FloatImage::from_gray(&image::imageops::blur(&base, sigma))
    } else {
        FloatImage::from_gray(&base)
    }
}

/// Local maxima above `threshold` within a `(2 * radius + 1)^2` window.
pub fn non_max_suppression(map: &FloatImage, threshold: f32, radius: usize, border: usize) -> Vec<(usize, usize)> {
    let mut peaks = Vec::new();
    if map.w <= 2 * border || map.h <= 2 * border {
        return peaks;
    }
    let r = radius as i64;
    for y in border..map.h - border {
        for x in border..map.w - border {
            let v = map.at(x, y);
            if v <= threshold {
                continue;
            }
            let mut is_max = true;
            'window: for dy in -r..=r {
                for dx in -r..=r {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i64 + dx;
                    let ny = y as i64 + dy;
                    if nx < 0 || ny < 0 || nx >= map.w as i64 || ny >= map.h as i64 {
                        continue;
                    }
                    let n = map.at(nx as usize, ny as usize);
                    // ties broken towards the earlier pixel in raster order
                    if n > v || (n == v && (dy < 0 || (dy == 0 && dx < 0))) {
                        is_max = false;
                        break 'window;
                    }
                }
            }
            if is_max {
                peaks.push((x, y));
            }
        }
    }
    peaks
}

use super::image::FloatImage;

/// 16-sample ring of radius 5 used by the ChESS response, clockwise from the top.
pub const RING5: [(i32, i32); 16] = [
    (0, -5),
    (2, -5),
    (4, -4),
    (5, -2),
    (5, 0),
    (5, 2),
    (4, 4),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-4, 4),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-4, -4),
    (-2, -5),
];

/// Whether the intensity around `(x, y)` alternates dark/bright four times.
///
/// X-junctions of a chessboard pass, L-corners at the board border and
/// straight edges do not.
pub fn is_x_junction(img: &FloatImage, x: f32, y: f32, radius: f32, min_contrast: f32) -> bool {
    const SAMPLES: usize = 32;
    let mut values = [0.0f32; SAMPLES];
    for (i, v) in values.iter_mut().enumerate() {
        let a = i as f32 * std::f32::consts::TAU / SAMPLES as f32;
        *v = img.sample(x + radius * a.cos(), y + radius * a.sin());
    }
    let lo = values.iter().cloned().fold(f32::MAX, f32::min);
    let hi = values.iter().cloned().fold(f32::MIN, f32::max);
    if hi - lo < min_contrast {
        return false;
    }
    let mid = 0.5 * (lo + hi);
    let transitions = (0..SAMPLES)
        .filter(|&i| (values[i] > mid) != (values[(i + 1) % SAMPLES] > mid))
        .count();
    transitions == 4
}

//! Assembles loose X-junction candidates into an ordered `cols x rows` grid.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;

use super::PatternSize;

/// Fraction of the step length a prediction may be off by.
const PREDICTION_TOLERANCE: f32 = 0.35;
const MAX_SEEDS: usize = 8;

type Cells = HashMap<(i32, i32), usize>;

struct Node {
    key: (i32, i32),
    idx: usize,
    a: Vec2,
    b: Vec2,
}

fn nearest_neighbours(points: &[Vec2], idx: usize, k: usize) -> Vec<(usize, f32)> {
    let p = points[idx];
    let mut d: Vec<(usize, f32)> = points
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(i, q)| (i, p.distance(*q)))
        .collect();
    d.sort_by(|l, r| l.1.total_cmp(&r.1));
    d.truncate(k);
    d
}

/// Two roughly orthogonal lattice steps at `seed`.
fn lattice_vectors(points: &[Vec2], seed: usize) -> Option<(Vec2, Vec2)> {
    let nn = nearest_neighbours(points, seed, 8);
    let (first, _) = *nn.first()?;
    let p = points[seed];
    let a = points[first] - p;
    let a_len = a.length();
    if a_len <= f32::EPSILON {
        return None;
    }
    nn.iter().skip(1).find_map(|&(i, len)| {
        let v = points[i] - p;
        let cos = a.dot(v) / (a_len * len);
        (cos.abs() < 0.5 && len < 2.5 * a_len).then_some((a, v))
    })
}

fn closest_free(points: &[Vec2], taken: &[bool], target: Vec2, tol: f32) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| !taken[*i])
        .map(|(i, p)| (i, p.distance(target)))
        .filter(|(_, d)| *d <= tol)
        .min_by(|l, r| l.1.total_cmp(&r.1))
        .map(|(i, _)| i)
}

/// Breadth-first growth of lattice cells from `seed`.
///
/// Each accepted child carries the measured step along the direction it was
/// reached from, so the prediction follows perspective foreshortening.
fn grow(points: &[Vec2], seed: usize, a: Vec2, b: Vec2, limit: i32) -> Cells {
    let mut cells = Cells::new();
    let mut taken = vec![false; points.len()];
    cells.insert((0, 0), seed);
    taken[seed] = true;

    let mut queue = VecDeque::new();
    queue.push_back(Node {
        key: (0, 0),
        idx: seed,
        a,
        b,
    });
    while let Some(node) = queue.pop_front() {
        for (di, dj) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let key = (node.key.0 + di, node.key.1 + dj);
            if key.0.abs() > limit || key.1.abs() > limit || cells.contains_key(&key) {
                continue;
            }
            let step = if di != 0 {
                node.a * di as f32
            } else {
                node.b * dj as f32
            };
            let p = points[node.idx];
            let Some(q) = closest_free(points, &taken, p + step, PREDICTION_TOLERANCE * step.length()) else {
                continue;
            };
            let measured = points[q] - p;
            let (na, nb) = if di != 0 {
                (measured * di as f32, node.b)
            } else {
                (node.a, measured * dj as f32)
            };
            cells.insert(key, q);
            taken[q] = true;
            queue.push_back(Node {
                key,
                idx: q,
                a: na,
                b: nb,
            });
        }
    }
    cells
}

/// Fully populated windows of `w x h` cells, as `(i0, j0, w, h)`.
fn complete_windows(cells: &Cells, w: usize, h: usize) -> Vec<(i32, i32, usize, usize)> {
    let (imin, imax) = cells.keys().fold((i32::MAX, i32::MIN), |(lo, hi), k| (lo.min(k.0), hi.max(k.0)));
    let (jmin, jmax) = cells.keys().fold((i32::MAX, i32::MIN), |(lo, hi), k| (lo.min(k.1), hi.max(k.1)));
    let (w_i, h_i) = (w as i32, h as i32);
    let mut out = Vec::new();
    for i0 in imin..=imax - w_i + 1 {
        for j0 in jmin..=jmax - h_i + 1 {
            let full = (0..w_i).all(|di| (0..h_i).all(|dj| cells.contains_key(&(i0 + di, j0 + dj))));
            if full {
                out.push((i0, j0, w, h));
            }
        }
    }
    out
}

/// Reorders a row-major grid so rows run downward and the frame is right-handed.
fn canonical_order(mut grid: Vec<Vec<Vec2>>) -> Vec<Vec2> {
    let rows = grid.len();
    let cols = grid.first().map_or(0, |r| r.len());
    let col_dir = |g: &Vec<Vec<Vec2>>| -> Vec2 { g.iter().map(|r| r[cols - 1] - r[0]).sum() };
    let row_dir = |g: &Vec<Vec<Vec2>>| -> Vec2 { (0..cols).map(|c| g[rows - 1][c] - g[0][c]).sum() };

    if rows > 1 {
        if row_dir(&grid).y < 0.0 {
            grid.reverse();
        }
        let (cd, rd) = (col_dir(&grid), row_dir(&grid));
        if cd.x * rd.y - cd.y * rd.x < 0.0 {
            grid.iter_mut().for_each(|r| r.reverse());
        }
    } else if cols > 1 && col_dir(&grid).x < 0.0 {
        grid.iter_mut().for_each(|r| r.reverse());
    }
    grid.into_iter().flatten().collect()
}

fn extract(points: &[Vec2], cells: &Cells, window: (i32, i32, usize, usize), pattern: PatternSize) -> Vec<Vec2> {
    let (i0, j0, w, _) = window;
    // columns follow the i axis when the window is `cols` wide
    let columns_on_i = w == pattern.cols;
    let mut grid = Vec::with_capacity(pattern.rows);
    for r in 0..pattern.rows as i32 {
        let mut row = Vec::with_capacity(pattern.cols);
        for c in 0..pattern.cols as i32 {
            let key = if columns_on_i { (i0 + c, j0 + r) } else { (i0 + r, j0 + c) };
            row.push(points[cells[&key]]);
        }
        grid.push(row);
    }
    if pattern.rows == pattern.cols && pattern.rows > 1 {
        // square pattern: keep columns on the more horizontal axis
        let along = grid[0][pattern.cols - 1] - grid[0][0];
        if along.x.abs() < along.y.abs() {
            let n = pattern.rows;
            grid = (0..n).map(|r| (0..n).map(|c| grid[c][r]).collect()).collect();
        }
    }
    canonical_order(grid)
}

/// Orders candidates into `pattern.rows * pattern.cols` row-major corners.
///
/// On failure returns the positions of the largest connected lattice found,
/// which callers draw as a partial detection.
pub fn assemble_grid(points: &[Vec2], pattern: PatternSize) -> Result<Vec<Vec2>, Vec<Vec2>> {
    let needed = pattern.rows * pattern.cols;
    if needed == 0 || points.len() < needed {
        return Err(points.to_vec());
    }
    if needed == 1 {
        return Ok(vec![points[0]]);
    }

    let centroid = points.iter().copied().sum::<Vec2>() / points.len() as f32;
    let mut seeds: Vec<usize> = (0..points.len()).collect();
    seeds.sort_by(|&l, &r| points[l].distance(centroid).total_cmp(&points[r].distance(centroid)));

    let limit = (pattern.rows.max(pattern.cols) + 2) as i32;
    let mut best: Vec<Vec2> = Vec::new();
    for &seed in seeds.iter().take(MAX_SEEDS) {
        let Some((a, b)) = lattice_vectors(points, seed) else {
            continue;
        };
        let cells = grow(points, seed, a, b, limit);
        if cells.len() < needed {
            if cells.len() > best.len() {
                best = cells.values().map(|&i| points[i]).collect();
            }
            continue;
        }
        let mut windows = complete_windows(&cells, pattern.cols, pattern.rows);
        if pattern.cols != pattern.rows {
            windows.extend(complete_windows(&cells, pattern.rows, pattern.cols));
        }
        match windows.as_slice() {
            [only] => return Ok(extract(points, &cells, *only, pattern)),
            _ => {
                log::trace!("seed {} gives {} complete windows", seed, windows.len());
                if cells.len() > best.len() {
                    best = cells.values().map(|&i| points[i]).collect();
                }
            }
        }
    }
    Err(best)
}

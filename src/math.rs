//! Numeric kernels shared by the learning components
//!
//! Small, allocation-light statistics and linear algebra over f32 slices.
//! Degenerate inputs (empty series, zero variance, zero magnitude) take
//! documented fallback values instead of producing NaN.

/// Clamp a score or probability to the unit interval
pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Arithmetic mean; 0.0 for an empty series
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Mean weighted by a linear ramp from `start_weight` to 1.0
///
/// The last element gets full weight, earlier ones proportionally less.
/// Used for recency-weighted satisfaction baselines.
pub fn recency_weighted_mean(values: &[f32], start_weight: f32) -> f32 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return values[0];
    }
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (i, v) in values.iter().enumerate() {
        let w = start_weight + (1.0 - start_weight) * i as f32 / (n - 1) as f32;
        weighted += w * v;
        total += w;
    }
    weighted / total
}

/// Pearson correlation coefficient
///
/// Returns None when the correlation is undefined: fewer than two points
/// or zero variance in either series.
pub fn pearson(xs: &[f32], ys: &[f32]) -> Option<f32> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&xs[..n]);
    let my = mean(&ys[..n]);

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f32::EPSILON || var_y <= f32::EPSILON {
        return None;
    }

    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Cosine similarity between two vectors; 0.0 on length mismatch or zero magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Column means of a row-major matrix
pub fn column_means(rows: &[Vec<f32>]) -> Vec<f32> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let dim = first.len();
    let mut means = vec![0.0; dim];
    for row in rows {
        for (m, v) in means.iter_mut().zip(row.iter()) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= rows.len() as f32;
    }
    means
}

/// Sample covariance matrix of mean-centered rows
///
/// Expects at least two rows; callers handle the single-row degeneracy
/// before reaching here.
pub fn covariance(centered: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = centered.len();
    let dim = centered.first().map_or(0, |r| r.len());
    let mut cov = vec![vec![0.0f32; dim]; dim];
    if n < 2 {
        return cov;
    }
    for row in centered {
        for i in 0..dim {
            for j in i..dim {
                cov[i][j] += row[i] * row[j];
            }
        }
    }
    let denom = (n - 1) as f32;
    for i in 0..dim {
        for j in i..dim {
            cov[i][j] /= denom;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

const JACOBI_MAX_SWEEPS: usize = 32;
const JACOBI_EPSILON: f32 = 1e-9;

/// Eigendecomposition of a symmetric matrix via cyclic Jacobi rotations
///
/// Returns eigenvalues in descending order with their eigenvectors as
/// rows of the second element. Deterministic up to sign convention.
pub fn jacobi_eigen(matrix: &[Vec<f32>]) -> (Vec<f32>, Vec<Vec<f32>>) {
    let n = matrix.len();
    let mut a: Vec<Vec<f32>> = matrix.to_vec();

    // v starts as identity; columns accumulate the eigenvectors
    let mut v = vec![vec![0.0f32; n]; n];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f32 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off < JACOBI_EPSILON {
            break;
        }

        for p in 0..n.saturating_sub(1) {
            for q in (p + 1)..n {
                if a[p][q].abs() < f32::EPSILON {
                    continue;
                }

                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (theta * theta + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let vp = row[p];
                    let vq = row[q];
                    row[p] = c * vp - s * vq;
                    row[q] = s * vp + c * vq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        a[j][j]
            .partial_cmp(&a[i][i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let eigenvalues: Vec<f32> = order.iter().map(|&i| a[i][i]).collect();
    let eigenvectors: Vec<Vec<f32>> = order
        .iter()
        .map(|&col| (0..n).map(|row| v[row][col]).collect())
        .collect();

    (eigenvalues, eigenvectors)
}

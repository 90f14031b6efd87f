use nalgebra::{DMatrix, Matrix3, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// A 3x3 planar projective transform mapping reference-plane points into
/// query-image points: `p_query ~ H * p_reference`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub m: Matrix3<f64>,
}

impl Homography {
    pub fn new(m: Matrix3<f64>) -> Self {
        Self { m }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_fn(|r, c| rows[r][c]))
    }

    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        [
            [self.m[(0, 0)], self.m[(0, 1)], self.m[(0, 2)]],
            [self.m[(1, 0)], self.m[(1, 1)], self.m[(1, 2)]],
            [self.m[(2, 0)], self.m[(2, 1)], self.m[(2, 2)]],
        ]
    }

    /// Apply the transform to a point (perspective division included).
    #[inline]
    pub fn project(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.m * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new((v[0] / v[2]) as f32, (v[1] / v[2]) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.m.try_inverse().map(Self::new)
    }
}

/// Hartley conditioning: translate points to their centroid and scale the
/// mean distance to sqrt(2). Returns the conditioned points and the applied
/// transform.
fn condition_points(pts: &[Point2<f32>]) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let n = pts.len() as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= n;
    cy /= n;

    let mut mean_dist = 0.0;
    for p in pts {
        mean_dist += ((p.x as f64 - cx).powi(2) + (p.y as f64 - cy).powi(2)).sqrt();
    }
    mean_dist /= n;

    let s = if mean_dist > 1e-12 {
        2.0_f64.sqrt() / mean_dist
    } else {
        1.0
    };
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);

    let conditioned = pts
        .iter()
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (conditioned, t)
}

/// Undo the conditioning transforms and scale so that h33 = 1.
fn decondition(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

/// Three near-collinear (or coincident) corners make the correspondence
/// system rank-deficient; the solver would return a consistent-but-useless
/// transform instead of failing.
fn quad_is_degenerate(pts: &[Point2<f32>; 4]) -> bool {
    const MIN_SINE: f32 = 1e-4;
    for i in 0..4 {
        for j in (i + 1)..4 {
            for k in (j + 1)..4 {
                let ab = pts[j] - pts[i];
                let ac = pts[k] - pts[i];
                let cross = ab.x * ac.y - ab.y * ac.x;
                let scale = ab.norm() * ac.norm();
                if scale < 1e-12 || cross.abs() < MIN_SINE * scale {
                    return true;
                }
            }
        }
    }
    false
}

/// Exact solution from four correspondences, `None` for degenerate
/// (e.g. collinear) configurations.
pub fn homography_from_quad(
    src: &[Point2<f32>; 4],
    dst: &[Point2<f32>; 4],
) -> Option<Homography> {
    if quad_is_degenerate(src) || quad_is_degenerate(dst) {
        return None;
    }
    let (s, t_src) = condition_points(src);
    let (d, t_dst) = condition_points(dst);

    // Fix h33 = 1: eight unknowns, two rows per correspondence.
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for k in 0..4 {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        let r = 2 * k;
        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        a[(r, 6)] = -u * x;
        a[(r, 7)] = -u * y;
        b[r] = u;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        a[(r + 1, 6)] = -v * x;
        a[(r + 1, 7)] = -v * y;
        b[r + 1] = v;
    }

    let h = a.lu().solve(&b)?;
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    decondition(hn, t_src, t_dst).map(Homography::new)
}

/// Least-squares fit from four or more correspondences (normalized DLT).
///
/// Pairing is positional: `src[i]` corresponds to `dst[i]`. Returns `None`
/// for mismatched lengths, fewer than four pairs, or a degenerate system.
pub fn fit_homography(src: &[Point2<f32>], dst: &[Point2<f32>]) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    if src.len() == 4 {
        let s: &[Point2<f32>; 4] = src.try_into().ok()?;
        let d: &[Point2<f32>; 4] = dst.try_into().ok()?;
        return homography_from_quad(s, d);
    }

    let (s, t_src) = condition_points(src);
    let (d, t_dst) = condition_points(dst);

    // Homogeneous system A h = 0, solved via the smallest singular vector.
    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for k in 0..n {
        let (x, y) = (s[k].x, s[k].y);
        let (u, v) = (d[k].x, d[k].y);

        let r = 2 * k;
        a[(r, 0)] = -x;
        a[(r, 1)] = -y;
        a[(r, 2)] = -1.0;
        a[(r, 6)] = u * x;
        a[(r, 7)] = u * y;
        a[(r, 8)] = u;

        a[(r + 1, 3)] = -x;
        a[(r + 1, 4)] = -y;
        a[(r + 1, 5)] = -1.0;
        a[(r + 1, 6)] = v * x;
        a[(r + 1, 7)] = v * y;
        a[(r + 1, 8)] = v;
    }

    let svd = a.svd(false, true);
    // a rank-deficient system (e.g. all points collinear) has more than one
    // vanishing singular value and no unique solution
    let sv = &svd.singular_values;
    if sv[7] < 1e-9 * sv[0].max(1e-12) {
        return None;
    }
    let vt = svd.v_t?;
    let h = vt.row(vt.nrows().checked_sub(1)?);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);
    decondition(hn, t_src, t_dst).map(Homography::new)
}

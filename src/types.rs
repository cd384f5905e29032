pub type Result<T> = anyhow::Result<T>;

pub type MatX3<T> = Vec<[T;3]>;  // Nx3 matrix
pub type Mat33<T> = [[T;3];3];   // 3x3 matrix


pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}


pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}


pub fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}


pub fn volume(c: &Mat33<f64>) -> f64 {
    // |00 01 02|
    // |10 11 12|
    // |20 21 22|
    dot(&c[0], &cross(&c[1], &c[2]))
}


/// Lengths of the reciprocal lattice vectors, without the 2π factor.
pub fn reciprocal_lengths(c: &Mat33<f64>) -> [f64; 3] {
    let v = volume(c);
    [
        norm(&cross(&c[1], &c[2])) / v.abs(),
        norm(&cross(&c[2], &c[0])) / v.abs(),
        norm(&cross(&c[0], &c[1])) / v.abs(),
    ]
}


/// Inverse of a 3x3 matrix, `None` when singular.
pub fn inverse(c: &Mat33<f64>) -> Option<Mat33<f64>> {
    let det = volume(c);
    if det.abs() < 1E-12 {
        return None;
    }

    let mut inv = [[0.0; 3]; 3];
    for i in 0 .. 3 {
        for j in 0 .. 3 {
            let (r1, r2) = ((j + 1) % 3, (j + 2) % 3);
            let (c1, c2) = ((i + 1) % 3, (i + 2) % 3);
            inv[i][j] = (c[r1][c1] * c[r2][c2] - c[r1][c2] * c[r2][c1]) / det;
        }
    }
    Some(inv)
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_volume_and_reciprocal() {
        let cell = [[2.0, 0.0, 0.0],
                    [0.0, 4.0, 0.0],
                    [0.0, 0.0, 5.0]];
        assert_relative_eq!(volume(&cell), 40.0);
        let r = reciprocal_lengths(&cell);
        assert_relative_eq!(r[0], 0.5);
        assert_relative_eq!(r[1], 0.25);
        assert_relative_eq!(r[2], 0.2);
    }

    #[test]
    fn test_inverse() {
        let cell = [[1.0, 1.0, 0.0],
                    [0.0, 2.0, 0.0],
                    [0.0, 0.0, 4.0]];
        let inv = inverse(&cell).unwrap();
        for i in 0 .. 3 {
            for j in 0 .. 3 {
                let x: f64 = (0 .. 3).map(|k| cell[i][k] * inv[k][j]).sum();
                assert_relative_eq!(x, if i == j { 1.0 } else { 0.0 }, epsilon = 1E-12);
            }
        }
        assert!(inverse(&[[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]]).is_none());
    }
}

//! Design-matrix passes shared by the objective functions

use crate::core::FeatureVector;

/// `out[i] = x_i · v` for every row
pub fn xv(x: &[&FeatureVector], v: &[f64], out: &mut [f64]) {
    for (o, xi) in out.iter_mut().zip(x) {
        *o = xi.dot(v);
    }
}

/// `out = Σ_i v[i] · x_i`
pub fn xtv(x: &[&FeatureVector], v: &[f64], out: &mut [f64]) {
    out.fill(0.0);
    for (xi, &vi) in x.iter().zip(v) {
        xi.add_scaled_to(vi, out);
    }
}

/// `out[k] = x_{rows[k]} · v`
pub fn sub_xv(x: &[&FeatureVector], rows: &[usize], v: &[f64], out: &mut [f64]) {
    for (o, &i) in out.iter_mut().zip(rows) {
        *o = x[i].dot(v);
    }
}

/// `out = Σ_k v[k] · x_{rows[k]}`
pub fn sub_xtv(x: &[&FeatureVector], rows: &[usize], v: &[f64], out: &mut [f64]) {
    out.fill(0.0);
    for (&i, &vk) in rows.iter().zip(v) {
        x[i].add_scaled_to(vk, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<FeatureVector> {
        vec![
            FeatureVector::dense(vec![1.0, 2.0]),
            FeatureVector::sparse(vec![1], vec![3.0]),
            FeatureVector::sparse(vec![0], vec![-1.0]),
        ]
    }

    #[test]
    fn test_xv_and_xtv() {
        let data = rows();
        let x: Vec<&FeatureVector> = data.iter().collect();

        let mut out = vec![0.0; 3];
        xv(&x, &[2.0, 1.0], &mut out);
        assert_eq!(out, vec![4.0, 3.0, -2.0]);

        let mut back = vec![9.0; 2];
        xtv(&x, &[1.0, 1.0, 1.0], &mut back);
        assert_eq!(back, vec![0.0, 5.0]);
    }

    #[test]
    fn test_restricted_passes() {
        let data = rows();
        let x: Vec<&FeatureVector> = data.iter().collect();
        let active = [0, 2];

        let mut out = vec![0.0; 2];
        sub_xv(&x, &active, &[2.0, 1.0], &mut out);
        assert_eq!(out, vec![4.0, -2.0]);

        let mut back = vec![0.0; 2];
        sub_xtv(&x, &active, &[1.0, 2.0], &mut back);
        assert_eq!(back, vec![-1.0, 2.0]);
    }
}

use rayon::prelude::*;

use crate::tensor::numeric::Numeric;

/// `a [n, k] @ b [k, m] -> [n, m]`, rows split across the rayon pool.
///
/// Zero entries of `a` are skipped, which makes one-hot inputs cheap.
pub fn matmul<T: Numeric>(a: &[T], b: &[T], n: usize, k: usize, m: usize) -> Vec<T> {
    debug_assert_eq!(a.len(), n * k);
    debug_assert_eq!(b.len(), k * m);
    let mut out = vec![T::zero(); n * m];
    if m == 0 || k == 0 {
        return out;
    }
    out.par_chunks_mut(m)
        .zip(a.par_chunks(k))
        .for_each(|(out_row, a_row)| {
            for (&a_val, b_row) in a_row.iter().zip(b.chunks(m)) {
                if a_val == T::zero() {
                    continue;
                }
                for (acc, &b_val) in out_row.iter_mut().zip(b_row.iter()) {
                    *acc += a_val * b_val;
                }
            }
        });
    out
}

/// `a [n, m] @ b^T` where `b` is `[k, m]`, giving `[n, k]`.
pub fn matmul_transpose_b<T: Numeric>(a: &[T], b: &[T], n: usize, m: usize, k: usize) -> Vec<T> {
    debug_assert_eq!(a.len(), n * m);
    debug_assert_eq!(b.len(), k * m);
    let mut out = vec![T::zero(); n * k];
    if k == 0 || m == 0 {
        return out;
    }
    out.par_chunks_mut(k)
        .zip(a.par_chunks(m))
        .for_each(|(out_row, a_row)| {
            for (acc, b_row) in out_row.iter_mut().zip(b.chunks(m)) {
                *acc = dot(a_row, b_row);
            }
        });
    out
}

/// `a^T @ b` where `a` is `[n, k]` and `b` is `[n, m]`, giving `[k, m]`.
pub fn matmul_transpose_a<T: Numeric>(a: &[T], b: &[T], n: usize, k: usize, m: usize) -> Vec<T> {
    debug_assert_eq!(a.len(), n * k);
    debug_assert_eq!(b.len(), n * m);
    let mut out = vec![T::zero(); k * m];
    if k == 0 || m == 0 {
        return out;
    }
    for (a_row, b_row) in a.chunks(k).zip(b.chunks(m)) {
        for (&a_val, out_row) in a_row.iter().zip(out.chunks_mut(m)) {
            if a_val == T::zero() {
                continue;
            }
            for (acc, &b_val) in out_row.iter_mut().zip(b_row.iter()) {
                *acc += a_val * b_val;
            }
        }
    }
    out
}

pub fn dot<T: Numeric>(left: &[T], right: &[T]) -> T {
    left.iter()
        .zip(right.iter())
        .fold(T::zero(), |acc, (&l, &r)| acc + l * r)
}

/// Index of the largest value, the first one on ties. `None` for an empty row.
pub fn argmax<T: Numeric>(row: &[T]) -> Option<usize> {
    row.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, T)>, (i, &v)| match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

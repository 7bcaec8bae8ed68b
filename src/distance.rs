use std::cmp::Ordering;

use ndarray::parallel::prelude::*;
use ndarray::{Array2, ArrayView1};
use num_traits::Float;

use crate::error::{Error, Result};

/// Strategy used to answer nearest neighbor queries.
///
/// - Exact: brute-force scan over every point
/// - Approximate: scan only the pivot buckets closest to the query point,
///   trading exactness for speed on large inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMethod {
    #[default]
    Exact,
    Approximate { buckets: usize, probes: usize },
}

/// Dense, precomputed pairwise distances over `n` points.
///
///     use nngclust::DistanceIndex;
///
///     let index = DistanceIndex::new(3, 3, vec![0., 1., 4., 1., 0., 2., 4., 2., 0.]).unwrap();
///     assert_eq!(index.neighbors(0, 2, None, None), vec![1, 2]);
///     assert_eq!(index.neighbors(2, 2, None, Some(3.)), vec![1]);
#[derive(Debug, Clone)]
pub struct DistanceIndex<F> {
    distances: Array2<F>,
    buckets: Option<PivotBuckets>,
}

impl<F> DistanceIndex<F>
where
    F: Float + Send + Sync,
{
    /// Build an index from a flattened `rows x cols` buffer stored row by row
    pub fn new(rows: usize, cols: usize, data: Vec<F>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::invalid(
                "distance matrix must have at least one row and one column",
            ));
        }
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(Error::invalid(format!(
                "distance buffer holds {} values, expected {} x {}",
                data.len(),
                rows,
                cols
            )));
        }
        let distances =
            Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::invalid(e.to_string()))?;
        Self::from_array(distances)
    }

    pub fn from_array(distances: Array2<F>) -> Result<Self> {
        let (rows, cols) = distances.dim();
        if rows == 0 || cols == 0 {
            return Err(Error::invalid(
                "distance matrix must have at least one row and one column",
            ));
        }
        if rows != cols {
            return Err(Error::invalid(format!(
                "distance matrix must be square, got {} x {}",
                rows, cols
            )));
        }
        let zero = F::zero();
        if distances.par_iter().any(|d| d.is_nan() || *d < zero) {
            return Err(Error::invalid(
                "distances must be non-negative numbers",
            ));
        }
        Ok(Self {
            distances,
            buckets: None,
        })
    }

    /// Select the neighbor search strategy used by every later query
    pub fn with_search(mut self, method: SearchMethod) -> Result<Self> {
        self.buckets = match method {
            SearchMethod::Exact => None,
            SearchMethod::Approximate { buckets, probes } => {
                if buckets == 0 || probes == 0 {
                    return Err(Error::invalid(
                        "approximate search needs at least one bucket and one probe",
                    ));
                }
                Some(PivotBuckets::build(&self.distances, buckets, probes))
            }
        };
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.distances.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_approximate(&self) -> bool {
        self.buckets.is_some()
    }

    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> F {
        self.distances[[i, j]]
    }

    /// Up to `k` points other than `point`, nearest first with ties broken by
    /// ascending index. Only points flagged in `eligible` and within `radius`
    /// of `point` are considered; points past the end of `eligible` are not.
    pub fn neighbors(
        &self,
        point: usize,
        k: usize,
        eligible: Option<&[bool]>,
        radius: Option<F>,
    ) -> Vec<usize> {
        if k == 0 {
            return vec![];
        }
        let row = self.distances.row(point);
        let admits = |q: usize| {
            q != point
                && eligible.map_or(true, |mask| mask.get(q).copied().unwrap_or(false))
                && radius.map_or(true, |r| row[q] <= r)
        };
        let mut found: Vec<usize> = match &self.buckets {
            None => (0..self.len()).filter(|&q| admits(q)).collect(),
            Some(buckets) => buckets.probe(&self.distances, point, k, admits),
        };
        let cmp = by_distance(row);
        if found.len() > k {
            found.select_nth_unstable_by(k - 1, &cmp);
            found.truncate(k);
        }
        found.sort_unstable_by(&cmp);
        found
    }
}

fn by_distance<'a, F: Float>(row: ArrayView1<'a, F>) -> impl Fn(&usize, &usize) -> Ordering + 'a {
    move |&a, &b| {
        row[a]
            .partial_cmp(&row[b])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    }
}

/// Points grouped around pivots chosen by farthest-first traversal
#[derive(Debug, Clone)]
struct PivotBuckets {
    pivots: Vec<usize>,
    members: Vec<Vec<usize>>,
    probes: usize,
}

impl PivotBuckets {
    fn build<F>(distances: &Array2<F>, buckets: usize, probes: usize) -> Self
    where
        F: Float + Send + Sync,
    {
        let n = distances.nrows();
        let mut pivots = vec![0];
        let mut nearest: Vec<F> = distances.row(0).to_vec();
        while pivots.len() < buckets.min(n) {
            let (next, farthest) = nearest
                .iter()
                .enumerate()
                .fold((0, F::neg_infinity()), |best, (q, &d)| {
                    if d > best.1 {
                        (q, d)
                    } else {
                        best
                    }
                });
            // Everything left coincides with an existing pivot
            if farthest <= F::zero() {
                break;
            }
            pivots.push(next);
            let row = distances.row(next);
            nearest
                .iter_mut()
                .zip(row.iter())
                .for_each(|(best, &d)| *best = best.min(d));
        }

        let owners: Vec<usize> = (0..n)
            .into_par_iter()
            .map(|q| {
                let mut owner = 0;
                for (b, &p) in pivots.iter().enumerate() {
                    if distances[[p, q]] < distances[[pivots[owner], q]] {
                        owner = b;
                    }
                }
                owner
            })
            .collect();
        let mut members = vec![vec![]; pivots.len()];
        owners
            .into_iter()
            .enumerate()
            .for_each(|(q, b)| members[b].push(q));
        Self {
            pivots,
            members,
            probes,
        }
    }

    fn probe<F, A>(&self, distances: &Array2<F>, point: usize, k: usize, admits: A) -> Vec<usize>
    where
        F: Float,
        A: Fn(usize) -> bool,
    {
        let row = distances.row(point);
        let mut order: Vec<usize> = (0..self.pivots.len()).collect();
        order.sort_by(|&a, &b| {
            row[self.pivots[a]]
                .partial_cmp(&row[self.pivots[b]])
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        });
        let mut found = Vec::new();
        for (scanned, &bucket) in order.iter().enumerate() {
            if scanned >= self.probes && found.len() >= k {
                break;
            }
            found.extend(self.members[bucket].iter().copied().filter(|&q| admits(q)));
        }
        found
    }
}

use num_traits::Float;
use rayon::prelude::*;

use crate::distance::DistanceIndex;
use crate::error::{Error, Result};
use crate::types::TypeConstraints;

/// Label used for unassigned points in `ClusteringResult::host_labels`
pub const UNASSIGNED: i32 = -1;

/// Outcome of one clustering call: the cluster of every point (or `None`),
/// the number of clusters and the seed that opened each cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteringResult {
    labels: Vec<Option<usize>>,
    num_clusters: usize,
    seeds: Vec<usize>,
}

impl ClusteringResult {
    pub(crate) fn new(labels: Vec<Option<usize>>, seeds: Vec<usize>) -> Self {
        Self {
            labels,
            num_clusters: seeds.len(),
            seeds,
        }
    }

    /// Wrap labels produced elsewhere, with negative values marking
    /// unassigned points, so they can be checked and summarized.
    pub fn from_labels(labels: &[i32], num_clusters: usize) -> Result<Self> {
        let labels = labels
            .iter()
            .map(|&l| match usize::try_from(l) {
                Ok(c) if c < num_clusters => Ok(Some(c)),
                Ok(c) => Err(Error::invalid(format!(
                    "cluster label {} out of range for {} clusters",
                    c, num_clusters
                ))),
                Err(_) => Ok(None),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            labels,
            num_clusters,
            seeds: vec![],
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Option<usize>] {
        &self.labels
    }

    pub fn label(&self, point: usize) -> Option<usize> {
        self.labels[point]
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// Seed point of each cluster, by cluster id. Empty for results built
    /// with `from_labels`.
    pub fn seeds(&self) -> &[usize] {
        &self.seeds
    }

    /// Labels as 0-based integers with `UNASSIGNED` for points without a
    /// cluster. Fails when the cluster ids do not fit in an `i32`.
    pub fn host_labels(&self) -> Result<Vec<i32>> {
        if i32::try_from(self.num_clusters).is_err() {
            return Err(Error::invalid(format!(
                "too many clusters for i32 labels: {}",
                self.num_clusters
            )));
        }
        self.labels
            .iter()
            .map(|l| match l {
                Some(c) => i32::try_from(*c)
                    .map_err(|_| Error::invalid(format!("cluster id {} exceeds i32", c))),
                None => Ok(UNASSIGNED),
            })
            .collect()
    }

    pub fn num_assigned(&self) -> usize {
        self.labels.iter().filter(|l| l.is_some()).count()
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_clusters];
        self.labels.iter().flatten().for_each(|&c| sizes[c] += 1);
        sizes
    }

    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == Some(cluster))
            .map(|(p, _)| p)
            .collect()
    }

    fn all_members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![vec![]; self.num_clusters];
        self.labels
            .iter()
            .enumerate()
            .for_each(|(p, l)| {
                if let Some(c) = l {
                    members[*c].push(p);
                }
            });
        members
    }

    /// True when every cluster has at least `size_constraint` members and,
    /// with `types`, at least the required number of each type.
    pub fn is_valid(&self, size_constraint: usize, types: Option<&TypeConstraints>) -> bool {
        if let Some(types) = types {
            if types.len() != self.labels.len() {
                return false;
            }
        }
        self.all_members().iter().all(|members| {
            !members.is_empty()
                && members.len() >= size_constraint
                && types.map_or(true, |t| t.is_satisfied_by(members))
        })
    }

    /// Members of `type_label` that `cluster` still lacks
    pub fn remaining_quota(
        &self,
        cluster: usize,
        type_label: usize,
        types: &TypeConstraints,
    ) -> usize {
        let have = self
            .members(cluster)
            .into_iter()
            .filter(|&p| types.label(p) == type_label)
            .count();
        types.quota(type_label).saturating_sub(have)
    }

    /// Size and within-cluster distance summary
    pub fn stats<F>(&self, index: &DistanceIndex<F>) -> Result<ClusteringStats<F>>
    where
        F: Float + Send + Sync,
    {
        if index.len() != self.labels.len() {
            return Err(Error::invalid(format!(
                "clustering has {} points but distance matrix has {}",
                self.labels.len(),
                index.len()
            )));
        }
        let members = self.all_members();
        let populated: Vec<&Vec<usize>> = members.iter().filter(|m| !m.is_empty()).collect();

        // (pairs, sum, min, max) per cluster with at least one pair
        let pair_stats: Vec<(usize, usize, F, F, F)> = populated
            .par_iter()
            .filter(|m| m.len() > 1)
            .map(|m| {
                let mut sum = F::zero();
                let mut min = F::infinity();
                let mut max = F::zero();
                let mut pairs = 0;
                for (i, &a) in m.iter().enumerate() {
                    for &b in m[i + 1..].iter() {
                        let d = index.distance(a, b);
                        sum = sum + d;
                        min = min.min(d);
                        max = max.max(d);
                        pairs += 1;
                    }
                }
                (m.len(), pairs, sum, min, max)
            })
            .collect();

        let num_assigned = self.num_assigned();
        let mut stats = ClusteringStats {
            num_data_points: self.labels.len(),
            num_assigned,
            num_clusters: self.num_clusters,
            num_populated_clusters: populated.len(),
            min_cluster_size: populated.iter().map(|m| m.len()).min().unwrap_or(0),
            max_cluster_size: populated.iter().map(|m| m.len()).max().unwrap_or(0),
            avg_cluster_size: if populated.is_empty() {
                0.
            } else {
                num_assigned as f64 / populated.len() as f64
            },
            sum_dists: F::zero(),
            min_dist: F::zero(),
            max_dist: F::zero(),
            avg_min_dist: F::zero(),
            avg_max_dist: F::zero(),
            avg_dist_weighted: F::zero(),
            avg_dist_unweighted: F::zero(),
        };
        if pair_stats.is_empty() {
            return Ok(stats);
        }

        let clusters = to_float::<F>(pair_stats.len());
        let weight_total = to_float::<F>(pair_stats.iter().map(|s| s.0).sum());
        stats.min_dist = F::infinity();
        for &(size, pairs, sum, min, max) in pair_stats.iter() {
            let mean = sum / to_float(pairs);
            stats.sum_dists = stats.sum_dists + sum;
            stats.min_dist = stats.min_dist.min(min);
            stats.max_dist = stats.max_dist.max(max);
            stats.avg_min_dist = stats.avg_min_dist + min / clusters;
            stats.avg_max_dist = stats.avg_max_dist + max / clusters;
            stats.avg_dist_weighted = stats.avg_dist_weighted + mean * to_float(size) / weight_total;
            stats.avg_dist_unweighted = stats.avg_dist_unweighted + mean / clusters;
        }
        Ok(stats)
    }
}

fn to_float<F: Float>(v: usize) -> F {
    F::from(v).unwrap_or_else(F::max_value)
}

/// Summary of a clustering. Distance figures cover pairs of points within
/// the same cluster; clusters with a single member contribute no pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringStats<F> {
    pub num_data_points: usize,
    pub num_assigned: usize,
    pub num_clusters: usize,
    pub num_populated_clusters: usize,
    pub min_cluster_size: usize,
    pub max_cluster_size: usize,
    pub avg_cluster_size: f64,
    pub sum_dists: F,
    pub min_dist: F,
    pub max_dist: F,
    pub avg_min_dist: F,
    pub avg_max_dist: F,
    /// Mean within-cluster distance, clusters weighted by size
    pub avg_dist_weighted: F,
    pub avg_dist_unweighted: F,
}

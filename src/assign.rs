use std::fmt;
use std::str::FromStr;

use num_traits::Float;
use rayon::prelude::*;

use crate::algorithm::Partition;
use crate::distance::DistanceIndex;
use crate::error::{Error, Result};

/// How points left over after seeding are handled.
///
/// - Ignore: leave unassigned
/// - AnyNeighbor: join the cluster of the nearest assigned point in the point's own neighbor set
/// - ClosestAssigned: join the cluster of the nearest assigned point
/// - ClosestSeed: join the cluster of the nearest seed
/// - EstimatedRadiusClosestSeed: as ClosestSeed, bounded by an estimated radius
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnassignedMethod {
    Ignore,
    AnyNeighbor,
    ClosestAssigned,
    ClosestSeed,
    EstimatedRadiusClosestSeed,
}

impl UnassignedMethod {
    pub fn uses_estimated_radius(&self) -> bool {
        matches!(self, UnassignedMethod::EstimatedRadiusClosestSeed)
    }

    fn targets_seeds(&self) -> bool {
        matches!(
            self,
            UnassignedMethod::ClosestSeed | UnassignedMethod::EstimatedRadiusClosestSeed
        )
    }
}

impl FromStr for UnassignedMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ignore" => Ok(UnassignedMethod::Ignore),
            "by_nng" => Ok(UnassignedMethod::AnyNeighbor),
            "closest_assigned" => Ok(UnassignedMethod::ClosestAssigned),
            "closest_seed" => Ok(UnassignedMethod::ClosestSeed),
            "estimated_radius_closest_seed" => Ok(UnassignedMethod::EstimatedRadiusClosestSeed),
            _ => Err(Error::invalid(format!("not a valid unassigned method: {}", s))),
        }
    }
}

impl fmt::Display for UnassignedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnassignedMethod::Ignore => "ignore",
            UnassignedMethod::AnyNeighbor => "by_nng",
            UnassignedMethod::ClosestAssigned => "closest_assigned",
            UnassignedMethod::ClosestSeed => "closest_seed",
            UnassignedMethod::EstimatedRadiusClosestSeed => "estimated_radius_closest_seed",
        };
        write!(f, "{}", name)
    }
}

/// Largest distance at which a point may join a cluster.
///
/// - Unbounded: no limit
/// - Supplied: a fixed caller-supplied radius
/// - SeedRadius: the radius of the target cluster's seed clique
/// - Estimated: the radius of the joining point's own nearest neighbor set
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RadiusPolicy<F> {
    Unbounded,
    Supplied(F),
    SeedRadius,
    Estimated,
}

impl<F> RadiusPolicy<F>
where
    F: Float,
{
    pub(crate) fn check(&self) -> Result<()> {
        match self {
            RadiusPolicy::Supplied(r) if r.is_nan() || *r < F::zero() => {
                Err(Error::invalid("radius must be a non-negative number"))
            }
            _ => Ok(()),
        }
    }
}

/// Assigns points that seeding left unassigned. Each pass decides every
/// point against the clusters as they stood when the pass began, so the
/// outcome does not depend on the order points are visited.
pub(crate) struct AssignmentEngine<'a, F> {
    pub(crate) index: &'a DistanceIndex<F>,
    pub(crate) clique_size: usize,
}

impl<'a, F> AssignmentEngine<'a, F>
where
    F: Float + Send + Sync,
{
    /// Returns the number of points assigned
    pub(crate) fn assign_pass(
        &self,
        partition: &mut Partition<F>,
        points: &[usize],
        method: UnassignedMethod,
        policy: RadiusPolicy<F>,
    ) -> usize {
        if method == UnassignedMethod::Ignore || points.is_empty() {
            return 0;
        }
        let targets = if method.targets_seeds() {
            partition.seed_mask()
        } else {
            partition.assigned_mask()
        };
        let decisions: Vec<Option<usize>> = {
            let partition = &*partition;
            points
                .par_iter()
                .map(|&p| self.choose(p, method, policy, &targets, partition))
                .collect()
        };
        let mut assigned = 0;
        points
            .iter()
            .zip(decisions)
            .for_each(|(&p, cluster)| {
                if let Some(cluster) = cluster {
                    partition.assign(p, cluster);
                    assigned += 1;
                }
            });
        assigned
    }

    /// The radius of `p`'s own nearest neighbor set
    pub(crate) fn estimated_radius(&self, p: usize) -> F {
        self.index
            .neighbors(p, self.clique_size.saturating_sub(1), None, None)
            .last()
            .map_or(F::zero(), |&q| self.index.distance(p, q))
    }

    fn choose(
        &self,
        p: usize,
        method: UnassignedMethod,
        policy: RadiusPolicy<F>,
        targets: &[bool],
        partition: &Partition<F>,
    ) -> Option<usize> {
        let bound = match policy {
            RadiusPolicy::Supplied(r) => Some(r),
            RadiusPolicy::Estimated => Some(self.estimated_radius(p)),
            RadiusPolicy::Unbounded | RadiusPolicy::SeedRadius => None,
        };
        let ranked: Vec<usize> = match method {
            UnassignedMethod::AnyNeighbor => self
                .index
                .neighbors(p, self.clique_size.saturating_sub(1), None, bound)
                .into_iter()
                .filter(|&q| targets[q])
                .collect(),
            _ => self
                .index
                .neighbors(p, self.index.len(), Some(targets), bound),
        };

        // Nearest admissible target, lowest cluster id among equally near ones
        let mut best: Option<(F, usize)> = None;
        for q in ranked {
            let d = self.index.distance(p, q);
            let cluster = match partition.label(q) {
                Some(cluster) => cluster,
                None => continue,
            };
            if matches!(policy, RadiusPolicy::SeedRadius) && d > partition.seed_radius(cluster) {
                continue;
            }
            match best {
                Some((best_d, _)) if d > best_d => break,
                Some((_, best_cluster)) if cluster >= best_cluster => {}
                _ => best = Some((d, cluster)),
            }
        }
        best.map(|(_, cluster)| cluster)
    }
}

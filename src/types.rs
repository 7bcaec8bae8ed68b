use num_traits::Float;

use crate::distance::DistanceIndex;
use crate::error::{Error, Result};

/// Per-type minimum counts that every cluster must satisfy in addition to the
/// total size constraint.
///
/// Type labels are small non-negative integers indexing into the quota list,
/// so `quotas[t]` is the minimum number of points labelled `t` in each cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConstraints {
    labels: Vec<usize>,
    quotas: Vec<usize>,
    total: usize,
}

impl TypeConstraints {
    pub fn new(labels: &[i32], quotas: &[i32], total: usize) -> Result<Self> {
        let quotas = quotas
            .iter()
            .map(|&q| {
                usize::try_from(q).map_err(|_| Error::invalid("negative type size constraint"))
            })
            .collect::<Result<Vec<usize>>>()?;
        let labels = labels
            .iter()
            .map(|&l| match usize::try_from(l) {
                Ok(l) if l < quotas.len() => Ok(l),
                _ => Err(Error::invalid(format!(
                    "type label {} has no size constraint ({} types declared)",
                    l,
                    quotas.len()
                ))),
            })
            .collect::<Result<Vec<usize>>>()?;
        Ok(Self {
            labels,
            quotas,
            total,
        })
    }

    /// Number of labelled points
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_types(&self) -> usize {
        self.quotas.len()
    }

    pub fn label(&self, point: usize) -> usize {
        self.labels[point]
    }

    pub fn quota(&self, type_label: usize) -> usize {
        self.quotas.get(type_label).copied().unwrap_or(0)
    }

    pub fn total_size_constraint(&self) -> usize {
        self.total
    }

    /// Members a seed clique needs to meet the total and every type quota
    pub fn clique_size(&self) -> usize {
        self.total.max(self.quotas.iter().sum())
    }

    /// Fails when the data holds fewer points of some type than its quota,
    /// in which case no cluster at all can be formed.
    pub fn check_feasible(&self) -> Result<()> {
        let counts = self.count_types(0..self.labels.len());
        for (t, (&have, &need)) in counts.iter().zip(self.quotas.iter()).enumerate() {
            if have < need {
                return Err(Error::infeasible(format!(
                    "type {} has {} points but each cluster needs {}",
                    t, have, need
                )));
            }
        }
        Ok(())
    }

    /// Number of points of each type among `members`
    pub fn count_types<I>(&self, members: I) -> Vec<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut counts = vec![0; self.quotas.len()];
        members
            .into_iter()
            .for_each(|p| counts[self.labels[p]] += 1);
        counts
    }

    pub fn is_satisfied_by(&self, members: &[usize]) -> bool {
        members.len() >= self.total
            && self
                .count_types(members.iter().copied())
                .iter()
                .zip(self.quotas.iter())
                .all(|(have, need)| have >= need)
    }

    /// The smallest set of points around `point` meeting every quota and the
    /// total: `point` itself, then the nearest points of each type still
    /// missing, then the nearest remaining points of any type. Members are
    /// returned in order of distance from `point`.
    pub fn select_clique<F>(
        &self,
        index: &DistanceIndex<F>,
        point: usize,
        radius: Option<F>,
    ) -> Option<Vec<usize>>
    where
        F: Float + Send + Sync,
    {
        let size = self.clique_size();
        let mut needed = self.quotas.clone();
        let own = self.labels[point];
        needed[own] = needed[own].saturating_sub(1);
        let mut missing: usize = needed.iter().sum();

        let ranked = index.neighbors(point, index.len(), None, radius);
        let mut taken = vec![false; ranked.len()];
        let mut count = 1;
        for (i, &q) in ranked.iter().enumerate() {
            if missing == 0 {
                break;
            }
            let t = self.labels[q];
            if needed[t] > 0 {
                needed[t] -= 1;
                missing -= 1;
                taken[i] = true;
                count += 1;
            }
        }
        if missing > 0 {
            return None;
        }
        for slot in taken.iter_mut() {
            if count >= size {
                break;
            }
            if !*slot {
                *slot = true;
                count += 1;
            }
        }
        if count < size {
            return None;
        }

        let mut clique = Vec::with_capacity(size);
        clique.push(point);
        clique.extend(
            ranked
                .iter()
                .zip(taken.iter())
                .filter(|(_, t)| **t)
                .map(|(&q, _)| q),
        );
        Some(clique)
    }
}

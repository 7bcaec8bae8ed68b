use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use num_traits::Float;
use rayon::prelude::*;
use tracing::debug;

use crate::algorithm::Partition;
use crate::distance::DistanceIndex;
use crate::error::{Error, Result};
use crate::nng::{check_clique_size, nearest_clique, NeighborGraph};
use crate::types::TypeConstraints;

/// Order in which seed candidates are examined.
///
/// - Lexical: ascending point index
/// - InwardsOrder: fewest incoming arcs first, computed once
/// - InwardsUpdating: fewest incoming arcs from unassigned candidates, updated after every seed
/// - InwardsAltUpdating: fewest incoming arcs from candidates that can still become seeds, updated after every seed
/// - ExclusionOrder: fewest conflicting candidates first, computed once
/// - ExclusionUpdating: fewest conflicting candidates still available, updated after every seed
/// - Batches: ascending index, with cliques computed one batch of points at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMethod {
    Lexical,
    InwardsOrder,
    InwardsUpdating,
    InwardsAltUpdating,
    ExclusionOrder,
    ExclusionUpdating,
    Batches { batch_size: usize },
}

impl FromStr for SeedMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lexical" => Ok(SeedMethod::Lexical),
            "inwards_order" => Ok(SeedMethod::InwardsOrder),
            "inwards_updating" => Ok(SeedMethod::InwardsUpdating),
            "inwards_alt_updating" => Ok(SeedMethod::InwardsAltUpdating),
            "exclusion_order" => Ok(SeedMethod::ExclusionOrder),
            "exclusion_updating" => Ok(SeedMethod::ExclusionUpdating),
            _ => Err(Error::invalid(format!("not a valid seed method: {}", s))),
        }
    }
}

impl fmt::Display for SeedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedMethod::Lexical => write!(f, "lexical"),
            SeedMethod::InwardsOrder => write!(f, "inwards_order"),
            SeedMethod::InwardsUpdating => write!(f, "inwards_updating"),
            SeedMethod::InwardsAltUpdating => write!(f, "inwards_alt_updating"),
            SeedMethod::ExclusionOrder => write!(f, "exclusion_order"),
            SeedMethod::ExclusionUpdating => write!(f, "exclusion_updating"),
            SeedMethod::Batches { batch_size } => write!(f, "batches({})", batch_size),
        }
    }
}

/// Picks mutually disjoint seed cliques. A candidate can become a seed only
/// while it and every member of its clique are unassigned.
pub(crate) struct SeedSelector<'a, F> {
    pub(crate) index: &'a DistanceIndex<F>,
    pub(crate) size_constraint: usize,
    pub(crate) types: Option<&'a TypeConstraints>,
    pub(crate) primary: Option<&'a [bool]>,
    pub(crate) radius: Option<F>,
}

impl<'a, F> SeedSelector<'a, F>
where
    F: Float + Send + Sync,
{
    pub(crate) fn select(&self, method: SeedMethod, partition: &mut Partition<F>) -> Result<()> {
        if let SeedMethod::Batches { batch_size } = method {
            return self.batches(batch_size, partition);
        }
        let graph = NeighborGraph::build(
            self.index,
            self.size_constraint,
            self.types,
            self.primary,
            self.radius,
        )?;
        debug!(
            candidates = graph.candidates().count(),
            clique_size = graph.clique_size(),
            "built nearest neighbor graph"
        );
        match method {
            SeedMethod::Lexical | SeedMethod::Batches { .. } => {
                self.scan(&graph, graph.candidates(), partition)
            }
            SeedMethod::InwardsOrder => {
                let mut order: Vec<usize> = graph.candidates().collect();
                order.sort_by_key(|&p| (graph.in_degree(p), p));
                self.scan(&graph, order.into_iter(), partition);
            }
            SeedMethod::InwardsUpdating => self.inwards_updating(&graph, false, partition),
            SeedMethod::InwardsAltUpdating => self.inwards_updating(&graph, true, partition),
            SeedMethod::ExclusionOrder => {
                let conflicts = conflicts(&graph);
                let mut order: Vec<usize> = graph.candidates().collect();
                order.sort_by_key(|&p| (conflicts[p].len(), p));
                self.scan(&graph, order.into_iter(), partition);
            }
            SeedMethod::ExclusionUpdating => self.exclusion_updating(&graph, partition),
        }
        Ok(())
    }

    fn claim_if_free(&self, graph: &NeighborGraph, p: usize, partition: &mut Partition<F>) -> bool {
        match graph.neighbors(p) {
            Some(clique) if partition.is_free(clique) => {
                partition.claim_seed(clique, self.index);
                true
            }
            _ => false,
        }
    }

    fn scan<I>(&self, graph: &NeighborGraph, order: I, partition: &mut Partition<F>)
    where
        I: Iterator<Item = usize>,
    {
        for p in order {
            self.claim_if_free(graph, p, partition);
        }
    }

    fn inwards_updating(&self, graph: &NeighborGraph, alt: bool, partition: &mut Partition<F>) {
        let n = graph.len();
        let mut degree: Vec<usize> = (0..n).map(|q| graph.in_degree(q)).collect();
        // Candidates whose arcs still contribute to `degree`
        let mut counted: Vec<bool> = (0..n).map(|p| graph.is_candidate(p)).collect();
        let mut queue: BTreeSet<(usize, usize)> =
            graph.candidates().map(|p| (degree[p], p)).collect();

        while let Some((_, p)) = queue.pop_first() {
            if !self.claim_if_free(graph, p, partition) {
                continue;
            }
            let clique = graph.neighbors(p).unwrap_or(&[]);
            let mut dropped: Vec<usize> = clique.iter().copied().filter(|&q| counted[q]).collect();
            if alt {
                clique.iter().for_each(|&x| {
                    dropped.extend(graph.in_arcs(x).iter().copied().filter(|&c| counted[c]))
                });
                dropped.sort_unstable();
                dropped.dedup();
            }
            for s in dropped {
                counted[s] = false;
                queue.remove(&(degree[s], s));
                let targets = graph.neighbors(s).unwrap_or(&[]);
                for &t in targets.iter().skip(1) {
                    if queue.remove(&(degree[t], t)) {
                        degree[t] -= 1;
                        queue.insert((degree[t], t));
                    } else {
                        degree[t] -= 1;
                    }
                }
            }
        }
    }

    fn exclusion_updating(&self, graph: &NeighborGraph, partition: &mut Partition<F>) {
        let conflicts = conflicts(graph);
        let mut degree: Vec<usize> = conflicts.iter().map(Vec::len).collect();
        let mut alive: Vec<bool> = (0..graph.len()).map(|p| graph.is_candidate(p)).collect();
        let mut queue: BTreeSet<(usize, usize)> =
            graph.candidates().map(|p| (degree[p], p)).collect();

        while let Some((_, p)) = queue.pop_first() {
            alive[p] = false;
            let mut dead = vec![p];
            if self.claim_if_free(graph, p, partition) {
                for &c in conflicts[p].iter() {
                    if alive[c] {
                        alive[c] = false;
                        queue.remove(&(degree[c], c));
                        dead.push(c);
                    }
                }
            }
            for d in dead {
                for &c in conflicts[d].iter() {
                    if alive[c] {
                        queue.remove(&(degree[c], c));
                        degree[c] -= 1;
                        queue.insert((degree[c], c));
                    }
                }
            }
        }
    }

    fn batches(&self, batch_size: usize, partition: &mut Partition<F>) -> Result<()> {
        if batch_size == 0 {
            return Err(Error::invalid("batch size must be positive"));
        }
        let n = self.index.len();
        let clique_size = check_clique_size(n, self.size_constraint, self.types)?;
        for start in (0..n).step_by(batch_size) {
            let end = (start + batch_size).min(n);
            let pending: Vec<usize> = (start..end)
                .filter(|&p| self.primary.map_or(true, |mask| mask[p]) && !partition.is_assigned(p))
                .collect();
            let cliques: Vec<Option<Vec<usize>>> = pending
                .par_iter()
                .map(|&p| nearest_clique(self.index, p, clique_size, self.types, self.radius))
                .collect();
            for clique in cliques.into_iter().flatten() {
                if partition.is_free(&clique) {
                    partition.claim_seed(&clique, self.index);
                }
            }
        }
        Ok(())
    }
}

/// For every candidate, the other candidates whose cliques intersect its
/// own. Taking one as a seed rules out all of its conflicts.
fn conflicts(graph: &NeighborGraph) -> Vec<Vec<usize>> {
    (0..graph.len())
        .into_par_iter()
        .map(|p| {
            let clique = match graph.neighbors(p) {
                Some(clique) => clique,
                None => return vec![],
            };
            let mut found: Vec<usize> = clique
                .iter()
                .flat_map(|&x| {
                    let own = if graph.is_candidate(x) { Some(x) } else { None };
                    graph.in_arcs(x).iter().copied().chain(own)
                })
                .filter(|&c| c != p)
                .collect();
            found.sort_unstable();
            found.dedup();
            found
        })
        .collect()
}

#[cfg(test)]
mod test {
    use crate::algorithm::Partition;
    use crate::seed::{conflicts, SeedMethod, SeedSelector};
    use crate::{DistanceIndex, NeighborGraph};

    fn line(x: &[f64]) -> DistanceIndex<f64> {
        let data = x
            .iter()
            .flat_map(|a| x.iter().map(move |b| (a - b).abs()))
            .collect();
        DistanceIndex::new(x.len(), x.len(), data).unwrap()
    }

    fn seeds(index: &DistanceIndex<f64>, size: usize, method: SeedMethod) -> Vec<Option<usize>> {
        let selector = SeedSelector {
            index,
            size_constraint: size,
            types: None,
            primary: None,
            radius: None,
        };
        let mut partition = Partition::new(index.len());
        selector.select(method, &mut partition).unwrap();
        (0..index.len()).map(|p| partition.label(p)).collect()
    }

    #[test]
    fn parse_methods() {
        assert_eq!(
            "inwards_alt_updating".parse::<SeedMethod>().unwrap(),
            SeedMethod::InwardsAltUpdating
        );
        assert_eq!(
            "exclusion_updating".parse::<SeedMethod>().unwrap().to_string(),
            "exclusion_updating"
        );
        assert!("batches".parse::<SeedMethod>().is_err());
        assert!("Lexical".parse::<SeedMethod>().is_err());
    }

    #[test]
    fn lexical_takes_lowest_index_first() {
        // Seed 0 takes {0, 1}, which leaves 2 without a free clique
        let index = line(&[0., 1.5, 2., 5., 5.5, 20.]);
        let labels = seeds(&index, 2, SeedMethod::Lexical);
        assert_eq!(
            labels,
            vec![Some(0), Some(0), None, Some(1), Some(1), None]
        );
    }

    #[test]
    fn inwards_order_prefers_peripheral_points() {
        let index = line(&[0., 1.5, 2., 5., 5.5, 20.]);
        let labels = seeds(&index, 2, SeedMethod::InwardsOrder);
        // 0 and 5 have no incoming arcs; 0 is examined first and takes {0, 1}
        assert_eq!(labels[0], Some(0));
        assert_eq!(labels[1], Some(0));
        assert_eq!(labels[5], Some(1));
        assert_eq!(labels[4], Some(1));
    }

    #[test]
    fn updating_methods_keep_cliques_disjoint() {
        let index = line(&[0., 1., 2., 3., 4., 5., 6., 7., 8., 9.]);
        for method in [
            SeedMethod::InwardsUpdating,
            SeedMethod::InwardsAltUpdating,
            SeedMethod::ExclusionOrder,
            SeedMethod::ExclusionUpdating,
        ] {
            let labels = seeds(&index, 3, method);
            let clusters = labels.iter().flatten().max().map_or(0, |c| c + 1);
            assert!(clusters >= 2, "{} found {} seeds", method, clusters);
            for c in 0..clusters {
                assert_eq!(labels.iter().filter(|l| **l == Some(c)).count(), 3);
            }
        }
    }

    #[test]
    fn exclusion_updating_finds_maximal_packing() {
        // Three tight pairs; every pair is taken
        let index = line(&[0., 0.1, 10., 10.1, 20., 20.1]);
        let labels = seeds(&index, 2, SeedMethod::ExclusionUpdating);
        assert!(labels.iter().all(Option::is_some));
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[4], labels[5]);
    }

    #[test]
    fn batches_match_lexical() {
        let index = line(&[0., 1.5, 2., 5., 5.5, 20., 21., 21.2, 30.]);
        let lexical = seeds(&index, 2, SeedMethod::Lexical);
        for batch_size in 1..=10 {
            assert_eq!(
                seeds(&index, 2, SeedMethod::Batches { batch_size }),
                lexical
            );
        }
    }

    #[test]
    fn conflicting_cliques() {
        let index = line(&[0., 1., 2., 10.]);
        let graph = NeighborGraph::build(&index, 2, None, None, None).unwrap();
        let conflicts = conflicts(&graph);
        // Cliques: {0,1} {1,0} {2,1} {3,2}
        assert_eq!(conflicts[0], vec![1, 2]);
        assert_eq!(conflicts[3], vec![2]);
    }
}

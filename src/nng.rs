use num_traits::Float;
use rayon::prelude::*;

use crate::distance::DistanceIndex;
use crate::error::{Error, Result};
use crate::types::TypeConstraints;

/// Directed nearest neighbor graph. Each seed candidate `p` has an arc to
/// every member of its clique: `p` itself followed by its nearest neighbors.
/// Points without a complete clique inside the seed radius, and points that
/// are not primary, have no arcs and can never become seeds.
#[derive(Debug, Clone)]
pub struct NeighborGraph {
    arcs: Vec<Option<Vec<usize>>>,
    in_arcs: Vec<Vec<usize>>,
    clique_size: usize,
}

impl NeighborGraph {
    pub fn build<F>(
        index: &DistanceIndex<F>,
        size_constraint: usize,
        types: Option<&TypeConstraints>,
        primary: Option<&[bool]>,
        radius: Option<F>,
    ) -> Result<Self>
    where
        F: Float + Send + Sync,
    {
        let clique_size = check_clique_size(index.len(), size_constraint, types)?;
        if let Some(mask) = primary {
            if mask.len() < index.len() {
                return Err(Error::invalid(format!(
                    "primary data point mask has {} entries for {} points",
                    mask.len(),
                    index.len()
                )));
            }
        }
        if let Some(types) = types {
            if types.len() != index.len() {
                return Err(Error::invalid(format!(
                    "{} type labels for {} points",
                    types.len(),
                    index.len()
                )));
            }
        }
        let arcs: Vec<Option<Vec<usize>>> = (0..index.len())
            .into_par_iter()
            .map(|p| {
                if primary.map_or(true, |mask| mask[p]) {
                    nearest_clique(index, p, clique_size, types, radius)
                } else {
                    None
                }
            })
            .collect();

        let mut in_arcs = vec![vec![]; index.len()];
        arcs.iter().enumerate().for_each(|(p, clique)| {
            if let Some(clique) = clique {
                clique
                    .iter()
                    .skip(1)
                    .for_each(|&q| in_arcs[q].push(p));
            }
        });
        Ok(Self {
            arcs,
            in_arcs,
            clique_size,
        })
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn clique_size(&self) -> usize {
        self.clique_size
    }

    /// The clique of `p`, starting with `p`, if `p` is a seed candidate
    pub fn neighbors(&self, p: usize) -> Option<&[usize]> {
        self.arcs[p].as_deref()
    }

    pub fn is_candidate(&self, p: usize) -> bool {
        self.arcs[p].is_some()
    }

    pub fn candidates(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&p| self.is_candidate(p))
    }

    pub fn contains_arc(&self, p: usize, q: usize) -> bool {
        p != q && self.arcs[p].as_ref().map_or(false, |c| c.contains(&q))
    }

    pub fn is_mutual_neighbor(&self, p: usize, q: usize) -> bool {
        self.contains_arc(p, q) && self.contains_arc(q, p)
    }

    /// Candidates other than `q` with an arc into `q`, ascending
    pub fn in_arcs(&self, q: usize) -> &[usize] {
        &self.in_arcs[q]
    }

    pub fn in_degree(&self, q: usize) -> usize {
        self.in_arcs[q].len()
    }
}

/// Number of points in a seed clique, checked against the data size
pub(crate) fn check_clique_size(
    n: usize,
    size_constraint: usize,
    types: Option<&TypeConstraints>,
) -> Result<usize> {
    let clique_size = types.map_or(size_constraint, |t| t.clique_size());
    if clique_size == 0 {
        return Err(Error::invalid("size constraint must be positive"));
    }
    if clique_size > n {
        return Err(Error::invalid(format!(
            "size constraint {} exceeds the {} data points",
            clique_size, n
        )));
    }
    Ok(clique_size)
}

/// `point` followed by the nearest points completing its clique, or `None`
/// when the radius leaves too few neighbors
pub(crate) fn nearest_clique<F>(
    index: &DistanceIndex<F>,
    point: usize,
    clique_size: usize,
    types: Option<&TypeConstraints>,
    radius: Option<F>,
) -> Option<Vec<usize>>
where
    F: Float + Send + Sync,
{
    if let Some(types) = types {
        return types.select_clique(index, point, radius);
    }
    let mut clique = Vec::with_capacity(clique_size);
    clique.push(point);
    clique.extend(index.neighbors(point, clique_size - 1, None, radius));
    if clique.len() == clique_size {
        Some(clique)
    } else {
        None
    }
}

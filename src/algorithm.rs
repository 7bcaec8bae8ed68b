use num_traits::Float;

use crate::clustering::ClusteringResult;
use crate::distance::DistanceIndex;

/// Working state of one clustering call: the cluster of every point, the
/// seed of every cluster and the radius of every seed clique.
pub(crate) struct Partition<F> {
    labels: Vec<Option<usize>>,
    seeds: Vec<usize>,
    seed_radii: Vec<F>,
}

impl<F> Partition<F>
where
    F: Float + Send + Sync,
{
    pub(crate) fn new(n: usize) -> Self {
        Self {
            labels: vec![None; n],
            seeds: vec![],
            seed_radii: vec![],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.labels.len()
    }

    pub(crate) fn label(&self, p: usize) -> Option<usize> {
        self.labels[p]
    }

    pub(crate) fn is_assigned(&self, p: usize) -> bool {
        self.labels[p].is_some()
    }

    pub(crate) fn is_free(&self, clique: &[usize]) -> bool {
        clique.iter().all(|&q| self.labels[q].is_none())
    }

    pub(crate) fn num_clusters(&self) -> usize {
        self.seeds.len()
    }

    pub(crate) fn seed_radius(&self, cluster: usize) -> F {
        self.seed_radii[cluster]
    }

    /// Open a new cluster with `clique[0]` as seed and the whole clique as
    /// members. Returns the id of the new cluster.
    pub(crate) fn claim_seed(&mut self, clique: &[usize], index: &DistanceIndex<F>) -> usize {
        let cluster = self.seeds.len();
        let seed = clique[0];
        let radius = clique
            .iter()
            .map(|&q| index.distance(seed, q))
            .fold(F::zero(), F::max);
        clique.iter().for_each(|&q| self.assign(q, cluster));
        self.seeds.push(seed);
        self.seed_radii.push(radius);
        cluster
    }

    pub(crate) fn assign(&mut self, p: usize, cluster: usize) {
        debug_assert!(self.labels[p].is_none(), "point {} assigned twice", p);
        self.labels[p] = Some(cluster);
    }

    pub(crate) fn assigned_mask(&self) -> Vec<bool> {
        self.labels.iter().map(Option::is_some).collect()
    }

    pub(crate) fn seed_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.labels.len()];
        self.seeds.iter().for_each(|&s| mask[s] = true);
        mask
    }

    pub(crate) fn into_result(self) -> ClusteringResult {
        ClusteringResult::new(self.labels, self.seeds)
    }
}

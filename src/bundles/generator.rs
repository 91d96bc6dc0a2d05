//! Bundle generation for a whole trajectory set at one epsilon.

use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::bundle::Bundle;
use super::maximal::MaximalLengthSweep;
use super::sweep::FurthestEndpointSweep;
use super::ExtractionParams;
use crate::config::{EvolutionConfig, ExtractionStrategy};
use crate::error::{BundleError, Result};
use crate::freespace::{Concatenation, FreeSpaceGraph};
use crate::index::TrajectoryIndex;
use crate::progress::AbortHandle;
use crate::trajectory::{Subtrajectory, Trajectory};

/// Bundles of one epsilon step after lambda-subbundle reduction.
#[derive(Debug, Clone, Default)]
pub struct BundleSet {
    /// Surviving bundles, in deterministic priority order.
    pub bundles: Vec<Arc<Bundle>>,
    /// Removed bundles with the index (into `bundles`) of the survivor that
    /// absorbed them.
    pub absorbed: Vec<(Arc<Bundle>, usize)>,
}

impl BundleSet {
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

/// Extracts bundles from a fixed trajectory set.
pub struct BundleGenerator {
    trajectories: Vec<Arc<Trajectory>>,
    index: Option<TrajectoryIndex>,
    strategy: ExtractionStrategy,
    ignore_direction: bool,
}

impl BundleGenerator {
    /// Create a generator. Fails on an empty trajectory list and on ids
    /// used by more than one trajectory, since bundles identify members by
    /// parent id.
    pub fn new(
        trajectories: Vec<Arc<Trajectory>>,
        strategy: ExtractionStrategy,
        ignore_direction: bool,
        use_spatial_index: bool,
    ) -> Result<Self> {
        if trajectories.is_empty() {
            return Err(BundleError::EmptyInput);
        }
        let mut seen = HashSet::with_capacity(trajectories.len());
        if let Some(dup) = trajectories.iter().find(|t| !seen.insert(t.id())) {
            return Err(BundleError::DuplicateTrajectory {
                trajectory_id: dup.id().to_string(),
            });
        }
        let index = use_spatial_index.then(|| TrajectoryIndex::build(&trajectories));
        Ok(Self {
            trajectories,
            index,
            strategy,
            ignore_direction,
        })
    }

    pub fn from_config(trajectories: Vec<Arc<Trajectory>>, config: &EvolutionConfig) -> Result<Self> {
        Self::new(
            trajectories,
            config.strategy,
            config.ignore_direction,
            config.use_spatial_index,
        )
    }

    pub fn trajectories(&self) -> &[Arc<Trajectory>] {
        &self.trajectories
    }

    /// Extract, reduce and return the bundles for one parameter set.
    pub fn generate(&self, params: ExtractionParams, abort: &AbortHandle) -> Result<BundleSet> {
        abort.check()?;
        let raw = self.extract(params, abort)?;
        abort.check()?;
        let set = reduce(raw, params);
        debug!(
            "[Bundles] eps={:.3} k={}: {} bundles, {} absorbed",
            params.epsilon,
            params.k_min,
            set.bundles.len(),
            set.absorbed.len()
        );
        Ok(set)
    }

    /// Candidate bundles before cross-representative reduction.
    pub fn extract(&self, params: ExtractionParams, abort: &AbortHandle) -> Result<Vec<Bundle>> {
        if params.epsilon == 0.0 && params.k_min <= 1 {
            return Ok(self.singletons());
        }
        match self.strategy {
            ExtractionStrategy::FurthestEndpoint => self.per_representative(params, abort),
            ExtractionStrategy::MaximalLength => {
                let concat = self.concatenation((0..self.trajectories.len()).collect());
                MaximalLengthSweep::new(&concat, params, abort).sweep()
            }
        }
    }

    /// At zero epsilon every trajectory only matches itself.
    fn singletons(&self) -> Vec<Bundle> {
        self.trajectories
            .iter()
            .map(|t| {
                let full = Subtrajectory::full(t.forward());
                Bundle::new([full.clone()], full)
            })
            .collect()
    }

    /// Forward copies of the selected trajectories, followed by reversed
    /// copies when direction is ignored.
    fn concatenation(&self, selected: Vec<usize>) -> Concatenation {
        let mut concat = Concatenation::new(selected.iter().map(|&i| self.trajectories[i].forward()));
        if self.ignore_direction {
            for &i in &selected {
                concat.push(self.trajectories[i].reversed());
            }
        }
        concat
    }

    #[cfg(feature = "parallel")]
    fn per_representative(&self, params: ExtractionParams, abort: &AbortHandle) -> Result<Vec<Bundle>> {
        let per_rep: Vec<Vec<Bundle>> = (0..self.trajectories.len())
            .into_par_iter()
            .map(|i| self.extract_for(i, params, abort))
            .collect::<Result<_>>()?;
        Ok(per_rep.into_iter().flatten().collect())
    }

    #[cfg(not(feature = "parallel"))]
    fn per_representative(&self, params: ExtractionParams, abort: &AbortHandle) -> Result<Vec<Bundle>> {
        let mut out = Vec::new();
        for i in 0..self.trajectories.len() {
            out.extend(self.extract_for(i, params, abort)?);
        }
        Ok(out)
    }

    /// Bundles with trajectory `i` as representative.
    fn extract_for(&self, i: usize, params: ExtractionParams, abort: &AbortHandle) -> Result<Vec<Bundle>> {
        abort.check()?;
        let selected = match &self.index {
            Some(index) => index.near(i, params.epsilon),
            None => (0..self.trajectories.len()).collect(),
        };
        let rows = self.concatenation(selected);
        let representative = self.trajectories[i].forward();

        let mut graph = FreeSpaceGraph::for_representative(&representative, &rows, params.epsilon);
        graph.add_all_columns();
        abort.check()?;

        Ok(FurthestEndpointSweep::new(&graph, &rows, &representative, params).sweep())
    }
}

/// Remove bundles that are lambda-subbundles of a larger bundle with a
/// similar representative, and record the absorptions.
pub fn reduce(mut bundles: Vec<Bundle>, params: ExtractionParams) -> BundleSet {
    bundles.sort_by(Bundle::priority_cmp);
    let n = bundles.len();
    let mut absorbed_by: Vec<Option<usize>> = vec![None; n];

    for i in 0..n {
        if absorbed_by[i].is_some() {
            continue;
        }
        for j in 0..n {
            if i == j || absorbed_by[j].is_some() {
                continue;
            }
            let (big, small) = (&bundles[i], &bundles[j]);
            if small.size() > big.size() {
                continue;
            }
            if !big
                .representative()
                .has_as_lambda_similar(small.representative(), 2.0 * params.epsilon)
            {
                continue;
            }
            if big.has_as_lambda_subbundle(small, params.lambda) {
                absorbed_by[j] = Some(i);
            }
        }
    }

    // follow absorption chains to the final survivor
    let root = |mut k: usize| {
        while let Some(parent) = absorbed_by[k] {
            k = parent;
        }
        k
    };
    let mut position = vec![usize::MAX; n];
    let mut set = BundleSet::default();
    let bundles: Vec<Arc<Bundle>> = bundles.into_iter().map(Arc::new).collect();
    for (k, bundle) in bundles.iter().enumerate() {
        if absorbed_by[k].is_none() {
            position[k] = set.bundles.len();
            set.bundles.push(Arc::clone(bundle));
        }
    }
    for (k, bundle) in bundles.iter().enumerate() {
        if absorbed_by[k].is_some() {
            set.absorbed.push((Arc::clone(bundle), position[root(k)]));
        }
    }
    set
}

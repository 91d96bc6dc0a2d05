//! The evolution diagram and its derived per-class queries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use log::debug;

use super::state::{ClassId, DiagramState};
use crate::bundles::Bundle;
use crate::config::EvolutionConfig;

/// Picks the most representative epsilon of a class.
pub trait BestEpsilonScorer: Send + Sync + fmt::Debug {
    fn best_epsilon(&self, diagram: &EvolutionDiagram, class: ClassId) -> f64;
}

/// Start of the first length plateau after a steep increase in average
/// member length. Falls back to the birth epsilon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstPlateau {
    /// Length gain per unit epsilon that counts as steep.
    pub min_slope: f64,
    /// Epsilons above this are never considered.
    pub max_best_eps: f64,
    /// Epsilon range the length must stay flat for.
    pub min_plateau: f64,
}

impl Default for FirstPlateau {
    fn default() -> Self {
        Self {
            min_slope: 10.0,
            max_best_eps: 75.0,
            min_plateau: 20.0,
        }
    }
}

impl BestEpsilonScorer for FirstPlateau {
    fn best_epsilon(&self, diagram: &EvolutionDiagram, class: ClassId) -> f64 {
        let Some(birth) = diagram.birth_epsilon(class) else {
            return f64::NAN;
        };
        let Some(start) = diagram.states.iter().position(|s| s.epsilon == birth) else {
            return birth;
        };

        let mut best = birth;
        let mut found_steep = false;
        let mut last = &diagram.states[start];
        for next in &diagram.states[start + 1..] {
            if next.epsilon > self.max_best_eps {
                break;
            }
            let (Some(last_bundle), Some(next_bundle)) = (last.bundle(class), next.bundle(class)) else {
                break;
            };
            let gain = next_bundle.average_member_length() - last_bundle.average_member_length();
            if gain >= self.min_slope * (next.epsilon - last.epsilon) {
                found_steep = true;
                best = next.epsilon;
            } else if found_steep && next.epsilon - best >= self.min_plateau {
                return best;
            }
            last = next;
        }
        best
    }
}

/// Always the birth epsilon.
#[derive(Debug, Clone, Copy, Default)]
pub struct BirthEpsilon;

impl BestEpsilonScorer for BirthEpsilon {
    fn best_epsilon(&self, diagram: &EvolutionDiagram, class: ClassId) -> f64 {
        diagram.birth_epsilon(class).unwrap_or(f64::NAN)
    }
}

/// Thresholds a class must pass to be reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportFilter {
    pub min_lifespan: f64,
    /// Compared strictly.
    pub min_relative_lifespan: f64,
    pub min_size: usize,
    /// Shortest member at the best epsilon, as a multiple of that epsilon.
    pub min_length_factor: f64,
}

impl ReportFilter {
    pub fn from_config(config: &EvolutionConfig) -> Self {
        Self {
            min_lifespan: config.min_lifespan,
            min_relative_lifespan: config.min_relative_lifespan,
            min_size: config.min_reported_size,
            min_length_factor: config.min_reported_length_factor,
        }
    }

    /// Lets every class through.
    pub fn none() -> Self {
        Self {
            min_lifespan: 0.0,
            min_relative_lifespan: f64::NEG_INFINITY,
            min_size: 0,
            min_length_factor: 0.0,
        }
    }
}

/// Ordered sequence of diagram states with cached per-class moments.
#[derive(Debug, Clone)]
pub struct EvolutionDiagram {
    states: Vec<DiagramState>,
    max_eps: f64,
    report: ReportFilter,
    births: BTreeMap<ClassId, f64>,
    merges: BTreeMap<ClassId, (f64, ClassId)>,
    vanishes: BTreeMap<ClassId, f64>,
    best: BTreeMap<ClassId, f64>,
    scorer: Arc<dyn BestEpsilonScorer>,
}

impl EvolutionDiagram {
    /// Index the states and score every class with `scorer`.
    pub fn new(states: Vec<DiagramState>, config: &EvolutionConfig, scorer: Arc<dyn BestEpsilonScorer>) -> Self {
        let max_eps = states.last().map_or(config.max_eps, |s| s.epsilon);
        let mut diagram = Self {
            states,
            max_eps,
            report: ReportFilter::from_config(config),
            births: BTreeMap::new(),
            merges: BTreeMap::new(),
            vanishes: BTreeMap::new(),
            best: BTreeMap::new(),
            scorer,
        };
        diagram.index_moments();
        diagram.rescore_cached();
        diagram
    }

    fn index_moments(&mut self) {
        for state in &self.states {
            for &class in &state.births {
                self.births.insert(class, state.epsilon);
            }
            for (&from, &into) in &state.merges {
                self.merges.insert(from, (state.epsilon, into));
            }
            for &class in &state.vanished {
                self.vanishes.insert(class, state.epsilon);
            }
        }
    }

    fn rescore_cached(&mut self) {
        let scorer = Arc::clone(&self.scorer);
        self.best = self
            .births
            .keys()
            .map(|&class| (class, scorer.best_epsilon(self, class)))
            .collect();
        debug!("[Evolution] scored {} classes with {:?}", self.best.len(), scorer);
    }

    /// Replace the best-epsilon scorer and rebuild its cache.
    pub fn rescore(&mut self, scorer: Arc<dyn BestEpsilonScorer>) {
        self.scorer = scorer;
        self.rescore_cached();
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn epsilons(&self) -> Vec<f64> {
        self.states.iter().map(|s| s.epsilon).collect()
    }

    pub fn states(&self) -> &[DiagramState] {
        &self.states
    }

    /// Last state whose epsilon does not exceed `eps`.
    pub fn state_at(&self, eps: f64) -> Option<&DiagramState> {
        let idx = self.states.partition_point(|s| s.epsilon <= eps);
        idx.checked_sub(1).map(|i| &self.states[i])
    }

    /// Every class that was ever born, ascending.
    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.births.keys().copied()
    }

    pub fn num_classes(&self) -> usize {
        self.births.len()
    }

    pub fn birth_epsilon(&self, class: ClassId) -> Option<f64> {
        self.births.get(&class).copied()
    }

    /// Epsilon at which the class merged, `f64::INFINITY` when it never did.
    /// `None` for unknown classes.
    pub fn merge_epsilon(&self, class: ClassId) -> Option<f64> {
        self.births.get(&class)?;
        Some(self.merges.get(&class).map_or(f64::INFINITY, |&(eps, _)| eps))
    }

    pub fn merged_into(&self, class: ClassId) -> Option<ClassId> {
        self.merges.get(&class).map(|&(_, into)| into)
    }

    pub fn vanish_epsilon(&self, class: ClassId) -> Option<f64> {
        self.vanishes.get(&class).copied()
    }

    /// Epsilon range the class was alive for. Immortal classes live until
    /// the last epsilon of the diagram.
    pub fn lifespan(&self, class: ClassId) -> Option<f64> {
        let birth = self.birth_epsilon(class)?;
        let end = self
            .merges
            .get(&class)
            .map(|&(eps, _)| eps)
            .or_else(|| self.vanish_epsilon(class))
            .unwrap_or(self.max_eps);
        Some(end - birth)
    }

    /// Lifespan divided by birth epsilon; infinite for classes born at zero.
    pub fn relative_lifespan(&self, class: ClassId) -> Option<f64> {
        let birth = self.birth_epsilon(class)?;
        let lifespan = self.lifespan(class)?;
        Some(if birth == 0.0 { f64::INFINITY } else { lifespan / birth })
    }

    pub fn best_epsilon(&self, class: ClassId) -> Option<f64> {
        self.best.get(&class).copied()
    }

    /// Bundle of `class` in the state at `eps`.
    pub fn bundle_at(&self, class: ClassId, eps: f64) -> Option<&Arc<Bundle>> {
        self.state_at(eps)?.bundle(class)
    }

    /// Every class with its bundle at its best epsilon.
    pub fn bundles_at_best(&self) -> BTreeMap<ClassId, Arc<Bundle>> {
        self.best
            .iter()
            .filter_map(|(&class, &eps)| Some((class, Arc::clone(self.bundle_at(class, eps)?))))
            .collect()
    }

    /// Classes passing the report filter, ascending.
    pub fn reported_classes(&self) -> Vec<ClassId> {
        self.classes().filter(|&class| self.is_reported(class)).collect()
    }

    /// Whether `class` lives long enough, absolutely and relative to its
    /// birth, and its bundle at the best epsilon is large and long enough.
    pub fn is_reported(&self, class: ClassId) -> bool {
        let filter = &self.report;
        let (Some(lifespan), Some(relative), Some(best)) = (
            self.lifespan(class),
            self.relative_lifespan(class),
            self.best_epsilon(class),
        ) else {
            return false;
        };
        let Some(bundle) = self.bundle_at(class, best) else {
            return false;
        };
        lifespan >= filter.min_lifespan
            && relative > filter.min_relative_lifespan
            && bundle.size() >= filter.min_size
            && bundle.min_member_length() >= filter.min_length_factor * best
    }

    pub fn report_filter(&self) -> &ReportFilter {
        &self.report
    }

    /// Replace the report filter. Moments and best epsilons are unaffected.
    pub fn set_report_filter(&mut self, filter: ReportFilter) {
        self.report = filter;
    }

    /// Each class alive at or before `eps`, with its first bundle.
    pub fn first_bundles_up_to(&self, eps: f64) -> BTreeMap<ClassId, Arc<Bundle>> {
        let mut out = BTreeMap::new();
        for state in self.states.iter().take_while(|s| s.epsilon <= eps) {
            for (&class, bundle) in &state.classes {
                out.entry(class).or_insert_with(|| Arc::clone(bundle));
            }
        }
        out
    }

    /// Each class alive at or before `eps`, with its last bundle up to `eps`.
    pub fn last_bundles_up_to(&self, eps: f64) -> BTreeMap<ClassId, Arc<Bundle>> {
        let mut out = BTreeMap::new();
        for state in self.states.iter().take_while(|s| s.epsilon <= eps) {
            for (&class, bundle) in &state.classes {
                out.insert(class, Arc::clone(bundle));
            }
        }
        out
    }

    /// Copy of the diagram keeping only classes accepted by `keep`.
    ///
    /// A kept class that merged into a removed class stays alive, carrying
    /// its last bundle, until the removed class merges into a kept one. It
    /// then merges there. If the removed chain ends without a kept target,
    /// the waiting classes vanish with it.
    pub fn retain_classes<F>(&self, keep: F) -> EvolutionDiagram
    where
        F: Fn(ClassId) -> bool,
    {
        let mut states = Vec::with_capacity(self.states.len());
        let mut waiting: BTreeMap<ClassId, Vec<ClassId>> = BTreeMap::new();
        let mut carried: BTreeMap<ClassId, Arc<Bundle>> = BTreeMap::new();
        let mut last_seen: BTreeMap<ClassId, Arc<Bundle>> = BTreeMap::new();

        for state in &self.states {
            let mut next = DiagramState::new(state.epsilon, state.k);
            next.births = state.births.iter().copied().filter(|&c| keep(c)).collect();
            next.classes = state
                .classes
                .iter()
                .filter(|(&c, _)| keep(c))
                .map(|(&c, b)| (c, Arc::clone(b)))
                .collect();
            next.vanished = state.vanished.iter().copied().filter(|&c| keep(c)).collect();

            for (&from, &into) in &state.merges {
                let mut pending = waiting.remove(&from).unwrap_or_default();
                if keep(from) {
                    pending.push(from);
                }
                if keep(into) {
                    for class in pending {
                        carried.remove(&class);
                        next.merges.insert(class, into);
                    }
                } else {
                    for &class in &pending {
                        if let Some(bundle) = last_seen.get(&class) {
                            carried.entry(class).or_insert_with(|| Arc::clone(bundle));
                        }
                    }
                    waiting.entry(into).or_default().extend(pending);
                }
            }
            for class in state.vanished.iter().filter(|&&c| !keep(c)) {
                for orphan in waiting.remove(class).unwrap_or_default() {
                    carried.remove(&orphan);
                    next.vanished.insert(orphan);
                }
            }
            for (&class, bundle) in &carried {
                next.classes.insert(class, Arc::clone(bundle));
            }
            for (&class, bundle) in &next.classes {
                last_seen.insert(class, Arc::clone(bundle));
            }
            states.push(next);
        }

        let mut diagram = Self {
            states,
            max_eps: self.max_eps,
            report: self.report,
            births: BTreeMap::new(),
            merges: BTreeMap::new(),
            vanishes: BTreeMap::new(),
            best: BTreeMap::new(),
            scorer: Arc::clone(&self.scorer),
        };
        diagram.index_moments();
        diagram.rescore_cached();
        diagram
    }

    /// Classes alive in the last state.
    pub fn survivors(&self) -> BTreeSet<ClassId> {
        self.states
            .last()
            .map(|s| s.classes.keys().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::{Subtrajectory, Trajectory};

    fn bundle(ids: &[&str], length: f64) -> Arc<Bundle> {
        let members: Vec<Subtrajectory> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let t = Arc::new(Trajectory::from_xy(*id, &[(0.0, i as f64), (length, i as f64)]).unwrap());
                Subtrajectory::full(t.forward())
            })
            .collect();
        let rep = members[0].clone();
        Arc::new(Bundle::new(members, rep))
    }

    fn state(eps: f64, classes: &[(ClassId, &Arc<Bundle>)]) -> DiagramState {
        let mut s = DiagramState::new(eps, 2);
        for &(c, b) in classes {
            s.classes.insert(c, Arc::clone(b));
        }
        s
    }

    /// Class 0 lives 5..=20, class 1 is born at 10 and merges into 0 at 15,
    /// class 2 is born at 10 and vanishes at 15.
    fn sample() -> EvolutionDiagram {
        let a = bundle(&["a", "b"], 10.0);
        let b = bundle(&["c", "d"], 10.0);
        let c = bundle(&["e", "f"], 10.0);
        let big = bundle(&["a", "b", "c", "d"], 10.0);

        let mut s0 = state(5.0, &[(0, &a)]);
        s0.births.insert(0);
        let mut s1 = state(10.0, &[(0, &a), (1, &b), (2, &c)]);
        s1.births.extend([1, 2]);
        let mut s2 = state(15.0, &[(0, &big)]);
        s2.merges.insert(1, 0);
        s2.vanished.insert(2);
        let s3 = state(20.0, &[(0, &big)]);

        let config = EvolutionConfig {
            min_eps: 5.0,
            max_eps: 20.0,
            ..Default::default()
        };
        EvolutionDiagram::new(vec![s0, s1, s2, s3], &config, Arc::new(BirthEpsilon))
    }

    #[test]
    fn test_moments() {
        let d = sample();
        assert_eq!(d.epsilons(), vec![5.0, 10.0, 15.0, 20.0]);
        assert_eq!(d.num_classes(), 3);
        assert_eq!(d.birth_epsilon(1), Some(10.0));
        assert_eq!(d.merge_epsilon(1), Some(15.0));
        assert_eq!(d.merge_epsilon(0), Some(f64::INFINITY));
        assert_eq!(d.merge_epsilon(7), None);
        assert_eq!(d.merged_into(1), Some(0));
        assert_eq!(d.vanish_epsilon(2), Some(15.0));
        assert_eq!(d.lifespan(0), Some(15.0));
        assert_eq!(d.lifespan(1), Some(5.0));
        assert_eq!(d.lifespan(2), Some(5.0));
        assert!((d.relative_lifespan(0).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_state_lookup_is_floor() {
        let d = sample();
        assert!(d.state_at(4.9).is_none());
        assert_eq!(d.state_at(12.0).map(|s| s.epsilon), Some(10.0));
        assert_eq!(d.bundle_at(0, 17.0).map(|b| b.size()), Some(4));
        assert!(d.bundle_at(1, 15.0).is_none());
    }

    #[test]
    fn test_first_and_last_bundles() {
        let d = sample();
        let first = d.first_bundles_up_to(20.0);
        let last = d.last_bundles_up_to(20.0);
        assert_eq!(first.len(), 3);
        assert_eq!(first[&0].size(), 2);
        assert_eq!(last[&0].size(), 4);
        assert_eq!(d.first_bundles_up_to(5.0).len(), 1);
    }

    #[test]
    fn test_reported_classes_and_best() {
        let mut d = sample();
        d.set_report_filter(ReportFilter {
            min_lifespan: 10.0,
            ..ReportFilter::none()
        });
        assert_eq!(d.reported_classes(), vec![0]);
        assert_eq!(d.best_epsilon(1), Some(10.0));
        assert_eq!(d.bundles_at_best().len(), 3);
    }

    #[test]
    fn test_report_filter_thresholds() {
        let mut d = sample();
        // class 0 has relative lifespan exactly 3
        d.set_report_filter(ReportFilter {
            min_relative_lifespan: 3.0,
            ..ReportFilter::none()
        });
        assert!(d.reported_classes().is_empty());
        d.set_report_filter(ReportFilter {
            min_relative_lifespan: 2.9,
            ..ReportFilter::none()
        });
        assert_eq!(d.reported_classes(), vec![0]);

        // all bundles have size 2 at birth
        d.set_report_filter(ReportFilter {
            min_size: 3,
            ..ReportFilter::none()
        });
        assert!(d.reported_classes().is_empty());

        // members are 10 long; class 0 is best at 5, classes 1 and 2 at 10
        d.set_report_filter(ReportFilter {
            min_length_factor: 1.5,
            ..ReportFilter::none()
        });
        assert_eq!(d.reported_classes(), vec![0]);
    }

    #[test]
    fn test_default_filter_from_config() {
        let d = sample();
        assert_eq!(d.report_filter().min_size, 3);
        // size 2 bundles never pass the default
        assert!(d.reported_classes().is_empty());
    }

    #[test]
    fn test_retain_redirects_nothing_when_target_kept() {
        let d = sample();
        let filtered = d.retain_classes(|c| c != 2);
        assert_eq!(filtered.num_classes(), 2);
        assert_eq!(filtered.merged_into(1), Some(0));
        assert!(filtered.vanish_epsilon(2).is_none());
    }

    #[test]
    fn test_retain_carries_class_merged_into_removed() {
        let d = sample();
        let filtered = d.retain_classes(|c| c != 0);
        // class 1 merged into the removed class 0, which never merges on
        assert_eq!(filtered.merge_epsilon(1), Some(f64::INFINITY));
        assert_eq!(filtered.bundle_at(1, 20.0).map(|b| b.size()), Some(2));
        assert_eq!(filtered.lifespan(1), Some(10.0));
    }

    #[test]
    fn test_first_plateau() {
        let short = bundle(&["a", "b"], 10.0);
        let long = bundle(&["a", "b"], 100.0);
        let mut states = Vec::new();
        for (i, eps) in [5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0].into_iter().enumerate() {
            let b = if i < 2 { &short } else { &long };
            let mut s = state(eps, &[(0, b)]);
            if i == 0 {
                s.births.insert(0);
            }
            states.push(s);
        }
        let d = EvolutionDiagram::new(states, &EvolutionConfig::default(), Arc::new(FirstPlateau::default()));
        // jump of 90 over 5 eps at 15, flat for 20 afterwards
        assert_eq!(d.best_epsilon(0), Some(15.0));
    }
}

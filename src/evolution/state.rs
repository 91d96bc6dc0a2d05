//! One snapshot of the evolution diagram.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::bundles::Bundle;

/// Persistent identity of a bundle across epsilon steps.
pub type ClassId = usize;

/// Bundles alive at one epsilon, keyed by class, plus the class events that
/// happened at this step.
#[derive(Debug, Clone, Default)]
pub struct DiagramState {
    pub epsilon: f64,
    /// Minimum bundle size used at this step.
    pub k: usize,
    /// Live classes and their bundle at this epsilon.
    pub classes: BTreeMap<ClassId, Arc<Bundle>>,
    /// Classes first seen at this step.
    pub births: BTreeSet<ClassId>,
    /// Classes that ended at this step, mapped to the class they merged into.
    pub merges: BTreeMap<ClassId, ClassId>,
    /// Classes that ended at this step without a successor.
    pub vanished: BTreeSet<ClassId>,
}

impl DiagramState {
    pub fn new(epsilon: f64, k: usize) -> Self {
        Self {
            epsilon,
            k,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.classes.contains_key(&class)
    }

    pub fn bundle(&self, class: ClassId) -> Option<&Arc<Bundle>> {
        self.classes.get(&class)
    }

    /// Class of a bundle held by this state. Bundles are compared by
    /// identity, not by content.
    pub fn class_of(&self, bundle: &Arc<Bundle>) -> Option<ClassId> {
        self.classes
            .iter()
            .find(|(_, b)| Arc::ptr_eq(b, bundle))
            .map(|(&class, _)| class)
    }
}

//! Id-keyed diff between the markers of the current pass and what the
//! rendering surface already shows.
//!
//! Annotations whose id survives a pass are left alone, so the surface keeps
//! their on-screen element (and any selection or animation state) instead of
//! tearing it down and recreating it.

use std::collections::{HashMap, HashSet};

use pinmap_core::{Marker, RenderedAnnotation};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("stale reconciliation: baseline v{computed_against}, current v{current}")]
    StaleBaseline { computed_against: u64, current: u64 },
}

/// Result of diffing one pass against the previous annotation set.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub to_add: Vec<Marker>,
    /// Ids to take off the surface, sorted.
    pub to_remove: Vec<String>,
    pub unchanged: HashMap<String, RenderedAnnotation>,
    base_version: Option<u64>,
}

impl Reconciliation {
    /// `true` when applying this reconciliation would not touch the surface.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// What the rendering surface must do to catch up with the current pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderInstructions {
    pub to_add: Vec<Marker>,
    pub to_remove: Vec<String>,
}

impl RenderInstructions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Diff `current` against `previous` by marker id.
///
/// A marker whose id is already rendered lands in `unchanged` even if its
/// coordinate moved. When `current` repeats an id, the first occurrence wins.
#[must_use]
pub fn reconcile(
    current: &[Marker],
    previous: &HashMap<String, RenderedAnnotation>,
) -> Reconciliation {
    let mut seen: HashSet<&str> = HashSet::with_capacity(current.len());
    let mut to_add = Vec::new();
    let mut unchanged = HashMap::new();

    for marker in current {
        if !seen.insert(marker.id.as_str()) {
            continue;
        }
        match previous.get(&marker.id) {
            Some(existing) => {
                unchanged.insert(marker.id.clone(), existing.clone());
            }
            None => to_add.push(marker.clone()),
        }
    }

    let mut to_remove: Vec<String> = previous
        .keys()
        .filter(|id| !seen.contains(id.as_str()))
        .cloned()
        .collect();
    to_remove.sort_unstable();

    Reconciliation {
        to_add,
        to_remove,
        unchanged,
        base_version: None,
    }
}

/// The annotation set currently on the rendering surface, owned by exactly
/// one writer.
///
/// Every applied reconciliation bumps `version`; a reconciliation computed
/// against an older version is rejected instead of being applied out of order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationBaseline {
    version: u64,
    annotations: HashMap<String, RenderedAnnotation>,
}

impl AnnotationBaseline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn annotations(&self) -> &HashMap<String, RenderedAnnotation> {
        &self.annotations
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RenderedAnnotation> {
        self.annotations.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Diff `markers` against this baseline, stamped with the current version.
    #[must_use]
    pub fn reconcile(&self, markers: &[Marker]) -> Reconciliation {
        let mut reconciliation = reconcile(markers, &self.annotations);
        reconciliation.base_version = Some(self.version);
        reconciliation
    }

    /// Install `unchanged ∪ to_add` as the new baseline and hand back what
    /// the surface has to do.
    ///
    /// A reconciliation built with the free [`reconcile`] function carries no
    /// version and is always accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::StaleBaseline`] if `reconciliation` was
    /// computed against a different version of this baseline.
    pub fn apply(
        &mut self,
        reconciliation: Reconciliation,
    ) -> Result<RenderInstructions, ReconcileError> {
        if let Some(computed_against) = reconciliation.base_version {
            if computed_against != self.version {
                return Err(ReconcileError::StaleBaseline {
                    computed_against,
                    current: self.version,
                });
            }
        }

        Ok(self.install(reconciliation))
    }

    /// Reconcile and apply in one step.
    pub fn refresh(&mut self, markers: &[Marker]) -> RenderInstructions {
        let reconciliation = reconcile(markers, &self.annotations);
        self.install(reconciliation)
    }

    fn install(&mut self, reconciliation: Reconciliation) -> RenderInstructions {
        let Reconciliation {
            to_add,
            to_remove,
            mut unchanged,
            ..
        } = reconciliation;

        let kept = unchanged.len();
        for marker in &to_add {
            unchanged.insert(marker.id.clone(), RenderedAnnotation::from(marker));
        }
        self.annotations = unchanged;
        self.version += 1;

        tracing::debug!(
            version = self.version,
            added = to_add.len(),
            removed = to_remove.len(),
            kept,
            "annotation baseline advanced"
        );

        RenderInstructions { to_add, to_remove }
    }
}

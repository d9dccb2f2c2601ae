//! Spatial selectors
//!
//! Every selector receives a fresh [SelectorId] when it is built and cannot be changed
//! afterwards, so a cached mask keyed by that id can never go stale.

use crate::traits::Selector;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SELECTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Version token identifying an immutable selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectorId(u64);

impl SelectorId {
    /// A new id, greater than every id handed out before
    pub fn next() -> Self {
        Self(NEXT_SELECTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Selects everything
#[derive(Debug, Clone)]
pub struct AllSelector {
    id: SelectorId,
}

impl AllSelector {
    /// A selector with a fresh id
    pub fn new() -> Self {
        Self {
            id: SelectorId::next(),
        }
    }
}

impl Default for AllSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for AllSelector {
    fn id(&self) -> SelectorId {
        self.id
    }

    fn select_bbox(&self, _left: [f64; 3], _right: [f64; 3]) -> bool {
        true
    }
}

/// Selects everything overlapping an axis-aligned box
#[derive(Debug, Clone)]
pub struct RegionSelector {
    id: SelectorId,
    left_edge: [f64; 3],
    right_edge: [f64; 3],
}

impl RegionSelector {
    /// Select the box `[left_edge, right_edge]`
    pub fn new(left_edge: [f64; 3], right_edge: [f64; 3]) -> Self {
        Self {
            id: SelectorId::next(),
            left_edge,
            right_edge,
        }
    }

    /// Lower corner
    pub fn left_edge(&self) -> [f64; 3] {
        self.left_edge
    }

    /// Upper corner
    pub fn right_edge(&self) -> [f64; 3] {
        self.right_edge
    }
}

impl Selector for RegionSelector {
    fn id(&self) -> SelectorId {
        self.id
    }

    fn select_bbox(&self, left: [f64; 3], right: [f64; 3]) -> bool {
        (0..3).all(|i| left[i] < self.right_edge[i] && right[i] > self.left_edge[i])
    }
}

/// Selects everything overlapping a sphere
#[derive(Debug, Clone)]
pub struct SphereSelector {
    id: SelectorId,
    center: [f64; 3],
    radius: f64,
}

impl SphereSelector {
    /// Select the ball of `radius` around `center`
    pub fn new(center: [f64; 3], radius: f64) -> Self {
        Self {
            id: SelectorId::next(),
            center,
            radius,
        }
    }

    /// Centre of the sphere
    pub fn center(&self) -> [f64; 3] {
        self.center
    }

    /// Radius of the sphere
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Selector for SphereSelector {
    fn id(&self) -> SelectorId {
        self.id
    }

    fn select_bbox(&self, left: [f64; 3], right: [f64; 3]) -> bool {
        // Distance from the centre to the closest point of the box
        let dist2: f64 = (0..3)
            .map(|i| {
                let d = self.center[i].clamp(left[i], right[i]) - self.center[i];
                d * d
            })
            .sum();
        dist2 <= self.radius * self.radius
    }

    fn select_cell(&self, center: [f64; 3], _width: [f64; 3]) -> bool {
        let dist2: f64 = (0..3)
            .map(|i| {
                let d = center[i] - self.center[i];
                d * d
            })
            .sum();
        dist2 <= self.radius * self.radius
    }
}

//! Spatial selection predicate
use crate::selector::SelectorId;

pub trait Selector {
    //! A spatial predicate over octs and cells
    //!
    //! Selectors are immutable once built. Two selectors with the same [SelectorId] are
    //! guaranteed to select the same octs and cells, which is what makes masks cacheable.

    /// Version token of this selector
    fn id(&self) -> SelectorId;

    /// Does the axis-aligned box `[left, right]` intersect the selected region
    fn select_bbox(&self, left: [f64; 3], right: [f64; 3]) -> bool;

    /// Does the oct centred at `center` with edge lengths `width` intersect the region
    fn select_oct(&self, center: [f64; 3], width: [f64; 3]) -> bool {
        let (left, right) = bounds(center, width);
        self.select_bbox(left, right)
    }

    /// Is the cell centred at `center` with edge lengths `width` selected
    fn select_cell(&self, center: [f64; 3], width: [f64; 3]) -> bool {
        let (left, right) = bounds(center, width);
        self.select_bbox(left, right)
    }
}

fn bounds(center: [f64; 3], width: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    (
        [
            center[0] - 0.5 * width[0],
            center[1] - 0.5 * width[1],
            center[2] - 0.5 * width[2],
        ],
        [
            center[0] + 0.5 * width[0],
            center[1] + 0.5 * width[1],
            center[2] + 0.5 * width[2],
        ],
    )
}

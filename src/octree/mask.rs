//! Oct selection masks

/// One flag per oct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OctMask {
    selected: Vec<bool>,
}

impl OctMask {
    /// A mask of `len` unselected octs
    pub fn new(len: usize) -> Self {
        Self {
            selected: vec![false; len],
        }
    }

    /// Number of octs covered
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Does the mask cover no octs
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Is oct `index` selected; out-of-range indices are not
    pub fn get(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    /// Select or deselect oct `index`
    pub fn set(&mut self, index: usize, value: bool) {
        self.selected[index] = value;
    }

    /// Number of selected octs
    pub fn count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    /// Indices of the selected octs, ascending
    pub fn iter_selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.then_some(i))
    }

    /// The flags
    pub fn as_slice(&self) -> &[bool] {
        &self.selected
    }
}

impl FromIterator<bool> for OctMask {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            selected: iter.into_iter().collect(),
        }
    }
}

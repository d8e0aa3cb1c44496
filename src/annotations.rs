// Pins placed on the map and the at-most-one selected pin
use crate::position::Coordinate;
use rustc_hash::FxHashMap;

/// Identity of a pin. Generated from a counter, never reused within one set,
/// so two pins at the same coordinate stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub coordinate: Coordinate,
}

#[derive(Debug, Default)]
pub struct AnnotationSet {
    annotations: Vec<Annotation>,
    /// Map id to index into `annotations`
    id_to_index: FxHashMap<AnnotationId, usize>,
    /// Invariant: if Some, the id is present in `id_to_index`
    selected: Option<AnnotationId>,
    next_id: u64,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new pin and return its identity
    pub fn add(&mut self, coordinate: Coordinate) -> AnnotationId {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;

        let idx = self.annotations.len();
        self.annotations.push(Annotation { id, coordinate });
        self.id_to_index.insert(id, idx);
        id
    }

    /// Append a new pin and make it the selected one
    pub fn add_selected(&mut self, coordinate: Coordinate) -> AnnotationId {
        let id = self.add(coordinate);
        self.selected = Some(id);
        id
    }

    /// Select a pin by id. Returns false (and leaves the selection alone) if
    /// the id is not in the set.
    pub fn select(&mut self, id: AnnotationId) -> bool {
        if !self.id_to_index.contains_key(&id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn selected_id(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&Annotation> {
        self.selected.and_then(|id| self.get(id))
    }

    #[cfg(test)]
    pub fn is_selected(&self, id: AnnotationId) -> bool {
        self.selected == Some(id)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.id_to_index.get(&id).map(|&idx| &self.annotations[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Remove every pin and drop the selection. The id counter keeps running
    /// so ids handed out before the clear never match a later pin.
    pub fn clear(&mut self) {
        self.annotations.clear();
        self.id_to_index.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_coordinate_distinct_identity() {
        let mut set = AnnotationSet::new();
        let c = Coordinate::new(37.0, -122.0);
        let a = set.add(c);
        let b = set.add(c);
        assert_ne!(a, b);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(a).map(|x| x.coordinate), Some(c));
        assert_eq!(set.get(b).map(|x| x.coordinate), Some(c));
    }

    #[test]
    fn test_selection_is_unique() {
        let mut set = AnnotationSet::new();
        let a = set.add(Coordinate::new(1.0, 1.0));
        let b = set.add(Coordinate::new(2.0, 2.0));

        assert!(set.select(a));
        assert!(set.is_selected(a));
        assert!(set.select(b));
        assert!(set.is_selected(b));
        assert!(!set.is_selected(a));
        assert_eq!(set.selected().map(|x| x.id), Some(b));
    }

    #[test]
    fn test_select_unknown_id_keeps_selection() {
        let mut set = AnnotationSet::new();
        let a = set.add_selected(Coordinate::new(1.0, 1.0));
        set.clear();
        let b = set.add_selected(Coordinate::new(2.0, 2.0));

        // `a` was dropped by the clear and must not come back
        assert!(!set.select(a));
        assert_eq!(set.selected_id(), Some(b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_clear_drops_selection() {
        let mut set = AnnotationSet::new();
        set.add_selected(Coordinate::new(1.0, 1.0));
        set.clear();
        assert!(set.is_empty());
        assert!(set.selected().is_none());
        assert!(set.selected_id().is_none());
    }
}

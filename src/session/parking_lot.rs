//! Parking lot buffer
//!
//! Ordered scratch list of interruptions captured during a session.

use serde::Serialize;

use super::model::ParkingLotItem;

/// In-memory, insertion-ordered list of parking-lot captures
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ParkingLotBuffer {
    items: Vec<ParkingLotItem>,
}

impl ParkingLotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the end
    pub fn add(&mut self, item: ParkingLotItem) {
        self.items.push(item);
    }

    /// Remove exactly the entry at `index`
    ///
    /// Out-of-range indices leave the buffer untouched.
    pub fn remove_at(&mut self, index: usize) -> Option<ParkingLotItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Copies of the buffered items tagged with the owning session
    ///
    /// Reads without clearing.
    pub fn tagged(&self, session_id: &str) -> Vec<ParkingLotItem> {
        self.items
            .iter()
            .cloned()
            .map(|mut item| {
                item.session_id = Some(session_id.to_string());
                item
            })
            .collect()
    }

    pub fn items(&self) -> &[ParkingLotItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

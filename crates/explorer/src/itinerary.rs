//! Ordered, de-duplicated list of selected spots.
//!
//! `add` and `remove` are the only mutations. Subscribers run synchronously
//! after each applied mutation and see the updated list.

use catalog::Spot;
use foundation::ids::SpotId;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ItineraryChange {
    Added { index: usize, spot: SpotId },
    Removed { index: usize, spot: SpotId },
}

type Subscriber = Box<dyn FnMut(&ItineraryChange, &[Spot])>;

#[derive(Default)]
pub struct Itinerary {
    entries: Vec<Spot>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl std::fmt::Debug for Itinerary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Itinerary")
            .field("entries", &self.entries.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Itinerary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `spot` unless an entry with the same identity exists.
    /// Returns `false` for "already present".
    pub fn add(&mut self, spot: Spot) -> bool {
        if self.contains(&spot.id) {
            return false;
        }
        let change = ItineraryChange::Added {
            index: self.entries.len(),
            spot: spot.id.clone(),
        };
        self.entries.push(spot);
        self.notify(change);
        true
    }

    /// Removes the entry at `index`. Negative or out-of-range indices leave
    /// the list untouched; stale UI callbacks may send them.
    pub fn remove(&mut self, index: isize) -> Option<Spot> {
        let i = usize::try_from(index).ok().filter(|i| *i < self.entries.len())?;
        let spot = self.entries.remove(i);
        self.notify(ItineraryChange::Removed {
            index: i,
            spot: spot.id.clone(),
        });
        Some(spot)
    }

    pub fn subscribe(&mut self, f: impl FnMut(&ItineraryChange, &[Spot]) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(f)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn entries(&self) -> &[Spot] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &SpotId) -> bool {
        self.entries.iter().any(|s| &s.id == id)
    }

    pub fn position(&self, id: &SpotId) -> Option<usize> {
        self.entries.iter().position(|s| &s.id == id)
    }

    /// Header text of the itinerary panel.
    pub fn summary(&self) -> String {
        match self.entries.len() {
            1 => "1 place added".to_string(),
            n => format!("{n} places added"),
        }
    }

    fn notify(&mut self, change: ItineraryChange) {
        debug!(?change, len = self.entries.len(), "itinerary changed");
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&change, &self.entries);
        }
    }
}

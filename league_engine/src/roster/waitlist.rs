//! Capacity-bound waitlists with dense positions.
//!
//! Registrations queue for participant slots and teams queue for team slots.
//! Both share the same rules: an entry beyond capacity joins the back of the
//! queue, the lowest-positioned eligible entry is promoted when a slot frees,
//! and positions are always renumbered to a gapless `1..=K`.

use super::models::{Registration, RegistrationStatus, Team, TeamStatus};

/// An entry that can hold a slot or wait for one
pub trait WaitlistEntry {
    /// Currently holds a slot
    fn holds_slot(&self) -> bool;
    /// Currently waiting
    fn is_waitlisted(&self) -> bool;
    /// Creation order, used to break position ties
    fn sequence(&self) -> u32;
    fn waitlist_position(&self) -> Option<u32>;
    fn set_waitlist_position(&mut self, position: Option<u32>);
    /// Move to the waitlist (position assigned by the caller)
    fn mark_waitlisted(&mut self);
    /// Take a slot and leave the waitlist
    fn mark_promoted(&mut self);
}

impl WaitlistEntry for Registration {
    fn holds_slot(&self) -> bool {
        self.status == RegistrationStatus::Confirmed
    }

    fn is_waitlisted(&self) -> bool {
        self.status == RegistrationStatus::Waitlisted
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn waitlist_position(&self) -> Option<u32> {
        self.waitlist_position
    }

    fn set_waitlist_position(&mut self, position: Option<u32>) {
        self.waitlist_position = position;
    }

    fn mark_waitlisted(&mut self) {
        self.status = RegistrationStatus::Waitlisted;
    }

    fn mark_promoted(&mut self) {
        self.status = RegistrationStatus::Confirmed;
        self.waitlist_position = None;
    }
}

impl WaitlistEntry for Team {
    fn holds_slot(&self) -> bool {
        self.status == TeamStatus::Registered
    }

    fn is_waitlisted(&self) -> bool {
        self.status == TeamStatus::Waitlisted
    }

    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn waitlist_position(&self) -> Option<u32> {
        self.waitlist_position
    }

    fn set_waitlist_position(&mut self, position: Option<u32>) {
        self.waitlist_position = position;
    }

    fn mark_waitlisted(&mut self) {
        self.status = TeamStatus::Waitlisted;
    }

    fn mark_promoted(&mut self) {
        self.status = TeamStatus::Registered;
        self.waitlist_position = None;
    }
}

/// Number of entries holding a slot
pub fn occupied<T: WaitlistEntry>(entries: &[T]) -> usize {
    entries.iter().filter(|e| e.holds_slot()).count()
}

/// Whether another entry can take a slot right now
pub fn has_capacity<T: WaitlistEntry>(entries: &[T], capacity: Option<u32>) -> bool {
    capacity.is_none_or(|cap| occupied(entries) < cap as usize)
}

/// Put the entry at `index` at the back of the waitlist
pub fn enqueue<T: WaitlistEntry>(entries: &mut [T], index: usize) {
    let next = entries.iter().filter(|e| e.is_waitlisted()).count() as u32 + 1;
    entries[index].mark_waitlisted();
    entries[index].set_waitlist_position(Some(next));
    renumber(entries);
}

/// Renumber waitlisted entries to `1..=K`, preserving their current order
///
/// Entries that left the waitlist lose their position.
pub fn renumber<T: WaitlistEntry>(entries: &mut [T]) {
    let mut waiting: Vec<usize> = Vec::new();
    for (index, entry) in entries.iter_mut().enumerate() {
        if entry.is_waitlisted() {
            waiting.push(index);
        } else {
            entry.set_waitlist_position(None);
        }
    }
    waiting.sort_by_key(|&i| {
        (
            entries[i].waitlist_position().unwrap_or(u32::MAX),
            entries[i].sequence(),
        )
    });
    for (rank, index) in waiting.into_iter().enumerate() {
        entries[index].set_waitlist_position(Some(rank as u32 + 1));
    }
}

/// Promote eligible entries while capacity allows
///
/// Returns the indices of promoted entries, in promotion order.
pub fn promote<T, F>(entries: &mut [T], capacity: Option<u32>, eligible: F) -> Vec<usize>
where
    T: WaitlistEntry,
    F: Fn(&T) -> bool,
{
    let mut promoted = Vec::new();
    while has_capacity(entries, capacity) {
        let next = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_waitlisted() && eligible(e))
            .min_by_key(|(_, e)| (e.waitlist_position().unwrap_or(u32::MAX), e.sequence()))
            .map(|(i, _)| i);
        let Some(index) = next else {
            break;
        };
        entries[index].mark_promoted();
        promoted.push(index);
    }
    renumber(entries);
    promoted
}

/// True when waitlist positions form exactly `1..=K`
pub fn is_dense<T: WaitlistEntry>(entries: &[T]) -> bool {
    let mut positions: Vec<u32> = entries
        .iter()
        .filter(|e| e.is_waitlisted())
        .filter_map(|e| e.waitlist_position())
        .collect();
    let waiting = entries.iter().filter(|e| e.is_waitlisted()).count();
    if positions.len() != waiting {
        return false;
    }
    positions.sort_unstable();
    positions.iter().enumerate().all(|(i, &p)| p == i as u32 + 1)
        && entries
            .iter()
            .filter(|e| !e.is_waitlisted())
            .all(|e| e.waitlist_position().is_none())
}

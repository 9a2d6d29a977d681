//! Generation counters that discard responses superseded by a newer request.
//!
//! Every asynchronous store operation takes a [`Ticket`] before it awaits the
//! network. When the response comes back, the ticket is checked against the
//! fence: a newer request of the same kind, or a user switch in between,
//! makes the ticket stale and the response is dropped.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadPlans,
    UpdateTarget,
    ChatTurn,
    Prediction,
    ClearChat,
    /// Onboarding pages and adherence logs.
    FormSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub operation: Operation,
    pub generation: u64,
    pub epoch: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RequestFence {
    latest: HashMap<Operation, u64>,
    epoch: u64,
}

impl RequestFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, operation: Operation) -> Ticket {
        let generation = self.latest.entry(operation).or_insert(0);
        *generation += 1;
        Ticket {
            operation,
            generation: *generation,
            epoch: self.epoch,
        }
    }

    /// True while no newer ticket of the same kind exists and the user is unchanged.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.same_user(ticket) && self.latest.get(&ticket.operation) == Some(&ticket.generation)
    }

    /// True while the user the ticket was issued for is still active.
    pub fn same_user(&self, ticket: Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Invalidate every outstanding ticket. Called on user switch.
    pub fn advance_epoch(&mut self) {
        self.epoch += 1;
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut fence = RequestFence::new();
        let first = fence.issue(Operation::LoadPlans);
        let second = fence.issue(Operation::LoadPlans);
        assert!(!fence.is_current(first));
        assert!(fence.is_current(second));
    }

    #[test]
    fn test_operations_are_fenced_independently() {
        let mut fence = RequestFence::new();
        let load = fence.issue(Operation::LoadPlans);
        let _update = fence.issue(Operation::UpdateTarget);
        assert!(fence.is_current(load));
    }

    #[test]
    fn test_epoch_invalidates_everything() {
        let mut fence = RequestFence::new();
        let load = fence.issue(Operation::LoadPlans);
        let chat = fence.issue(Operation::ChatTurn);
        fence.advance_epoch();
        assert!(!fence.is_current(load));
        assert!(!fence.same_user(chat));
        let fresh = fence.issue(Operation::LoadPlans);
        assert!(fence.is_current(fresh));
    }
}

//! Optimistic status transitions requested by drag-and-drop.
//!
//! Each in-flight transition is an explicit record moving
//! `Pending -> {Committed, RolledBack, Superseded}`. At most one record exists
//! per task id, which is what makes a second request for the same task fail
//! with [`BoardError::ConflictingTransition`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{BoardError, BoardResult, describe};
use crate::store::TaskStore;
use crate::task::{Status, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Pending,
    /// The collaborator acknowledged the change and its copy is now held.
    Committed,
    /// The collaborator rejected the change and the prior status is back.
    RolledBack,
    /// A full task-list refresh or a removal landed first; the fresher data
    /// was kept.
    Superseded,
}

/// Handle for one in-flight transition, returned by
/// [`TransitionTracker::begin`] and consumed by [`TransitionTracker::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTicket {
    pub task_id: String,
    pub requested: Status,
    seq: u64,
}

#[derive(Debug, Clone)]
struct InFlight {
    seq: u64,
    previous: Status,
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionTracker {
    in_flight: HashMap<String, InFlight>,
    settled: HashMap<String, TransitionPhase>,
    /// Store generation the `settled` outcomes belong to.
    settled_generation: u64,
    next_seq: u64,
}

impl TransitionTracker {
    pub fn is_pending(&self, task_id: &str) -> bool {
        self.in_flight.contains_key(task_id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// `Pending` while in flight, otherwise how the last transition for the
    /// task ended.
    pub fn phase(&self, task_id: &str) -> Option<TransitionPhase> {
        if self.in_flight.contains_key(task_id) {
            return Some(TransitionPhase::Pending);
        }
        self.settled.get(task_id).copied()
    }

    /// Drops settled outcomes recorded before the store's task list was last
    /// replaced. In-flight records are kept; [`Self::resolve`] handles those.
    pub fn forget_replaced(&mut self, store: &TaskStore) {
        if store.generation() == self.settled_generation {
            return;
        }
        if !self.settled.is_empty() {
            debug!(dropped = self.settled.len(), "task list replaced; forgetting settled transitions");
        }
        self.settled.clear();
        self.settled_generation = store.generation();
    }

    /// Applies the optimistic status and flags the task pending. Rejects a
    /// second request for a task that already has one in flight without
    /// touching the store.
    #[tracing::instrument(skip(self, store, now))]
    pub fn begin(
        &mut self,
        store: &mut TaskStore,
        task_id: &str,
        new_status: Status,
        now: DateTime<Utc>,
    ) -> BoardResult<TransitionTicket> {
        if !new_status.is_known() {
            return Err(BoardError::InvalidStatus(new_status.to_string()));
        }
        self.forget_replaced(store);
        if self.in_flight.contains_key(task_id) {
            warn!("transition already in flight");
            return Err(BoardError::ConflictingTransition(task_id.to_string()));
        }

        let previous = store
            .task(task_id)
            .map(|task| task.status.clone())
            .ok_or_else(|| BoardError::UnknownTask(task_id.to_string()))?;

        let requested = new_status.clone();
        store.edit_task(task_id, now, |task| {
            task.status = new_status;
            task.pending = true;
        });

        self.next_seq += 1;
        let seq = self.next_seq;
        self.in_flight.insert(
            task_id.to_string(),
            InFlight {
                seq,
                previous: previous.clone(),
                generation: store.generation(),
            },
        );

        debug!(%previous, %requested, seq, "optimistic status applied");
        Ok(TransitionTicket {
            task_id: task_id.to_string(),
            requested,
            seq,
        })
    }

    /// Settles a transition with the collaborator's outcome.
    ///
    /// On rejection the prior status is restored and the pending flag
    /// cleared, unless a full refresh replaced the task list or the task was
    /// removed meanwhile; either way the failure is returned as
    /// [`BoardError::TransitionFailure`]. An acknowledgement for a removed
    /// task is dropped rather than re-adding it.
    #[tracing::instrument(skip(self, store, outcome), fields(task_id = %ticket.task_id))]
    pub fn resolve(
        &mut self,
        store: &mut TaskStore,
        ticket: TransitionTicket,
        outcome: anyhow::Result<Task>,
        now: DateTime<Utc>,
    ) -> BoardResult<TransitionPhase> {
        let current = self
            .in_flight
            .get(&ticket.task_id)
            .is_some_and(|entry| entry.seq == ticket.seq);
        let entry = current
            .then(|| self.in_flight.remove(&ticket.task_id))
            .flatten()
            .ok_or_else(|| BoardError::StaleTicket(ticket.task_id.clone()))?;

        self.forget_replaced(store);
        let removed = store.task(&ticket.task_id).is_none();
        let superseded = removed || store.generation() != entry.generation;

        match outcome {
            Ok(acknowledged) if superseded => {
                info!(status = %acknowledged.status, removed, "transition acknowledged after refresh; keeping fresher data");
                Ok(self.settle(ticket.task_id, TransitionPhase::Superseded))
            }
            Ok(acknowledged) => {
                let phase = if store.commit_task(acknowledged) {
                    debug!("transition committed");
                    TransitionPhase::Committed
                } else {
                    TransitionPhase::Superseded
                };
                Ok(self.settle(ticket.task_id, phase))
            }
            Err(err) => {
                let reason = describe(&err);
                if superseded {
                    warn!(%reason, removed, "transition rejected after refresh; nothing to roll back");
                    self.settle(ticket.task_id.clone(), TransitionPhase::Superseded);
                } else {
                    store.edit_task(&ticket.task_id, now, |task| {
                        task.status = entry.previous.clone();
                        task.pending = false;
                    });
                    warn!(%reason, previous = %entry.previous, "transition rejected; rolled back");
                    self.settle(ticket.task_id.clone(), TransitionPhase::RolledBack);
                }
                Err(BoardError::TransitionFailure {
                    task_id: ticket.task_id,
                    reason,
                })
            }
        }
    }

    fn settle(&mut self, task_id: String, phase: TransitionPhase) -> TransitionPhase {
        self.settled.insert(task_id, phase);
        phase
    }

    pub fn clear(&mut self) {
        self.in_flight.clear();
        self.settled.clear();
    }
}

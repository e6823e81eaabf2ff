use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_channel::{Receiver, Sender};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::entities::{QuoteEvent, QuoteState};
use crate::error::{invalid_input_error, Error};

/// One ride selection session: the observable quote state, its one-shot
/// events and the task currently filling it in.
///
/// Every run of the quote flow gets a generation number. Commits are checked
/// against the current generation and the closed flag while the state
/// channel is locked, so an aborted or replaced run can't write anything.
pub struct QuoteSession {
    pub token: Uuid,
    state: watch::Sender<QuoteState>,
    events_tx: Sender<QuoteEvent>,
    events_rx: Receiver<QuoteEvent>,
    generation: AtomicU64,
    closed: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl QuoteSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(QuoteState::new());
        let (events_tx, events_rx) = async_channel::unbounded();

        Self {
            token: Uuid::new_v4(),
            state,
            events_tx,
            events_rx,
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> QuoteState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteState> {
        self.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Invalidates every commit of the running flow and returns the
    /// generation of the next one.
    pub(super) fn next_generation(&self) -> u64 {
        let mut generation = 0;

        self.state.send_if_modified(|_| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            false
        });

        generation
    }

    /// Replaces the running flow. The generation bump, the abort of the old
    /// task and the install of the one `start` spawns happen under the task
    /// lock, so concurrent restarts can't abort each other's current task.
    pub fn restart<F>(&self, start: F)
    where
        F: FnOnce(u64) -> Option<JoinHandle<()>>,
    {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        let generation = self.next_generation();

        if let Some(previous) = task.take() {
            previous.abort();
        }

        *task = start(generation);
    }

    /// Whether nothing is in flight and the state hasn't changed for `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let state = self.state.borrow();

        !state.is_loading() && now - state.updated_at > ttl
    }

    /// Applies `update` if `generation` is still current. Returns whether
    /// the state changed.
    pub fn commit<F>(&self, generation: u64, update: F) -> bool
    where
        F: FnOnce(&mut QuoteState) -> Result<(), Error>,
    {
        self.state.send_if_modified(|state| {
            if self.is_closed() || self.generation.load(Ordering::SeqCst) != generation {
                tracing::debug!("dropping commit of stale generation {}", generation);
                return false;
            }

            match update(state) {
                Ok(()) => {
                    tracing::debug!(
                        phase = %state.phase.name(),
                        "committed generation {}",
                        generation
                    );
                    true
                }
                Err(err) => {
                    tracing::warn!("rejected quote transition: {}", err);
                    false
                }
            }
        })
    }

    /// Applies a user action regardless of which run is in flight.
    pub fn apply<F>(&self, action: F) -> Result<QuoteState, Error>
    where
        F: FnOnce(&mut QuoteState) -> Result<(), Error>,
    {
        let mut result = Err(invalid_input_error());

        self.state.send_if_modified(|state| {
            if self.is_closed() {
                return false;
            }

            result = action(state);
            result.is_ok()
        });

        result.map(|_| self.state())
    }

    pub fn emit(&self, event: QuoteEvent) {
        if self.events_tx.try_send(event).is_err() {
            tracing::debug!("event queue closed, dropping event");
        }
    }

    /// Drains the pending events. Each event is handed out exactly once.
    pub fn take_events(&self) -> Vec<QuoteEvent> {
        let mut events = vec![];

        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }

        events
    }

    fn abort_task(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = task.take() {
            handle.abort();
        }
    }

    /// Tears the session down. In-flight calls are aborted and nothing they
    /// return is committed.
    pub fn close(&self) {
        self.state.send_if_modified(|_| {
            self.closed.store(true, Ordering::SeqCst);
            false
        });

        self.abort_task();
        self.events_tx.close();
    }
}

impl Default for QuoteSession {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn stale_generation_is_dropped() {
    let session = QuoteSession::new();

    let first = session.next_generation();
    assert!(session.commit(first, |state| {
        state.begin();
        Ok(())
    }));

    let second = session.next_generation();
    assert!(!session.commit(first, |state| {
        state.fail("stale".into());
        Ok(())
    }));
    assert!(session.state().error().is_none());

    assert!(session.commit(second, |state| {
        state.fail("current".into());
        Ok(())
    }));
    assert_eq!(session.state().error(), Some("current"));
}

#[test]
fn closed_session_rejects_everything() {
    let session = QuoteSession::new();
    let generation = session.next_generation();

    session.close();

    assert!(session.is_closed());
    assert!(!session.commit(generation, |state| {
        state.begin();
        Ok(())
    }));
    assert!(session.apply(|state| state.dismiss_error()).is_err());

    session.emit(QuoteEvent::Failed {
        message: "late".into(),
    });
    assert!(session.take_events().is_empty());
}

#[test]
fn events_are_consumed_once() {
    let session = QuoteSession::new();

    session.emit(QuoteEvent::Failed {
        message: "location not found".into(),
    });

    assert_eq!(
        session.take_events(),
        vec![QuoteEvent::Failed {
            message: "location not found".into()
        }]
    );
    assert!(session.take_events().is_empty());
}

#[test]
fn rejected_transition_leaves_state_alone() {
    let session = QuoteSession::new();
    let generation = session.next_generation();
    let rx = session.subscribe();

    assert!(!session.commit(generation, |state| state.dismiss_error()));
    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn restart_replaces_running_task() {
    let session = QuoteSession::new();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    session.restart(|_| {
        Some(tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            let _ = tx.send(());
        }))
    });

    let mut generation = 0;
    session.restart(|next| {
        generation = next;
        None
    });

    // the sender is dropped with the aborted task
    assert!(rx.await.is_err());
    assert_eq!(generation, 2);
    assert!(session.commit(generation, |state| {
        state.begin();
        Ok(())
    }));
}

#[test]
fn only_idle_sessions_expire() {
    let session = QuoteSession::new();
    let later = Utc::now() + Duration::hours(1);

    assert!(session.is_expired(later, Duration::minutes(30)));
    assert!(!session.is_expired(Utc::now(), Duration::minutes(30)));

    let generation = session.next_generation();
    session.commit(generation, |state| {
        state.begin();
        Ok(())
    });
    assert!(!session.is_expired(later, Duration::minutes(30)));
}

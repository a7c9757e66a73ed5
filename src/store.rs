use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use log::debug;
use thiserror::Error;

use crate::session::Session;
use crate::timer::TickTimer;

/// Wall-clock interval between duration recomputations
pub const DURATION_TICK: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum StoreError {
    /// Rejected before any mutation; the shared state is left unchanged
    #[error("invalid session: {reason}")]
    InvalidSession { reason: String },
    /// The host could not schedule the repeating tick. The session stays
    /// active, but the duration stops advancing until the timer is retried.
    #[error("could not schedule the duration timer: {0}")]
    TimerUnavailable(#[source] std::io::Error),
}

/// The single mutable record observers see, always as a whole snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub is_active: bool,
    pub last_session: Option<Session>,
    /// Live elapsed milliseconds while active; frozen (not reset) once stopped
    pub current_duration_ms: i64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_active: false,
            last_session: None,
            current_duration_ms: 0,
        }
    }
}

/// Handle returned by [`SessionStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Arc<dyn Fn(SessionState) + Send + Sync>;

struct Inner {
    state: SessionState,
    subscribers: Vec<(SubscriberId, Callback)>,
    next_subscriber: u64,
    timer: Option<TickTimer>,
    // Bumped on every timer start/stop; a tick from a stale generation is
    // dead and must not touch the state.
    timer_generation: u64,
}

/// Session lifecycle container.
///
/// Holds whether a session is running, the most recently known session, and a
/// live elapsed-duration counter refreshed once per tick interval while
/// active. All mutation goes through the operations below; every one of them
/// publishes the whole new state to subscribers. Create one per application
/// and pass clones of the handle around.
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
    tick_interval: Duration,
}

impl Clone for SessionStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            tick_interval: self.tick_interval,
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_tick_interval(DURATION_TICK)
    }

    /// Same container with a custom tick interval; tests use a fast one
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::default(),
                subscribers: Vec::new(),
                next_subscriber: 0,
                timer: None,
                timer_generation: 0,
            })),
            tick_interval,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock still holds a coherent record; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state as an atomic whole-record copy
    pub fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    /// Register an observer. It receives the current snapshot immediately,
    /// then every subsequent one until unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(SessionState) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let (id, snapshot) = {
            let mut inner = self.lock();
            let id = SubscriberId(inner.next_subscriber);
            inner.next_subscriber += 1;
            inner.subscribers.push((id, Arc::clone(&callback)));
            (id, inner.state.clone())
        };
        callback(snapshot);
        id
    }

    /// Stop notifications to one observer; others and the timer are unaffected
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.lock().subscribers.retain(|(sid, _)| *sid != id);
    }

    /// Make `session` the running session and start the duration timer.
    /// Replaces any previous session wholesale.
    pub fn set_active_session(&self, session: Session) -> Result<(), StoreError> {
        validate(&session)?;
        debug!("activating session {}", session.id);

        let (pending, timer_result) = {
            let mut inner = self.lock();
            inner.state.last_session = Some(session);
            inner.state.is_active = true;
            let timer_result = self.start_timer_locked(&mut inner);
            (pending_notify(&inner), timer_result)
        };
        dispatch(pending);
        timer_result
    }

    /// Mark the session stopped. `last_session` and the duration keep their
    /// last values; nothing is cleared.
    pub fn stop_active_session(&self) {
        debug!("stopping active session");
        let pending = {
            let mut inner = self.lock();
            inner.state.is_active = false;
            stop_timer_locked(&mut inner);
            pending_notify(&inner)
        };
        dispatch(pending);
    }

    /// Replace `last_session` only, e.g. to attach markers or an end time.
    /// Does not touch `is_active` or the timer.
    pub fn set_last_session(&self, session: Session) -> Result<(), StoreError> {
        validate(&session)?;

        let pending = {
            let mut inner = self.lock();
            inner.state.last_session = Some(session);
            pending_notify(&inner)
        };
        dispatch(pending);
        Ok(())
    }

    /// Stop the timer and restore the exact initial state
    pub fn reset(&self) {
        debug!("resetting session state");
        let pending = {
            let mut inner = self.lock();
            stop_timer_locked(&mut inner);
            inner.state = SessionState::default();
            pending_notify(&inner)
        };
        dispatch(pending);
    }

    /// (Re)start the repeating duration tick, cancelling any previous one
    /// first; at most one timer is ever live per store.
    pub fn start_session_timer(&self) -> Result<(), StoreError> {
        let mut inner = self.lock();
        self.start_timer_locked(&mut inner)
    }

    /// Cancel the scheduled tick if one exists; safe to call when none is
    /// running
    pub fn stop_session_timer(&self) {
        let mut inner = self.lock();
        stop_timer_locked(&mut inner);
    }

    fn start_timer_locked(&self, inner: &mut Inner) -> Result<(), StoreError> {
        inner.timer_generation += 1;
        let generation = inner.timer_generation;
        if let Some(previous) = inner.timer.take() {
            previous.cancel();
        }

        let weak = Arc::downgrade(&self.inner);
        let timer = TickTimer::spawn(self.tick_interval, move || on_tick(&weak, generation))
            .map_err(StoreError::TimerUnavailable)?;
        inner.timer = Some(timer);
        debug!("duration timer started (generation {})", generation);
        Ok(())
    }
}

fn stop_timer_locked(inner: &mut Inner) {
    inner.timer_generation += 1;
    if let Some(timer) = inner.timer.take() {
        timer.cancel();
        debug!("duration timer stopped");
    }
}

/// One duration recomputation. A no-op cycle while inactive or without a
/// session; a break once the store is gone or the timer was superseded.
fn on_tick(weak: &Weak<Mutex<Inner>>, generation: u64) -> ControlFlow<()> {
    let Some(inner) = weak.upgrade() else {
        return ControlFlow::Break(());
    };

    let pending = {
        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.timer_generation != generation {
            return ControlFlow::Break(());
        }
        if !inner.state.is_active {
            return ControlFlow::Continue(());
        }
        let elapsed = match inner.state.last_session.as_ref() {
            Some(session) => session.elapsed_ms_at(Utc::now()),
            None => return ControlFlow::Continue(()),
        };
        inner.state.current_duration_ms = elapsed;
        pending_notify(&inner)
    };
    dispatch(pending);
    ControlFlow::Continue(())
}

fn validate(session: &Session) -> Result<(), StoreError> {
    if session.id.trim().is_empty() {
        return Err(StoreError::InvalidSession {
            reason: "empty session id".to_string(),
        });
    }
    if let Some(end_time) = session.end_time {
        if end_time < session.start_time {
            return Err(StoreError::InvalidSession {
                reason: "end_time precedes start_time".to_string(),
            });
        }
    }
    Ok(())
}

fn pending_notify(inner: &Inner) -> (SessionState, Vec<Callback>) {
    let callbacks = inner
        .subscribers
        .iter()
        .map(|(_, cb)| Arc::clone(cb))
        .collect();
    (inner.state.clone(), callbacks)
}

// Callbacks run outside the state lock so an observer may call back into the
// store without deadlocking.
fn dispatch(pending: (SessionState, Vec<Callback>)) {
    let (snapshot, callbacks) = pending;
    for callback in callbacks {
        callback(snapshot.clone());
    }
}

//! Session Store - the only owner of session state
//!
//! All mutations are [`SessionAction`]s run through [`reduce`]. Refresh
//! passes hold a [`RefreshTicket`] taken when they started; actions carrying
//! a ticket are rejected once a logout or a newer pass has happened since.
//! That check happens under the same lock as the write, so a stale pass can
//! never overwrite a newer outcome.
//!
//! Only the most recent invalidation counts: a pass overtaken by a logout
//! and then by a newer pass is superseded by that pass, not by the logout.

use parking_lot::Mutex;
use tracing::debug;

use crate::domain::{AccountProfile, SessionPhase, SessionSnapshot, ShellEvent, UsageSnapshot};
use crate::event_bus::EventSender;

/// Proof that a refresh pass started at a given point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

impl RefreshTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Why a ticket is no longer allowed to commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Current,
    SupersededByLogout,
    SupersededByRefresh,
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    BeginRefresh,
    CommitUser {
        ticket: RefreshTicket,
        user: AccountProfile,
    },
    CommitUsage {
        ticket: RefreshTicket,
        usage: UsageSnapshot,
    },
    CompleteSync {
        ticket: RefreshTicket,
    },
    /// Pass ended without a user (no token, fetch failed)
    Reset {
        ticket: RefreshTicket,
    },
    Logout,
}

/// Result of reducing one action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed,
    Unchanged,
    Started(RefreshTicket),
    Rejected(Staleness),
}

#[derive(Debug, Default, Clone)]
pub struct SessionState {
    snapshot: SessionSnapshot,
    /// Generation set by the most recent logout
    logout_generation: u64,
}

impl SessionState {
    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn staleness(&self, ticket: &RefreshTicket) -> Staleness {
        if ticket.generation == self.snapshot.generation {
            Staleness::Current
        } else if self.snapshot.generation == self.logout_generation {
            // nothing has started since the logout
            Staleness::SupersededByLogout
        } else {
            Staleness::SupersededByRefresh
        }
    }
}

/// Pure transition function
pub fn reduce(state: &mut SessionState, action: SessionAction) -> Transition {
    macro_rules! require_current {
        ($ticket:expr) => {
            match state.staleness(&$ticket) {
                Staleness::Current => {}
                stale => return Transition::Rejected(stale),
            }
        };
    }

    match action {
        SessionAction::BeginRefresh => Transition::Started(begin(state)),
        SessionAction::CommitUser { ticket, user } => {
            require_current!(ticket);
            let s = &mut state.snapshot;
            if s.user.as_ref().map(|u| &u.id) != Some(&user.id) {
                s.usage = None;
            }
            s.user = Some(user);
            s.phase = SessionPhase::Syncing;
            Transition::Changed
        }
        SessionAction::CommitUsage { ticket, usage } => {
            require_current!(ticket);
            let s = &mut state.snapshot;
            if s.user.is_none() {
                return Transition::Unchanged;
            }
            s.usage = Some(usage);
            Transition::Changed
        }
        SessionAction::CompleteSync { ticket } => {
            require_current!(ticket);
            let s = &mut state.snapshot;
            if s.user.is_none() || s.phase == SessionPhase::LoggedIn {
                return Transition::Unchanged;
            }
            s.phase = SessionPhase::LoggedIn;
            Transition::Changed
        }
        SessionAction::Reset { ticket } => {
            require_current!(ticket);
            clear(&mut state.snapshot)
        }
        SessionAction::Logout => {
            state.snapshot.generation += 1;
            state.logout_generation = state.snapshot.generation;
            clear(&mut state.snapshot)
        }
    }
}

/// Start a refresh pass; every older ticket becomes stale
pub fn begin(state: &mut SessionState) -> RefreshTicket {
    state.snapshot.generation += 1;
    RefreshTicket {
        generation: state.snapshot.generation,
    }
}

fn clear(s: &mut SessionSnapshot) -> Transition {
    if s.user.is_none() && s.usage.is_none() && s.phase.is_logged_out() {
        return Transition::Unchanged;
    }
    s.user = None;
    s.usage = None;
    s.phase = SessionPhase::LoggedOut;
    Transition::Changed
}

/// Shared session store; publishes `SessionChanged` after every change
pub struct SessionStore {
    state: Mutex<SessionState>,
    events: EventSender,
}

impl SessionStore {
    pub fn new(events: EventSender) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            events,
        }
    }

    pub fn dispatch(&self, action: SessionAction) -> Transition {
        let (transition, published) = {
            let mut state = self.state.lock();
            let transition = reduce(&mut state, action);
            let published =
                (transition == Transition::Changed).then(|| state.snapshot.clone());
            (transition, published)
        };

        if let Some(session) = published {
            debug!(
                phase = session.phase.as_str(),
                generation = session.generation,
                "[SessionStore] Session changed"
            );
            self.events.emit(ShellEvent::SessionChanged { session });
        }
        transition
    }

    pub fn begin_refresh(&self) -> RefreshTicket {
        begin(&mut self.state.lock())
    }

    pub fn staleness(&self, ticket: &RefreshTicket) -> Staleness {
        self.state.lock().staleness(ticket)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn user(&self) -> Option<AccountProfile> {
        self.state.lock().snapshot.user.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().snapshot.phase
    }
}

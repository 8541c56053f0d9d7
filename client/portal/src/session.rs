//! One page session: the cached scholarship list, the viewer's eligibility
//! profile and their applied-to set, plus the optimistic bookmark protocol.
//!
//! ## Bookmark toggles
//!
//! A toggle snapshots the current flag, writes the flipped value into the
//! cached list, then calls the backend. Success replaces the record with the
//! server's copy; failure restores the last confirmed flag and queues a
//! [`Notice`]. Every toggle takes a ticket for its scholarship and only the
//! latest ticket settles the cached record, so a slow response can never
//! overwrite a newer one.
//!
//! While toggles overlap, the session remembers the flag from before the
//! first of them (the baseline) and moves it forward whenever any of them
//! succeeds. A failing latest toggle restores the baseline, so the list never
//! shows a value no request produced. An older toggle that fails still queues
//! its notice; one that succeeds after the latest has failed is applied.
//!
//! The state lock is never held across a backend call.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::client::ScholarshipApi;
use crate::eligibility::{compute_available, compute_eligible};
use crate::errors::{PortalError, Result};
use crate::filters::{apply_filters, derive_filter_options, saved_only, FilterOptions, FilterState};
use crate::models::{Scholarship, UserEligibility};
use crate::sort::{sort_scholarships, SortKey};
use crate::store::{auth_token, KeyValueStore};

const BOOKMARK_FAILURE: &str = "Error: Failed to update bookmark status";

/// A user-visible message produced by a failed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub scholarship_id: i64,
    pub message: String,
}

/// How a bookmark toggle settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BookmarkOutcome {
    /// The backend accepted the change; its representation is now cached.
    Committed { scholarship: Scholarship },
    /// The backend call failed and the flag was restored to `restored`.
    RolledBack {
        id: i64,
        restored: bool,
        reason: String,
    },
    /// A newer toggle for the same scholarship was issued before this one
    /// settled; this response was discarded.
    Superseded { id: i64 },
    UnknownScholarship { id: i64 },
}

#[derive(Debug, Default)]
struct SessionState {
    scholarships: Vec<Scholarship>,
    user: UserEligibility,
    applied: HashSet<i64>,
    load_error: Option<String>,
    next_ticket: u64,
    pending: HashMap<i64, PendingToggles>,
    notices: Vec<Notice>,
}

/// In-flight toggles for one scholarship.
#[derive(Debug)]
struct PendingToggles {
    latest: u64,
    /// Last flag the backend confirmed, or the flag before the first
    /// outstanding toggle.
    baseline: bool,
    outstanding: usize,
    latest_failed: bool,
}

enum Settlement {
    Commit(Scholarship),
    Rollback { restored: bool, reason: String },
    /// An older toggle that succeeded after the latest one had failed.
    LateCommit(Scholarship),
    Stale,
    StaleFailure(String),
}

impl SessionState {
    /// Replace the record with `id`, leaving every other record untouched.
    fn replace(&mut self, id: i64, f: impl FnOnce(&Scholarship) -> Scholarship) {
        if let Some(slot) = self.scholarships.iter_mut().find(|s| s.id == id) {
            *slot = f(slot);
        }
    }

    fn loaded(&self) -> Result<&Self> {
        match &self.load_error {
            Some(err) => Err(PortalError::NotLoaded(err.clone())),
            None => Ok(self),
        }
    }
}

struct Loaded {
    scholarships: Vec<Scholarship>,
    user: UserEligibility,
    applied: HashSet<i64>,
}

pub struct Session<A, S> {
    api: A,
    store: S,
    state: Mutex<SessionState>,
}

impl<A: ScholarshipApi, S: KeyValueStore> Session<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Session {
            api,
            store,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the profile, scholarship list and applications.
    ///
    /// On failure the session keeps the error and every data view answers
    /// [`PortalError::NotLoaded`] until a later load succeeds.
    pub async fn load(&self) -> Result<()> {
        let fetched = self.fetch().await;
        let mut state = self.state.lock().await;
        match fetched {
            Ok(loaded) => {
                info!(
                    "Session loaded: {} scholarships, {} applied",
                    loaded.scholarships.len(),
                    loaded.applied.len()
                );
                state.scholarships = loaded.scholarships;
                state.user = loaded.user;
                state.applied = loaded.applied;
                state.load_error = None;
                Ok(())
            }
            Err(e) => {
                error!("Session load failed: {e}");
                state.load_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch(&self) -> Result<Loaded> {
        let token = auth_token(&self.store).await?;

        let user = match token.as_deref() {
            Some(token) => UserEligibility::from(&self.api.current_profile(token).await?),
            None => UserEligibility::default(),
        };

        let scholarships = self.api.list_scholarships(token.as_deref()).await?;

        let applied = match token.as_deref() {
            Some(token) if user.id != 0 => match self.api.applications_for(user.id, token).await {
                Ok(applications) => applications.iter().map(|a| a.scholarship).collect(),
                Err(e) => {
                    warn!("Could not load applications, assuming none: {e}");
                    HashSet::new()
                }
            },
            _ => HashSet::new(),
        };

        Ok(Loaded {
            scholarships,
            user,
            applied,
        })
    }

    // ─────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────

    pub async fn user(&self) -> UserEligibility {
        self.state.lock().await.user.clone()
    }

    pub async fn scholarships(&self) -> Result<Vec<Scholarship>> {
        Ok(self.state.lock().await.loaded()?.scholarships.clone())
    }

    /// Every scholarship passing `filter`.
    pub async fn browse(
        &self,
        filter: &FilterState,
        sort: SortKey,
        now: DateTime<Utc>,
    ) -> Result<Vec<Scholarship>> {
        let state = self.state.lock().await;
        let mut list = apply_filters(&state.loaded()?.scholarships, filter, now);
        sort_scholarships(&mut list, sort);
        Ok(list)
    }

    /// Scholarships the viewer is eligible for and has not applied to,
    /// narrowed by `filter`.
    pub async fn matched(
        &self,
        filter: &FilterState,
        sort: SortKey,
        now: DateTime<Utc>,
    ) -> Result<Vec<Scholarship>> {
        let state = self.state.lock().await;
        let state = state.loaded()?;
        let eligible = compute_eligible(&state.scholarships, &state.user);
        let available = compute_available(&eligible, &state.applied);
        let mut list = apply_filters(&available, filter, now);
        sort_scholarships(&mut list, sort);
        Ok(list)
    }

    pub async fn saved(&self) -> Result<Vec<Scholarship>> {
        Ok(saved_only(&self.state.lock().await.loaded()?.scholarships))
    }

    pub async fn filter_options(&self) -> Result<FilterOptions> {
        Ok(derive_filter_options(
            &self.state.lock().await.loaded()?.scholarships,
        ))
    }

    /// Drain queued notices, oldest first.
    pub async fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.state.lock().await.notices)
    }

    // ─────────────────────────────────────────────────────
    // Bookmarks
    // ─────────────────────────────────────────────────────

    pub async fn toggle_bookmark(&self, id: i64) -> BookmarkOutcome {
        let (prior, ticket) = {
            let mut state = self.state.lock().await;
            let Some(prior) = state
                .scholarships
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.is_bookmarked)
            else {
                return BookmarkOutcome::UnknownScholarship { id };
            };

            state.replace(id, |s| Scholarship {
                is_bookmarked: !prior,
                ..s.clone()
            });
            state.next_ticket += 1;
            let ticket = state.next_ticket;
            let pending = state.pending.entry(id).or_insert(PendingToggles {
                latest: ticket,
                baseline: prior,
                outstanding: 0,
                latest_failed: false,
            });
            pending.latest = ticket;
            pending.outstanding += 1;
            pending.latest_failed = false;
            (prior, ticket)
        };

        let saved = !prior;
        let result = match auth_token(&self.store).await {
            Ok(token) => self.api.set_bookmark(id, saved, token.as_deref()).await,
            Err(e) => Err(e),
        };

        let mut state = self.state.lock().await;
        let settlement = {
            let pending = state.pending.entry(id).or_insert(PendingToggles {
                latest: ticket,
                baseline: prior,
                outstanding: 1,
                latest_failed: false,
            });
            pending.outstanding = pending.outstanding.saturating_sub(1);
            let is_latest = pending.latest == ticket;

            let settlement = match result {
                Ok(updated) => {
                    pending.baseline = updated.is_bookmarked;
                    if is_latest {
                        Settlement::Commit(updated)
                    } else if pending.latest_failed {
                        Settlement::LateCommit(updated)
                    } else {
                        Settlement::Stale
                    }
                }
                Err(e) if is_latest => {
                    pending.latest_failed = true;
                    Settlement::Rollback {
                        restored: pending.baseline,
                        reason: e.to_string(),
                    }
                }
                Err(e) => Settlement::StaleFailure(e.to_string()),
            };
            if pending.outstanding == 0 {
                state.pending.remove(&id);
            }
            settlement
        };

        match settlement {
            Settlement::Commit(updated) => {
                state.replace(id, |_| updated.clone());
                BookmarkOutcome::Committed {
                    scholarship: updated,
                }
            }
            Settlement::Rollback { restored, reason } => {
                warn!("Bookmark update for scholarship {id} failed, rolling back: {reason}");
                state.replace(id, |s| Scholarship {
                    is_bookmarked: restored,
                    ..s.clone()
                });
                state.notices.push(Notice {
                    scholarship_id: id,
                    message: BOOKMARK_FAILURE.to_string(),
                });
                BookmarkOutcome::RolledBack {
                    id,
                    restored,
                    reason,
                }
            }
            Settlement::LateCommit(updated) => {
                debug!("Applying late bookmark confirmation for scholarship {id} (ticket {ticket})");
                state.replace(id, |_| updated);
                BookmarkOutcome::Superseded { id }
            }
            Settlement::Stale => {
                debug!("Discarding stale bookmark response for scholarship {id} (ticket {ticket})");
                BookmarkOutcome::Superseded { id }
            }
            Settlement::StaleFailure(reason) => {
                warn!("Superseded bookmark update for scholarship {id} failed: {reason}");
                state.notices.push(Notice {
                    scholarship_id: id,
                    message: BOOKMARK_FAILURE.to_string(),
                });
                BookmarkOutcome::Superseded { id }
            }
        }
    }
}

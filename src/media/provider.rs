use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::engine::VideoProvider;
use crate::foundation::core::{ClockTime, State};
use crate::foundation::error::{DemuxError, DemuxResult};
use crate::host::DynamicPort;
use crate::media::decode::SharedChain;
use crate::media::manager::ManagerShared;

/// Identity of a provider, unique within one manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProviderId(pub u64);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "provider{}", self.0)
    }
}

/// Bookkeeping for one embedded video. Lives in the manager's table, guarded by its lock.
pub(crate) struct ProviderRecord {
    pub(crate) id: ProviderId,
    pub(crate) owner: String,
    pub(crate) chain: SharedChain,
    pub(crate) exposed: Arc<Mutex<Vec<Arc<DynamicPort>>>>,
    pub(crate) uri: Option<String>,
    /// State the document asked for.
    pub(crate) requested: State,
    /// State last applied to the chain. Never above the parent's state.
    pub(crate) applied: State,
    pub(crate) base_time: ClockTime,
    /// Running time reached when playback was last interrupted.
    pub(crate) pause_offset: Option<ClockTime>,
    pub(crate) in_error: bool,
    pub(crate) pending_async: u32,
}

impl ProviderRecord {
    pub(crate) fn new(id: ProviderId, owner: String, chain: SharedChain) -> Self {
        Self {
            id,
            owner,
            chain,
            exposed: Arc::new(Mutex::new(Vec::new())),
            uri: None,
            requested: State::Null,
            applied: State::Null,
            base_time: ClockTime::ZERO,
            pause_offset: None,
            in_error: false,
            pending_async: 0,
        }
    }

    pub(crate) fn snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            id: self.id,
            owner: self.owner.clone(),
            uri: self.uri.clone(),
            requested: self.requested,
            applied: self.applied,
            locked: self.applied < self.requested,
            in_error: self.in_error,
            pending_async: self.pending_async,
        }
    }
}

/// Point-in-time view of a provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSnapshot {
    /// Provider identity.
    pub id: ProviderId,
    /// Document element the provider plays for.
    pub owner: String,
    /// Last opened location.
    pub uri: Option<String>,
    /// State the document asked for.
    pub requested: State,
    /// State the chain was last set to.
    pub applied: State,
    /// Held below the requested state by the parent.
    pub locked: bool,
    /// Failed since the last open.
    pub in_error: bool,
    /// Asynchronous starts not yet matched by a completion.
    pub pending_async: u32,
}

/// The document's handle to a provider. Dropping it destroys the provider.
pub struct ProviderHandle {
    pub(crate) id: ProviderId,
    pub(crate) manager: Weak<ManagerShared>,
}

impl ProviderHandle {
    /// Provider identity.
    pub fn id(&self) -> ProviderId {
        self.id
    }

    fn manager(&self) -> DemuxResult<Arc<ManagerShared>> {
        self.manager
            .upgrade()
            .ok_or_else(|| DemuxError::provider(format!("{}: manager shut down", self.id)))
    }
}

impl VideoProvider for ProviderHandle {
    fn open(&mut self, uri: &str) -> DemuxResult<()> {
        self.manager()?.open(self.id, uri)
    }

    fn close(&mut self) {
        if let Ok(m) = self.manager() {
            m.request(self.id, State::Ready);
        }
    }

    fn play(&mut self) {
        if let Ok(m) = self.manager() {
            m.request(self.id, State::Playing);
        }
    }

    fn pause(&mut self) {
        if let Ok(m) = self.manager() {
            m.request(self.id, State::Paused);
        }
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        if let Some(m) = self.manager.upgrade() {
            m.destroy(self.id);
        }
    }
}

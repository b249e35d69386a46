use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dispatch::{ControlHandler, ControlMessage, DispatchSender};
use crate::engine::{VideoProvider, VideoProviderFactory};
use crate::foundation::core::{ClockTime, State, StateChange};
use crate::foundation::error::{DemuxError, DemuxResult};
use crate::host::{Clock, DynamicPort, FlowError, HostBus, HostMessage, PortHost};
use crate::media::decode::{
    ChainMessage, DecodeChain, DecodeChainFactory, PadData, PadEvents, PadInfo, SharedChain,
    StateChangeOutcome,
};
use crate::media::provider::{ProviderHandle, ProviderId, ProviderRecord, ProviderSnapshot};
use crate::media::target::BlendTarget;

fn lock<T: ?Sized>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct ProviderTable {
    parent: State,
    next_id: u64,
    records: BTreeMap<ProviderId, ProviderRecord>,
}

/// A chain state change, planned and applied under the provider's chain lock.
struct Transition {
    id: ProviderId,
    to: State,
    base_time: Option<ClockTime>,
}

fn plan(rec: &mut ProviderRecord, parent: State, now: ClockTime) -> Option<Transition> {
    let to = rec.requested.min(parent);
    if to == rec.applied {
        return None;
    }
    if rec.applied == State::Playing {
        rec.pause_offset = Some(now - rec.base_time);
    }
    let base_time = (to == State::Playing).then(|| {
        rec.base_time = match rec.pause_offset.take() {
            Some(offset) => now - offset,
            None => now,
        };
        rec.base_time
    });
    rec.applied = to;
    Some(Transition {
        id: rec.id,
        to,
        base_time,
    })
}

pub(crate) struct ManagerShared {
    element: String,
    table: Mutex<ProviderTable>,
    decoders: Arc<dyn DecodeChainFactory>,
    ports: Arc<dyn PortHost>,
    bus: Arc<dyn HostBus>,
    clock: Arc<dyn Clock>,
    control: DispatchSender,
}

impl ManagerShared {
    fn table(&self) -> MutexGuard<'_, ProviderTable> {
        lock(&self.table)
    }

    fn chain_of(&self, id: ProviderId) -> Option<SharedChain> {
        self.table().records.get(&id).map(|rec| rec.chain.clone())
    }

    fn instantiate(
        self: &Arc<Self>,
        target: Arc<BlendTarget>,
        owner: &str,
    ) -> DemuxResult<ProviderHandle> {
        let id = {
            let mut t = self.table();
            t.next_id += 1;
            ProviderId(t.next_id)
        };
        let exposed = Arc::new(Mutex::new(Vec::new()));
        let events = self.pad_events(id, target, exposed.clone());
        let chain = self
            .decoders
            .create(&id.to_string(), events)
            .inspect_err(|err| {
                tracing::error!(%id, owner, error = %err, "media provider creation failed")
            })?;

        let mut rec = ProviderRecord::new(id, owner.to_owned(), Arc::new(Mutex::new(chain)));
        rec.exposed = exposed;
        self.table().records.insert(id, rec);
        tracing::debug!(%id, owner, "media provider created");
        Ok(ProviderHandle {
            id,
            manager: Arc::downgrade(self),
        })
    }

    fn pad_events(
        &self,
        id: ProviderId,
        target: Arc<BlendTarget>,
        exposed: Arc<Mutex<Vec<Arc<DynamicPort>>>>,
    ) -> PadEvents {
        let added_ports = self.ports.clone();
        let added_exposed = exposed.clone();
        let removed_ports = self.ports.clone();
        let removed_exposed = exposed.clone();
        let finished_ports = self.ports.clone();
        let control = self.control.clone();

        PadEvents {
            pad_added: Box::new(move |pad: &PadInfo| {
                if pad.is_video() {
                    tracing::debug!(%id, pad = %pad.name, "video pad routed to blend target");
                    return;
                }
                let port = Arc::new(DynamicPort::new(
                    format!("{id}_{}", pad.name),
                    pad.media_type.clone(),
                ));
                lock(&added_exposed).push(port.clone());
                tracing::debug!(%id, port = port.name(), "exposing dynamic port");
                added_ports.port_added(port);
            }),
            pad_removed: Box::new(move |pad: &PadInfo| {
                let name = format!("{id}_{}", pad.name);
                let mut ports = lock(&removed_exposed);
                let before = ports.len();
                ports.retain(|p| p.name() != name);
                if ports.len() != before {
                    drop(ports);
                    removed_ports.port_removed(&name);
                }
            }),
            no_more_pads: Box::new(move || finished_ports.no_more_ports(&id.to_string())),
            data: Box::new(move |pad: &PadInfo, data: PadData| match data {
                PadData::Video(frame) => {
                    target.show(frame);
                    Ok(())
                }
                PadData::Raw(chunk) => {
                    let name = format!("{id}_{}", pad.name);
                    let port = lock(&exposed).iter().find(|p| p.name() == name).cloned();
                    let res = match port {
                        Some(port) => port.push(chunk),
                        None => Err(FlowError::NotLinked),
                    };
                    match res {
                        Err(FlowError::NotLinked) => {
                            tracing::trace!(port = %name, "dropping chunk on unlinked port");
                            Ok(())
                        }
                        other => other,
                    }
                }
            }),
            message: Box::new(move |msg: ChainMessage| {
                control.send(match msg {
                    ChainMessage::Error(reason) => ControlMessage::Error {
                        provider: id,
                        reason,
                    },
                    ChainMessage::AsyncStart => ControlMessage::AsyncStart { provider: id },
                    ChainMessage::AsyncDone => ControlMessage::AsyncDone { provider: id },
                })
            }),
        }
    }

    /// Push `t` into the chain. The caller holds the chain lock it planned under.
    fn apply(&self, chain: &mut dyn DecodeChain, t: Transition) {
        if let Some(base) = t.base_time {
            chain.set_base_time(base);
        }
        match chain.set_state(t.to) {
            Ok(StateChangeOutcome::Success) => {
                tracing::trace!(id = %t.id, state = ?t.to, "provider state applied")
            }
            Ok(StateChangeOutcome::Async) => {
                tracing::debug!(id = %t.id, state = ?t.to, "provider state change pending")
            }
            Err(err) => {
                tracing::warn!(
                    id = %t.id,
                    state = ?t.to,
                    error = %err,
                    "provider state change failed"
                );
                self.control.send(ControlMessage::Error {
                    provider: t.id,
                    reason: err.to_string(),
                });
            }
        }
    }

    pub(crate) fn open(&self, id: ProviderId, uri: &str) -> DemuxResult<()> {
        let chain = self
            .chain_of(id)
            .ok_or_else(|| DemuxError::provider(format!("{id}: unknown provider")))?;
        {
            let mut chain = lock(&chain);
            let reset = {
                let mut t = self.table();
                let rec = t
                    .records
                    .get_mut(&id)
                    .ok_or_else(|| DemuxError::provider(format!("{id}: unknown provider")))?;
                let reset = rec.in_error || rec.applied > State::Null;
                rec.in_error = false;
                rec.pending_async = 0;
                rec.pause_offset = None;
                rec.uri = Some(uri.to_owned());
                rec.requested = State::Null;
                if reset {
                    rec.applied = State::Null;
                }
                reset
            };
            if reset {
                chain.set_state(State::Null)?;
            }
            chain.set_uri(uri)?;
        }
        tracing::debug!(%id, uri, "media provider opened");
        self.request(id, State::Ready);
        Ok(())
    }

    pub(crate) fn request(&self, id: ProviderId, state: State) {
        let Some(chain) = self.chain_of(id) else {
            tracing::debug!(%id, "request for unknown provider");
            return;
        };
        let mut chain = lock(&chain);
        let now = self.clock.now();
        let transition = {
            let mut t = self.table();
            let parent = t.parent;
            let Some(rec) = t.records.get_mut(&id) else {
                tracing::debug!(%id, "provider destroyed before request");
                return;
            };
            if rec.in_error && state > State::Ready {
                tracing::debug!(%id, ?state, "provider in error, reopen required");
                return;
            }
            rec.requested = state;
            let transition = plan(rec, parent, now);
            if state <= State::Ready {
                rec.pause_offset = None;
            }
            transition
        };
        if let Some(t) = transition {
            self.apply(&mut **chain, t);
        }
    }

    pub(crate) fn destroy(&self, id: ProviderId) {
        let rec = self.table().records.remove(&id);
        if let Some(rec) = rec {
            self.teardown(rec);
        }
    }

    fn teardown(&self, rec: ProviderRecord) {
        if let Err(err) = lock(&rec.chain).set_state(State::Null) {
            tracing::warn!(id = %rec.id, error = %err, "provider teardown failed");
        }
        let ports: Vec<_> = lock(&rec.exposed).drain(..).collect();
        for port in ports {
            self.ports.port_removed(port.name());
        }
        tracing::debug!(id = %rec.id, owner = %rec.owner, "media provider destroyed");
    }

    fn set_parent(&self, state: State) {
        let chains = {
            let mut t = self.table();
            t.parent = state;
            t.records
                .values()
                .map(|rec| (rec.id, rec.chain.clone()))
                .collect::<Vec<_>>()
        };
        for (id, chain) in chains {
            let mut chain = lock(&chain);
            let now = self.clock.now();
            let transition = {
                let mut t = self.table();
                let parent = t.parent;
                t.records
                    .get_mut(&id)
                    .and_then(|rec| plan(rec, parent, now))
            };
            if let Some(t) = transition {
                self.apply(&mut **chain, t);
            }
        }
    }

    fn fail(&self, provider: ProviderId, reason: String) {
        let Some(chain) = self.chain_of(provider) else {
            tracing::debug!(%provider, "error from unknown provider");
            return;
        };
        let mut chain = lock(&chain);
        let found = {
            let mut t = self.table();
            t.records.get_mut(&provider).map(|rec| {
                rec.in_error = true;
                rec.pause_offset = None;
                rec.requested = rec.requested.min(State::Ready);
                let pending = std::mem::take(&mut rec.pending_async);
                let downgrade = rec.applied > State::Ready;
                if downgrade {
                    rec.applied = State::Ready;
                }
                (pending, downgrade, rec.owner.clone())
            })
        };
        let Some((pending, downgrade, owner)) = found else {
            tracing::debug!(%provider, "error from destroyed provider");
            return;
        };
        tracing::warn!(%provider, %owner, %reason, "media provider failed, downgrading");
        if downgrade && let Err(err) = chain.set_state(State::Ready) {
            tracing::warn!(%provider, error = %err, "provider downgrade failed");
        }
        drop(chain);
        for _ in 0..pending {
            self.bus.post(HostMessage::AsyncDone {
                source: self.element.clone(),
            });
        }
        self.bus.post(HostMessage::Warning {
            source: format!("{}/{provider}", self.element),
            reason,
        });
    }
}

impl ControlHandler for ManagerShared {
    fn handle(&self, msg: ControlMessage) {
        match msg {
            ControlMessage::Error { provider, reason } => self.fail(provider, reason),
            ControlMessage::AsyncStart { provider } => {
                let known = match self.table().records.get_mut(&provider) {
                    Some(rec) => {
                        rec.pending_async += 1;
                        true
                    }
                    None => false,
                };
                if known {
                    self.bus.post(HostMessage::AsyncStart {
                        source: self.element.clone(),
                    });
                }
            }
            ControlMessage::AsyncDone { provider } => {
                let matched = match self.table().records.get_mut(&provider) {
                    Some(rec) if rec.pending_async > 0 => {
                        rec.pending_async -= 1;
                        true
                    }
                    _ => false,
                };
                if matched {
                    self.bus.post(HostMessage::AsyncDone {
                        source: self.element.clone(),
                    });
                }
            }
            ControlMessage::Shutdown => {}
        }
    }
}

/// Owns the embedded-video providers of the current document.
///
/// Providers never run ahead of the parent element: an upward parent transition raises them
/// before it completes, a downward one lowers them right after.
#[derive(Clone)]
pub struct MediaProviderManager {
    shared: Arc<ManagerShared>,
}

impl MediaProviderManager {
    /// Manager with no providers and a parent in `Null`.
    pub fn new(
        element: impl Into<String>,
        decoders: Arc<dyn DecodeChainFactory>,
        ports: Arc<dyn PortHost>,
        bus: Arc<dyn HostBus>,
        clock: Arc<dyn Clock>,
        control: DispatchSender,
    ) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                element: element.into(),
                table: Mutex::new(ProviderTable {
                    parent: State::Null,
                    next_id: 0,
                    records: BTreeMap::new(),
                }),
                decoders,
                ports,
                bus,
                clock,
                control,
            }),
        }
    }

    /// Call before the parent's own transition runs.
    pub fn parent_state_changing(&self, change: StateChange) {
        if change.is_upward() {
            self.shared.set_parent(change.next);
        }
    }

    /// Call after the parent's transition completed.
    pub fn parent_state_changed(&self, change: StateChange) {
        if !change.is_upward() {
            self.shared.set_parent(change.next);
        }
    }

    /// State of every live provider, ordered by id.
    pub fn snapshot(&self) -> Vec<ProviderSnapshot> {
        self.shared
            .table()
            .records
            .values()
            .map(ProviderRecord::snapshot)
            .collect()
    }

    /// Tear down every provider, chains first.
    pub fn destroy_all(&self) {
        let records = std::mem::take(&mut self.shared.table().records);
        for rec in records.into_values() {
            self.shared.teardown(rec);
        }
    }

    /// Handler for the dispatcher that serves this manager.
    pub fn control_handler(&self) -> Arc<dyn ControlHandler> {
        self.shared.clone()
    }
}

impl VideoProviderFactory for MediaProviderManager {
    fn create(&self, target: Arc<BlendTarget>, owner: &str) -> DemuxResult<Box<dyn VideoProvider>> {
        let handle = self.shared.instantiate(target, owner)?;
        Ok(Box::new(handle))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/manager.rs"]
mod tests;

//! Test doubles shared by the unit tests: a recording host, controllable
//! modules, components, requests and timers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};

use crate::core::Slot;
use crate::error::ModuleError;
use crate::events::{Event, EventKind};
use crate::host::{
    Abortable, Component, ComponentMeta, ComponentRef, Host, IntervalFn, Module, ModuleConfig,
    ModuleRef, RequestListener, RequestRef, TimeoutFn, TimerHandle, Timers,
};

/// Result a gated module's init resolves with.
pub(crate) type InitGate = oneshot::Sender<Result<(), ModuleError>>;

enum Behavior {
    Ok,
    Fail(String),
    FailBrokenDispose(String),
    Panic,
    Gated(Mutex<Option<oneshot::Receiver<Result<(), ModuleError>>>>),
}

/// Module whose init outcome is chosen by the test.
pub(crate) struct TestModule {
    id: String,
    behavior: Behavior,
    seen: Mutex<Vec<Value>>,
    disposed: AtomicUsize,
}

impl TestModule {
    fn build(id: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behavior,
            seen: Mutex::new(Vec::new()),
            disposed: AtomicUsize::new(0),
        })
    }

    /// Handle of a module that initializes successfully.
    pub(crate) fn ok(id: &str) -> ModuleRef {
        Self::build(id, Behavior::Ok)
    }

    pub(crate) fn succeeding(id: &str) -> Arc<Self> {
        Self::build(id, Behavior::Ok)
    }

    pub(crate) fn failing(id: &str, error: &str) -> Arc<Self> {
        Self::build(id, Behavior::Fail(error.to_string()))
    }

    /// Module whose init fails and whose `dispose` then panics.
    pub(crate) fn fragile(id: &str, error: &str) -> Arc<Self> {
        Self::build(id, Behavior::FailBrokenDispose(error.to_string()))
    }

    pub(crate) fn panicking(id: &str) -> Arc<Self> {
        Self::build(id, Behavior::Panic)
    }

    /// Module whose init waits until the returned gate is resolved.
    pub(crate) fn gated(id: &str) -> (Arc<Self>, InitGate) {
        let (tx, rx) = oneshot::channel();
        (Self::build(id, Behavior::Gated(Mutex::new(Some(rx)))), tx)
    }

    pub(crate) fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_data(&self) -> Vec<Value> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Module for TestModule {
    fn id(&self) -> &str {
        &self.id
    }

    async fn init(&self, data: Value) -> Result<(), ModuleError> {
        self.seen.lock().unwrap().push(data);
        match &self.behavior {
            Behavior::Ok => Ok(()),
            Behavior::Fail(error) | Behavior::FailBrokenDispose(error) => {
                Err(ModuleError::failed(error.clone()))
            }
            Behavior::Panic => panic!("init exploded"),
            Behavior::Gated(gate) => {
                let rx = gate.lock().unwrap().take();
                match rx {
                    Some(rx) => rx.await.unwrap_or(Err(ModuleError::Canceled)),
                    None => Ok(()),
                }
            }
        }
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        if matches!(self.behavior, Behavior::FailBrokenDispose(_)) {
            panic!("dispose exploded");
        }
    }
}

/// Component recording its listeners; tests emit through it.
#[derive(Default)]
pub(crate) struct TestComponent {
    listeners: Mutex<Vec<(String, RequestListener)>>,
}

impl TestComponent {
    /// Invokes every listener subscribed to `event`.
    pub(crate) fn emit(&self, event: &str, req: &RequestRef) {
        let matching: Vec<RequestListener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in matching {
            listener(Arc::clone(req));
        }
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl Component for TestComponent {
    fn on(&self, event: &str, listener: RequestListener) {
        self.listeners
            .lock()
            .unwrap()
            .push((event.to_string(), listener));
    }
}

/// Abortable request counting its aborts.
pub(crate) struct TestRequest {
    aborts: Arc<AtomicUsize>,
}

/// Observer side of a [`TestRequest`].
pub(crate) struct AbortCounter(Arc<AtomicUsize>);

impl TestRequest {
    pub(crate) fn new() -> (RequestRef, AbortCounter) {
        let aborts = Arc::new(AtomicUsize::new(0));
        let req: RequestRef = Arc::new(TestRequest {
            aborts: Arc::clone(&aborts),
        });
        (req, AbortCounter(aborts))
    }
}

impl Abortable for TestRequest {
    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

impl AbortCounter {
    pub(crate) fn aborts(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Host recording every call it receives.
#[derive(Default)]
pub(crate) struct FakeHost {
    queued: Mutex<VecDeque<Arc<TestModule>>>,
    built: Mutex<Vec<(ModuleConfig, ModuleRef)>>,
    abortable: Mutex<HashMap<String, String>>,
    created: Mutex<Vec<Arc<TestComponent>>>,
    required: Mutex<Vec<Arc<TestComponent>>>,
    calls: Mutex<Vec<String>>,
    slots: Mutex<Vec<Weak<Slot>>>,
    client: AtomicBool,
    seq: AtomicUsize,
}

impl FakeHost {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Next `load_module` returns `module` (FIFO); otherwise a succeeding module.
    pub(crate) fn queue(&self, module: Arc<TestModule>) {
        self.queued.lock().unwrap().push_back(module);
    }

    /// Declares `name` as a component emitting abortables through `event`.
    pub(crate) fn abortable_component(&self, name: &str, event: &str) {
        self.abortable
            .lock()
            .unwrap()
            .insert(name.to_string(), event.to_string());
    }

    pub(crate) fn set_client(&self, client: bool) {
        self.client.store(client, Ordering::SeqCst);
    }

    /// Configs passed to `load_module`, in call order.
    pub(crate) fn loads(&self) -> Vec<ModuleConfig> {
        self.built
            .lock()
            .unwrap()
            .iter()
            .map(|(cfg, _)| cfg.clone())
            .collect()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn created_components(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    /// Last component handed out by `new_component`.
    pub(crate) fn last_created(&self) -> Arc<TestComponent> {
        let created = self.created.lock().unwrap();
        Arc::clone(created.last().expect("a created component"))
    }

    /// Last component handed out by `require_component`.
    pub(crate) fn last_required(&self) -> Arc<TestComponent> {
        let required = self.required.lock().unwrap();
        Arc::clone(required.last().expect("a required component"))
    }

    pub(crate) fn registered_slots(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.upgrade().is_some())
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Host for FakeHost {
    fn load_module(&self, config: ModuleConfig) -> ModuleRef {
        let module: ModuleRef = match self.queued.lock().unwrap().pop_front() {
            Some(m) => m as ModuleRef,
            None => {
                let n = self.seq.fetch_add(1, Ordering::SeqCst);
                TestModule::ok(&format!("{}-{n}", config.kind))
            }
        };
        self.built
            .lock()
            .unwrap()
            .push((config, Arc::clone(&module)));
        module
    }

    fn load_component(&self, name: &str) -> ComponentMeta {
        match self.abortable.lock().unwrap().get(name) {
            Some(event) => ComponentMeta::abortable(event.clone()),
            None => ComponentMeta::default(),
        }
    }

    fn new_component(&self, name: &str, _args: &[Value]) -> ComponentRef {
        self.record(format!("new_component:{name}"));
        let component = Arc::new(TestComponent::default());
        self.created.lock().unwrap().push(Arc::clone(&component));
        component
    }

    fn require_component(&self, name: &str, _args: &[Value]) -> ComponentRef {
        self.record(format!("require_component:{name}"));
        let component = Arc::new(TestComponent::default());
        self.required.lock().unwrap().push(Arc::clone(&component));
        component
    }

    fn setup_slot(&self, slot: &Arc<Slot>) {
        self.slots.lock().unwrap().push(Arc::downgrade(slot));
    }

    fn child_module_by_id(&self, parent_id: &str, id: &str) -> Option<ModuleRef> {
        self.built
            .lock()
            .unwrap()
            .iter()
            .find(|(cfg, m)| cfg.parent_id.as_deref() == Some(parent_id) && m.id() == id)
            .map(|(_, m)| Arc::clone(m))
    }

    fn notify(&self, from: &str, message: &Value) {
        self.record(format!("notify:{from}:{message}"));
    }

    fn broadcast(&self, from: &str, message: &Value) {
        self.record(format!("broadcast:{from}:{message}"));
    }

    fn query_modules(&self, from: &str, selector: &str) -> Vec<ModuleRef> {
        self.record(format!("query:{from}:{selector}"));
        Vec::new()
    }

    fn closest_module(&self, from: &str, kind: &str) -> Option<ModuleRef> {
        self.record(format!("closest:{from}:{kind}"));
        None
    }

    fn rerender(&self, module_id: &str) {
        self.record(format!("rerender:{module_id}"));
    }

    fn bind_events(&self, module_id: &str) {
        self.record(format!("bind:{module_id}"));
    }

    fn unbind_events(&self, module_id: &str) {
        self.record(format!("unbind:{module_id}"));
    }

    fn is_client(&self) -> bool {
        self.client.load(Ordering::SeqCst)
    }

    fn unique_id(&self) -> String {
        format!("uid-{}", self.seq.fetch_add(1, Ordering::SeqCst))
    }
}

/// Timers that never fire; they only record scheduling and cancellation.
#[derive(Default)]
pub(crate) struct RecordingTimers {
    scheduled: Mutex<Vec<(TimerHandle, Duration)>>,
    cleared: Mutex<Vec<u64>>,
}

impl RecordingTimers {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn scheduled(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }

    pub(crate) fn cleared(&self) -> Vec<u64> {
        self.cleared.lock().unwrap().clone()
    }

    fn schedule(&self, delay: Duration) -> TimerHandle {
        let handle = TimerHandle::new();
        self.scheduled
            .lock()
            .unwrap()
            .push((handle.clone(), delay));
        handle
    }

    fn clear(&self, handle: &TimerHandle) {
        if !handle.is_cancelled() {
            self.cleared.lock().unwrap().push(handle.id());
        }
        handle.cancel();
    }
}

impl Timers for RecordingTimers {
    fn set_timeout(&self, _f: TimeoutFn, delay: Duration) -> Option<TimerHandle> {
        Some(self.schedule(delay))
    }

    fn clear_timeout(&self, handle: &TimerHandle) {
        self.clear(handle);
    }

    fn set_interval(&self, _f: IntervalFn, period: Duration) -> Option<TimerHandle> {
        Some(self.schedule(period))
    }

    fn clear_interval(&self, handle: &TimerHandle) {
        self.clear(handle);
    }
}

/// Yields to the runtime until `cond` holds (or gives up).
pub(crate) async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..1_000 {
        if cond() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    cond()
}

/// Kinds of every event already queued on `rx`.
pub(crate) fn drain_kinds(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        kinds.push(ev.kind);
    }
    kinds
}

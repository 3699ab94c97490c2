//! # Example: Widget Slot
//!
//! A page module owns a slot. It instantiates two `widget` children (the
//! registry promotes them to a sequence), starts a poll interval, a delayed
//! refresh and an abortable request, then dies. `release()` revokes everything
//! and a late `init` is silently discarded.
//!
//! ## Run
//! ```bash
//! cargo run --example widget_slot --features logging
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use slotkeeper::{
    Abortable, Component, ComponentMeta, ComponentRef, Host, LogWriter, Module, ModuleConfig,
    ModuleError, ModuleRef, RegistryEntry, RequestListener, RequestRef, Slot, Stage, Subscribe,
    DONE_EVENT,
};

struct Widget {
    id: String,
}

#[async_trait]
impl Module for Widget {
    fn id(&self) -> &str {
        &self.id
    }

    async fn init(&self, data: Value) -> Result<(), ModuleError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        match data.get("title") {
            Some(title) => {
                println!("[{}] init with title {title}", self.id);
                Ok(())
            }
            None => Err(ModuleError::failed("missing title")),
        }
    }

    fn dispose(&self) {
        println!("[{}] disposed", self.id);
    }
}

/// Fetch handle printing its own abort.
struct Fetch(&'static str);

impl Abortable for Fetch {
    fn abort(&self) {
        println!("[fetch {}] aborted", self.0);
    }
}

#[derive(Default)]
struct Api {
    listeners: Mutex<Vec<(String, RequestListener)>>,
}

impl Api {
    fn emit(&self, event: &str, req: &RequestRef) {
        let listeners: Vec<RequestListener> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for l in listeners {
            l(Arc::clone(req));
        }
    }
}

impl Component for Api {
    fn on(&self, event: &str, listener: RequestListener) {
        self.listeners.lock().unwrap().push((event.to_string(), listener));
    }
}

#[derive(Default)]
struct App {
    next: AtomicUsize,
    api: Arc<Api>,
}

impl Host for App {
    fn load_module(&self, config: ModuleConfig) -> ModuleRef {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Arc::new(Widget {
            id: format!("{}-{n}", config.kind),
        })
    }

    fn load_component(&self, name: &str) -> ComponentMeta {
        match name {
            "api" => ComponentMeta::abortable("request"),
            _ => ComponentMeta::default(),
        }
    }

    fn new_component(&self, _name: &str, _args: &[Value]) -> ComponentRef {
        self.api.clone()
    }

    fn require_component(&self, _name: &str, _args: &[Value]) -> ComponentRef {
        Arc::new(Api::default())
    }

    fn is_client(&self) -> bool {
        true
    }

    fn unique_id(&self) -> String {
        format!("uid-{}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
    let app = Arc::new(App::default());
    let slot: Arc<Slot> = Slot::builder(app.clone(), "page")
        .with_subscribers(subs)
        .build();
    slot.set_stage(Stage::Inited)?;

    // Two widgets of the same type: Single, then Many.
    for title in ["first", "second"] {
        let (tx, rx) = tokio::sync::oneshot::channel();
        slot.init(
            "widget",
            Some(json!({ "title": title })),
            Some(Box::new(move |outcome| {
                let _ = tx.send(outcome.is_ok());
            })),
        );
        rx.await?;
    }
    if let Some(RegistryEntry::Many(all)) = slot.modules().get("widget") {
        println!("[page] {} widgets registered", all.len());
    }

    // A widget without data fails and is disposed.
    slot.init("widget", None, None);

    let ticks = Arc::new(AtomicUsize::new(0));
    let t = Arc::clone(&ticks);
    slot.set_interval(
        move || {
            t.fetch_add(1, Ordering::Relaxed);
        },
        Duration::from_millis(50),
    );
    slot.set_timeout(|| println!("[page] refresh"), Duration::from_secs(10));

    // The host hands out its shared api client; the slot tracks its requests.
    slot.require_component("api", &[]);
    let done: RequestRef = Arc::new(Fetch("profile"));
    let pending: RequestRef = Arc::new(Fetch("feed"));
    app.api.emit("request", &done);
    app.api.emit("request", &pending);
    app.api.emit(DONE_EVENT, &done);

    let on_click = slot.if_alive(|x: u32| println!("[page] click {x}"));
    on_click(1);

    tokio::time::sleep(Duration::from_millis(180)).await;

    // Owner dies: the host kills the slot and releases its resources.
    slot.set_stage(Stage::Killed)?;
    slot.release();
    on_click(2);
    assert!(slot.init("widget", Some(json!({ "title": "late" })), None).is_none());

    println!("[page] interval ticked {} times", ticks.load(Ordering::Relaxed));
    slot.set_stage(Stage::Disposed)?;

    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

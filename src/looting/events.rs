use crate::models::lootability::GlowReason;
use crate::models::object_type::ObjectType;
use crate::models::reference::ObjectRef;
use crate::models::types::RefId;
use parking_lot::Mutex;

/// Side effects the core asks the presentation layer to carry out. The core decides, the
/// sink performs.
pub trait EventSink: Send + Sync {
    fn trigger_harvest(&self, target: &ObjectRef, object_type: ObjectType, count: u32, silent: bool, collectible: bool);
    fn trigger_mining(&self, target: &ObjectRef, notify: bool);
    fn trigger_glow(&self, target: RefId, seconds: u32, reason: GlowReason);
    fn trigger_container_animation(&self, target: RefId);
    fn trigger_theft_check(&self, target: &ObjectRef);
    fn trigger_get_producer_lootable(&self, target: &ObjectRef);
    /// Ask for added items and game time to be pushed back while the worker sleeps
    fn trigger_flush_added_items(&self);
    fn show_notification(&self, text: &str);
}

/// Sink that only logs. Used by the runner binary.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn trigger_harvest(&self, target: &ObjectRef, object_type: ObjectType, count: u32, silent: bool, collectible: bool) {
        tracing::info!(refr = %target.id, base = %target.base, %object_type, count, silent, collectible, "harvest");
    }

    fn trigger_mining(&self, target: &ObjectRef, notify: bool) {
        tracing::info!(refr = %target.id, notify, "mining");
    }

    fn trigger_glow(&self, target: RefId, seconds: u32, reason: GlowReason) {
        tracing::info!(refr = %target, seconds, ?reason, "glow");
    }

    fn trigger_container_animation(&self, target: RefId) {
        tracing::info!(refr = %target, "animate container");
    }

    fn trigger_theft_check(&self, target: &ObjectRef) {
        tracing::info!(refr = %target.id, "theft check");
    }

    fn trigger_get_producer_lootable(&self, target: &ObjectRef) {
        tracing::info!(refr = %target.id, base = %target.base, "resolve producer lootable");
    }

    fn trigger_flush_added_items(&self) {
        tracing::trace!("flush added items");
    }

    fn show_notification(&self, text: &str) {
        tracing::info!(text, "notification");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Harvest { target: RefId, object_type: ObjectType, count: u32, silent: bool, collectible: bool },
    Mining { target: RefId, notify: bool },
    Glow { target: RefId, seconds: u32, reason: GlowReason },
    Animate { target: RefId },
    TheftCheck { target: RefId },
    ProducerLookup { target: RefId },
    FlushAddedItems,
    Notification(String),
}

/// Keeps every emitted event in order. Backs tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn harvests(&self) -> usize {
        self.events.lock().iter().filter(|e| matches!(e, Event::Harvest { .. })).count()
    }

    pub fn glows(&self) -> Vec<(RefId, GlowReason)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Glow { target, reason, .. } => Some((*target, *reason)),
                _ => None,
            })
            .collect()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Notification(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, e: Event) {
        self.events.lock().push(e);
    }
}

impl EventSink for RecordingEventSink {
    fn trigger_harvest(&self, target: &ObjectRef, object_type: ObjectType, count: u32, silent: bool, collectible: bool) {
        self.push(Event::Harvest { target: target.id, object_type, count, silent, collectible });
    }

    fn trigger_mining(&self, target: &ObjectRef, notify: bool) {
        self.push(Event::Mining { target: target.id, notify });
    }

    fn trigger_glow(&self, target: RefId, seconds: u32, reason: GlowReason) {
        self.push(Event::Glow { target, seconds, reason });
    }

    fn trigger_container_animation(&self, target: RefId) {
        self.push(Event::Animate { target });
    }

    fn trigger_theft_check(&self, target: &ObjectRef) {
        self.push(Event::TheftCheck { target: target.id });
    }

    fn trigger_get_producer_lootable(&self, target: &ObjectRef) {
        self.push(Event::ProducerLookup { target: target.id });
    }

    fn trigger_flush_added_items(&self) {
        self.push(Event::FlushAddedItems);
    }

    fn show_notification(&self, text: &str) {
        self.push(Event::Notification(text.to_string()));
    }
}

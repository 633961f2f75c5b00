//! Reader events and their fan-out to listeners

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::error::ReaderError;

/// Everything a reader reports, in the order it happens
#[derive(Debug, Clone)]
pub enum ReaderEvent {
    /// The source is open and reading will begin
    Open,
    /// The source failed to open or read
    Error(Arc<ReaderError>),
    /// One line, terminator removed
    Line(String),
    /// No more lines will ever be emitted
    End,
}

/// Receiving end of [`LineReader::subscribe`](crate::LineReader::subscribe).
///
/// Delivery is demand-driven. The reader hands over an event only while
/// [`recv`](Self::recv) is waiting for one, so a subscriber that pauses the
/// reader before asking for the next event never sees another line until it
/// resumes. Events are never queued ahead of the consumer.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<ReaderEvent>,
    demand: Arc<Semaphore>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the reader is gone.
    pub async fn recv(&mut self) -> Option<ReaderEvent> {
        self.demand.add_permits(1);
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Wakes a reader waiting for demand that will never come
        self.demand.close();
    }
}

/// Reader side of a [`Subscription`]
#[derive(Debug)]
struct Subscriber {
    tx: mpsc::Sender<ReaderEvent>,
    demand: Arc<Semaphore>,
    /// Demand taken but not yet answered with an event
    primed: bool,
}

impl Subscriber {
    /// Wait until the consumer asks for an event; `false` once it is gone
    async fn prime(&mut self) -> bool {
        if self.primed {
            return true;
        }
        match self.demand.acquire().await {
            Ok(permit) => {
                permit.forget();
                self.primed = true;
                true
            }
            Err(_) => false,
        }
    }

    async fn send(&mut self, event: ReaderEvent) -> bool {
        if !self.prime().await {
            return false;
        }
        self.primed = false;
        self.tx.send(event).await.is_ok()
    }
}

type OpenListener = Box<dyn FnMut() + Send>;
type ErrorListener = Box<dyn FnMut(&ReaderError) + Send>;
type LineListener = Box<dyn FnMut(&str) + Send>;
type EndListener = Box<dyn FnMut() + Send>;

/// Per-kind listener lists plus channel subscribers
#[derive(Default)]
pub(crate) struct Listeners {
    open: Vec<OpenListener>,
    error: Vec<ErrorListener>,
    line: Vec<LineListener>,
    end: Vec<EndListener>,
    subscribers: Vec<Subscriber>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("open", &self.open.len())
            .field("error", &self.error.len())
            .field("line", &self.line.len())
            .field("end", &self.end.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl Listeners {
    pub(crate) fn on_open(&mut self, listener: impl FnMut() + Send + 'static) {
        self.open.push(Box::new(listener));
    }

    pub(crate) fn on_error(&mut self, listener: impl FnMut(&ReaderError) + Send + 'static) {
        self.error.push(Box::new(listener));
    }

    pub(crate) fn on_line(&mut self, listener: impl FnMut(&str) + Send + 'static) {
        self.line.push(Box::new(listener));
    }

    pub(crate) fn on_end(&mut self, listener: impl FnMut() + Send + 'static) {
        self.end.push(Box::new(listener));
    }

    pub(crate) fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = mpsc::channel(1);
        let demand = Arc::new(Semaphore::new(0));
        self.subscribers.push(Subscriber {
            tx,
            demand: Arc::clone(&demand),
            primed: false,
        });
        Subscription { rx, demand }
    }

    /// Wait until every live subscriber is asking for an event.
    ///
    /// Returns `true` when no waiting was needed. Departed subscribers are
    /// forgotten.
    pub(crate) async fn ready(&mut self) -> bool {
        let mut immediate = true;
        let mut index = 0;
        while index < self.subscribers.len() {
            let subscriber = &mut self.subscribers[index];
            immediate &= subscriber.primed;
            if subscriber.prime().await {
                index += 1;
            } else {
                self.subscribers.remove(index);
            }
        }
        immediate
    }

    pub(crate) async fn emit_open(&mut self) {
        for listener in &mut self.open {
            listener();
        }
        self.publish(|| ReaderEvent::Open).await;
    }

    pub(crate) async fn emit_error(&mut self, error: ReaderError) {
        if self.error.is_empty() && self.subscribers.is_empty() {
            tracing::error!(%error, "reader error with no error listener");
            return;
        }

        for listener in &mut self.error {
            listener(&error);
        }
        let error = Arc::new(error);
        self.publish(|| ReaderEvent::Error(Arc::clone(&error))).await;
    }

    pub(crate) async fn emit_line(&mut self, line: String) {
        for listener in &mut self.line {
            listener(&line);
        }
        if !self.subscribers.is_empty() {
            self.publish(|| ReaderEvent::Line(line.clone())).await;
        }
    }

    pub(crate) async fn emit_end(&mut self) {
        for listener in &mut self.end {
            listener();
        }
        self.publish(|| ReaderEvent::End).await;
    }

    /// Hand `event` to each live subscriber once it asks, forgetting those
    /// whose receiver is gone
    async fn publish(&mut self, event: impl Fn() -> ReaderEvent) {
        let mut index = 0;
        while index < self.subscribers.len() {
            if self.subscribers[index].send(event()).await {
                index += 1;
            } else {
                self.subscribers.remove(index);
            }
        }
    }
}

//! The dedicated UI thread.
//!
//! Owns the `UiManager`. Batches arrive through `UiHandle::post_batch`,
//! which never blocks the caller. While animations run the thread ticks them
//! every frame interval.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tokio::sync::broadcast;
use trellis_api::Value;

use crate::error::UiError;
use crate::registry::ViewManagerRegistry;
use crate::ui_manager::{UiManager, UiManagerConfig};

const EVENT_CAPACITY: usize = 256;

/// Events published by the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    BatchApplied { applied: usize, failed: usize },
    /// The last running animation finished.
    AnimationsSettled,
}

/// Receiving end of [`UiThread::subscribe`].
pub type UiEvents = broadcast::Receiver<UiEvent>;

type UiJob = Box<dyn FnOnce(&mut UiManager) + Send>;

enum UiMessage {
    Batch(Value),
    Run(UiJob),
    Shutdown,
}

/// Cloneable sender side of the UI thread.
#[derive(Clone)]
pub struct UiHandle {
    tx: Sender<UiMessage>,
    events: broadcast::Sender<UiEvent>,
}

impl UiHandle {
    /// Queue a batch for the UI thread.
    pub fn post_batch(&self, batch: Value) -> Result<(), UiError> {
        self.tx
            .send(UiMessage::Batch(batch))
            .map_err(|_| UiError::ThreadGone)
    }

    pub fn post<F>(&self, job: F) -> Result<(), UiError>
    where
        F: FnOnce(&mut UiManager) + Send + 'static,
    {
        self.tx
            .send(UiMessage::Run(Box::new(job)))
            .map_err(|_| UiError::ThreadGone)
    }

    /// Run `job` on the UI thread and wait for its result.
    pub fn invoke<F, R>(&self, job: F) -> Result<R, UiError>
    where
        F: FnOnce(&mut UiManager) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.post(move |manager| {
            let _ = reply_tx.send(job(manager));
        })?;
        reply_rx.recv().map_err(|_| UiError::ThreadGone)
    }

    pub fn subscribe(&self) -> UiEvents {
        self.events.subscribe()
    }
}

pub struct UiThread {
    handle: UiHandle,
    join: Option<JoinHandle<()>>,
}

impl UiThread {
    /// Spawn the UI thread. The manager is created on it.
    pub fn spawn(
        registry: Arc<ViewManagerRegistry>,
        config: UiManagerConfig,
    ) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let thread_events = events.clone();
        let join = thread::Builder::new().name("trellis-ui".into()).spawn(move || {
            let mut manager = UiManager::new(registry, config);
            ui_loop(&mut manager, rx, thread_events);
        })?;

        Ok(Self {
            handle: UiHandle { tx, events },
            join: Some(join),
        })
    }

    pub fn handle(&self) -> UiHandle {
        self.handle.clone()
    }

    pub fn post_batch(&self, batch: Value) -> Result<(), UiError> {
        self.handle.post_batch(batch)
    }

    pub fn invoke<F, R>(&self, job: F) -> Result<R, UiError>
    where
        F: FnOnce(&mut UiManager) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle.invoke(job)
    }

    pub fn subscribe(&self) -> UiEvents {
        self.handle.subscribe()
    }

    /// Stop the thread after the messages already queued.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.handle.tx.send(UiMessage::Shutdown);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("UI thread panicked");
            }
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ui_loop(manager: &mut UiManager, rx: Receiver<UiMessage>, events: broadcast::Sender<UiEvent>) {
    let interval = manager.config().frame_interval;
    let mut last_tick = Instant::now();
    tracing::debug!("UI thread started");

    loop {
        let message = if manager.active_animations() > 0 {
            match rx.recv_timeout(interval) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            }
        };

        match message {
            Some(UiMessage::Batch(batch)) => {
                let report = manager.apply_batch(&batch);
                let _ = events.send(UiEvent::BatchApplied {
                    applied: report.applied,
                    failed: report.failed.len(),
                });
            }
            Some(UiMessage::Run(job)) => job(manager),
            Some(UiMessage::Shutdown) => break,
            None => {}
        }

        if manager.active_animations() > 0 && last_tick.elapsed() >= interval {
            last_tick = Instant::now();
            if manager.tick(last_tick) == 0 {
                let _ = events.send(UiEvent::AnimationsSettled);
            }
        }
    }

    tracing::debug!("UI thread stopped");
}

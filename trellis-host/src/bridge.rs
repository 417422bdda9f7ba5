//! The bridge: one script thread, one UI thread, and the batch path between
//! them.
//!
//! Scripts flush UI work by calling `__flushUiBatch(batch)`. The batch is
//! posted to the UI thread without waiting for it to apply. A non-empty list
//! returned from [`Bridge::call_function`] is flushed the same way.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use trellis_api::{Rect, Value, ViewTag};
use trellis_script::{ConsoleSink, ScriptThread, TracingSink};
use trellis_ui::{UiEvents, UiHandle, UiManager, UiThread, ViewManagerRegistry};

use crate::config::HostConfig;

/// Host function scripts call to hand a batch to the UI thread.
pub const FLUSH_UI_BATCH: &str = "__flushUiBatch";

/// Global holding `{className: {nativeProps: {name: type}}}`.
pub const UI_MANAGER_CONSTANTS: &str = "UIManagerConstants";

/// Tag of the root view mounted by [`Bridge::mount_root`].
pub const ROOT_TAG: ViewTag = ViewTag(1);

/// Global holding the numeric root tag.
pub const ROOT_TAG_GLOBAL: &str = "rootTag";

pub struct Bridge {
    // Dropped first so no script can post after the UI thread is gone.
    script: ScriptThread,
    ui: UiThread,
    frame_interval: Duration,
}

impl Bridge {
    /// Starts both threads with console output routed to `tracing`.
    pub fn start(config: &HostConfig, registry: ViewManagerRegistry) -> Result<Self> {
        Self::with_sink(config, registry, Arc::new(TracingSink))
    }

    pub fn with_sink(
        config: &HostConfig,
        registry: ViewManagerRegistry,
        sink: Arc<dyn ConsoleSink>,
    ) -> Result<Self> {
        let registry = Arc::new(registry);
        let constants = registry.native_props();
        let ui_config = config.ui_config();
        let frame_interval = ui_config.frame_interval;

        let ui = UiThread::spawn(Arc::clone(&registry), ui_config)
            .context("failed to start UI thread")?;
        let script = ScriptThread::spawn(config.executor_config(), sink)
            .context("failed to start script thread")?;

        let handle = ui.handle();
        script
            .invoke(move |executor| {
                executor.register_host_function(FLUSH_UI_BATCH, move |batch| flush(&handle, batch))
            })?
            .context("failed to register the UI flush function")?;
        script
            .set_global(UI_MANAGER_CONSTANTS, constants)
            .context("failed to publish view manager constants")?;

        tracing::info!(classes = ?registry.names().collect::<Vec<_>>(), "bridge started");
        Ok(Self {
            script,
            ui,
            frame_interval,
        })
    }

    pub fn run_script(&self, source: &str) -> Result<()> {
        self.script.run_script(source)?;
        Ok(())
    }

    pub fn run_file(&self, path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        self.script
            .run_script(source)
            .with_context(|| format!("script {} failed", path.display()))
    }

    /// Calls `module.method(global, args...)` on the script thread.
    pub fn call_function(&self, module: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        let result = self.script.call(module, method, args)?;
        if matches!(&result, Value::List(items) if !items.is_empty()) {
            self.ui.post_batch(result.clone())?;
        }
        Ok(result)
    }

    pub fn get_global(&self, name: &str) -> Result<Value> {
        Ok(self.script.get_global(name)?)
    }

    pub fn set_global(&self, name: &str, value: Value) -> Result<()> {
        Ok(self.script.set_global(name, value)?)
    }

    pub fn add_root_view(&self, tag: ViewTag, rect: Rect) -> Result<()> {
        self.ui.invoke(move |manager| manager.add_root_view(tag, rect))??;
        Ok(())
    }

    /// Mounts [`ROOT_TAG`] with the given size and publishes it to scripts
    /// as `rootTag`.
    pub fn mount_root(&self, width: f64, height: f64) -> Result<()> {
        self.add_root_view(ROOT_TAG, Rect::new(0.0, 0.0, width, height))?;
        self.set_global(ROOT_TAG_GLOBAL, Value::from(ROOT_TAG.0))
    }

    /// Runs `job` against the UI manager on the UI thread. Batches posted
    /// before the call have been applied when `job` runs.
    pub fn with_ui<F, R>(&self, job: F) -> Result<R>
    where
        F: FnOnce(&mut UiManager) -> R + Send + 'static,
        R: Send + 'static,
    {
        Ok(self.ui.invoke(job)?)
    }

    /// Waits for every posted batch to apply and every animation to finish.
    /// Returns `false` if animations are still running after `timeout`. A
    /// timeout too large to represent waits without a deadline.
    pub fn settle(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.with_ui(|manager| manager.active_animations())? == 0 {
                return Ok(true);
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(false);
            }
            thread::sleep(self.frame_interval);
        }
    }

    /// Snapshots of every root view, in tag order.
    pub fn snapshot(&self) -> Result<Value> {
        self.with_ui(|manager| {
            let roots = manager
                .roots()
                .into_iter()
                .filter_map(|tag| manager.snapshot(tag))
                .collect::<Vec<_>>();
            Value::List(roots)
        })
    }

    pub fn ui(&self) -> UiHandle {
        self.ui.handle()
    }

    pub fn subscribe(&self) -> UiEvents {
        self.ui.subscribe()
    }

    /// Stops the script thread, then the UI thread.
    pub fn shutdown(self) {
        self.script.shutdown();
        self.ui.shutdown();
        tracing::info!("bridge stopped");
    }
}

fn flush(ui: &UiHandle, batch: Value) -> Result<(), String> {
    let Value::List(items) = &batch else {
        return Err(format!(
            "{} expects a list, got {}",
            FLUSH_UI_BATCH,
            batch.type_name()
        ));
    };
    if items.is_empty() {
        return Ok(());
    }
    tracing::trace!(ops = items.len(), "flushing UI batch");
    ui.post_batch(batch).map_err(|e| e.to_string())
}

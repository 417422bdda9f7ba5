//! The dedicated script thread.
//!
//! The executor is created, used, and disposed on one thread. Other threads
//! talk to it by queueing jobs; `invoke` waits for the job's reply.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use trellis_api::Value;

use crate::console::ConsoleSink;
use crate::error::ExecutorError;
use crate::executor::{ExecutorConfig, ScriptExecutor};

type Job = Box<dyn FnOnce(&mut ScriptExecutor) + Send>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Handle to the thread that owns a [`ScriptExecutor`].
pub struct ScriptThread {
    /// Job queue, drained in FIFO order.
    jobs: Sender<Message>,

    /// Handle to the script thread.
    handle: Option<JoinHandle<()>>,
}

impl ScriptThread {
    /// Spawn the script thread and initialize its executor there.
    pub fn spawn(
        config: ExecutorConfig,
        sink: Arc<dyn ConsoleSink>,
    ) -> Result<Self, ExecutorError> {
        let (jobs, queue) = crossbeam_channel::unbounded();
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("trellis-script".into())
            .spawn(move || {
                let mut executor = ScriptExecutor::new(config, sink);
                let init = executor.initialize();
                let ok = init.is_ok();
                let _ = ready_tx.send(init);
                if ok {
                    script_loop(&mut executor, queue);
                }
                executor.dispose();
            })
            .map_err(|e| ExecutorError::Script {
                message: format!("failed to spawn script thread: {}", e),
            })?;

        let mut this = Self {
            jobs,
            handle: Some(handle),
        };
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(this),
            Ok(Err(e)) => {
                this.stop();
                Err(e)
            }
            Err(_) => {
                this.stop();
                Err(ExecutorError::ThreadGone)
            }
        }
    }

    /// Queue a job without waiting for it.
    pub fn post<F>(&self, job: F) -> Result<(), ExecutorError>
    where
        F: FnOnce(&mut ScriptExecutor) + Send + 'static,
    {
        self.jobs
            .send(Message::Run(Box::new(job)))
            .map_err(|_| ExecutorError::ThreadGone)
    }

    /// Queue a job and block until it has run on the script thread.
    pub fn invoke<F, R>(&self, job: F) -> Result<R, ExecutorError>
    where
        F: FnOnce(&mut ScriptExecutor) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.post(move |executor| {
            let _ = reply_tx.send(job(executor));
        })?;
        reply_rx.recv().map_err(|_| ExecutorError::ThreadGone)
    }

    pub fn call(
        &self,
        module: &str,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExecutorError> {
        let module = module.to_string();
        let method = method.to_string();
        self.invoke(move |executor| executor.call(&module, &method, &args))?
    }

    pub fn run_script(&self, source: impl Into<String>) -> Result<(), ExecutorError> {
        let source = source.into();
        self.invoke(move |executor| executor.run_script(&source))?
    }

    pub fn get_global(&self, name: &str) -> Result<Value, ExecutorError> {
        let name = name.to_string();
        self.invoke(move |executor| executor.get_global(&name))?
    }

    pub fn set_global(&self, name: &str, value: Value) -> Result<(), ExecutorError> {
        let name = name.to_string();
        self.invoke(move |executor| executor.set_global(&name, &value))?
    }

    /// Dispose the executor and join the thread. Jobs already queued run first.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.jobs.send(Message::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("script thread panicked");
            }
        }
    }
}

impl Drop for ScriptThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn script_loop(executor: &mut ScriptExecutor, queue: Receiver<Message>) {
    tracing::debug!(session = executor.session_id(), "script thread started");
    while let Ok(message) = queue.recv() {
        match message {
            Message::Run(job) => job(executor),
            Message::Shutdown => break,
        }
    }
    tracing::debug!(session = executor.session_id(), "script thread stopped");
}

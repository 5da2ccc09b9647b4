//! Background jobs for leaf features.
//!
//! A job runs on its own thread and hands exactly one result back through a
//! one-shot channel. The frame tick polls it without blocking; the worker
//! never touches navigation state.

use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::navigation::FeatureError;

#[derive(Debug, PartialEq, Eq)]
pub enum JobStatus<T> {
    Pending,
    Finished(T),
    // Worker died without answering
    Lost,
}

#[derive(Debug)]
pub struct BackgroundJob<T> {
    name: String,
    receiver: Option<oneshot::Receiver<T>>,
}

impl<T: Send + 'static> BackgroundJob<T> {
    pub fn spawn<F>(name: impl Into<String>, work: F) -> Result<Self, FeatureError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let name = name.into();
        let (sender, receiver) = oneshot::channel();
        let thread_name = name.clone();
        std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let result = work();
                if sender.send(result).is_err() {
                    debug!("Result of '{}' dropped, nobody is waiting", thread_name);
                }
            })
            .map_err(|e| FeatureError::WorkerLost(format!("{}: {}", name, e)))?;
        info!("Started background job '{}'", name);
        Ok(Self {
            name,
            receiver: Some(receiver),
        })
    }
}

impl<T> BackgroundJob<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_done(&self) -> bool {
        self.receiver.is_none()
    }

    /// Non-blocking check. Yields `Finished` or `Lost` exactly once.
    pub fn poll(&mut self) -> JobStatus<T> {
        let Some(receiver) = self.receiver.as_mut() else {
            return JobStatus::Pending;
        };
        match receiver.try_recv() {
            Ok(value) => {
                self.receiver = None;
                debug!("Background job '{}' finished", self.name);
                JobStatus::Finished(value)
            }
            Err(oneshot::error::TryRecvError::Empty) => JobStatus::Pending,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.receiver = None;
                error!("Background job '{}' ended without a result", self.name);
                JobStatus::Lost
            }
        }
    }
}

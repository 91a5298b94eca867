// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background worker for feed loading and location lookups.
//!
//! The worker owns a tokio runtime on a dedicated thread. Jobs arrive over a
//! tokio channel; each finished job becomes a [`SessionEvent`] sent back to
//! the UI thread, which drains them once per frame.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use eframe::egui;
use log::{error, info, warn};
use sheetmap_core::{FeedKind, FixRequest, SessionEvent};
use tokio::sync::mpsc as tokio_mpsc;
use tokio_util::sync::CancellationToken;

use crate::feeds::{self, FeedSource};
use crate::location::LocationProvider;

/// Work the UI thread can hand to the worker
#[derive(Debug, Clone)]
pub enum Job {
    LoadFeed { kind: FeedKind, source: FeedSource },
    Locate(FixRequest),
}

/// Handle to the background worker thread
#[derive(Debug)]
pub struct Worker {
    jobs: tokio_mpsc::UnboundedSender<Job>,
    events: mpsc::Receiver<SessionEvent>,
    cancel_token: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start the worker thread
    pub fn spawn(ctx: egui::Context, client: reqwest::Client, locator: LocationProvider) -> Self {
        let (jobs_tx, jobs_rx) = tokio_mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::channel();
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let thread = std::thread::Builder::new()
            .name("sheetmap-worker".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to start worker runtime: {}", e);
                        return;
                    }
                };
                let context = WorkerContext {
                    ctx,
                    client,
                    locator: Arc::new(locator),
                    events: events_tx,
                };
                rt.block_on(run(jobs_rx, context, token));
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to spawn worker thread: {}", e);
                None
            }
        };

        Self {
            jobs: jobs_tx,
            events: events_rx,
            cancel_token,
            thread,
        }
    }

    /// Queue a job
    pub fn submit(&self, job: Job) {
        if let Err(e) = self.jobs.send(job) {
            warn!("Worker is not running, dropping job {:?}", e.0);
        }
    }

    /// Take every event delivered since the last call
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }

    /// Stop the worker and wait for its thread
    pub fn shutdown(&mut self) {
        self.cancel_token.cancel();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Worker thread panicked during shutdown");
            }
            info!("Worker stopped");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Shared state for jobs running on the worker runtime
#[derive(Clone)]
struct WorkerContext {
    ctx: egui::Context,
    client: reqwest::Client,
    locator: Arc<LocationProvider>,
    events: mpsc::Sender<SessionEvent>,
}

impl WorkerContext {
    fn deliver(&self, event: SessionEvent) {
        if self.events.send(event).is_ok() {
            self.ctx.request_repaint();
        }
    }
}

async fn run(
    mut jobs: tokio_mpsc::UnboundedReceiver<Job>,
    context: WorkerContext,
    cancel_token: CancellationToken,
) {
    info!("Worker started");
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => break,
            job = jobs.recv() => {
                let Some(job) = job else { break };
                let context = context.clone();
                let token = cancel_token.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = token.cancelled() => {}
                        event = execute(job, &context) => context.deliver(event),
                    }
                });
            }
        }
    }
}

async fn execute(job: Job, context: &WorkerContext) -> SessionEvent {
    match job {
        Job::LoadFeed { kind, source } => load_feed(kind, &source, &context.client).await,
        Job::Locate(request) => match context.locator.locate(&request.options).await {
            Ok(fix) => SessionEvent::FixAcquired {
                request: request.id,
                fix,
            },
            Err(error) => SessionEvent::FixFailed {
                request: request.id,
                error,
            },
        },
    }
}

async fn load_feed(kind: FeedKind, source: &FeedSource, client: &reqwest::Client) -> SessionEvent {
    info!("Loading {} feed from {}", kind, source);
    let result = match kind {
        FeedKind::Points => feeds::fetch_points(client, source)
            .await
            .map(SessionEvent::DatasetLoaded),
        FeedKind::Geometry => feeds::fetch_geometry(client, source)
            .await
            .map(SessionEvent::GeometryLoaded),
    };

    result.unwrap_or_else(|e| SessionEvent::FeedFailed {
        feed: kind,
        error: e.to_string(),
    })
}

// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Background layered layout.
//!
//! Each request bumps a generation counter and runs on the rayon pool.  A
//! computation that finds a newer generation has been requested drops its
//! result, so the receiver only ever sees the latest layout.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, warn};

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::datamodel::Diagram;

use super::config::LayoutConfig;
use super::layered::compute_layered_layout;
use super::{Layout, compute_layout};

/// A finished layout tagged with the request that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutResponse {
    pub generation: u64,
    pub layout: Layout,
    /// True when the layered layout failed and the lane layout was used.
    pub fell_back: bool,
}

pub struct LayoutWorker {
    generation: Arc<AtomicU64>,
    sender: Sender<LayoutResponse>,
    receiver: Receiver<LayoutResponse>,
}

impl Default for LayoutWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutWorker {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        LayoutWorker {
            generation: Arc::new(AtomicU64::new(0)),
            sender,
            receiver,
        }
    }

    /// The generation of the most recent request, 0 before any request.
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Queue a layout of `diagram` and return its generation.  Any result
    /// still outstanding from an earlier request becomes stale.
    pub fn request(&self, diagram: Diagram, config: LayoutConfig) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let latest = Arc::clone(&self.generation);
        let sender = self.sender.clone();

        rayon::spawn(move || {
            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "layout request superseded before it started");
                return;
            }

            let (layout, fell_back) = match compute_layered_layout(&diagram, &config) {
                Ok(layout) => (layout, false),
                Err(err) => {
                    warn!(generation, %err, "layered layout failed, using lane layout");
                    (compute_layout(&diagram, &config, None), true)
                }
            };

            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "dropping stale layout");
                return;
            }
            // the receiver lives as long as the worker; a failed send means
            // nobody is listening any more
            let _ = sender.send(LayoutResponse {
                generation,
                layout,
                fell_back,
            });
        });

        generation
    }

    /// Wait up to `timeout` for the layout of the latest request, discarding
    /// anything older that arrives first.
    pub fn recv_latest(&self, timeout: Duration) -> Result<LayoutResponse> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(response) if response.generation == self.latest_generation() => {
                    return Ok(response);
                }
                Ok(response) => {
                    debug!(generation = response.generation, "discarding stale layout");
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::new(
                        ErrorKind::Layout,
                        ErrorCode::Timeout,
                        Some(format!("no layout within {}ms", timeout.as_millis())),
                    ));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::new(ErrorKind::Layout, ErrorCode::LayoutCancelled, None));
                }
            }
        }
    }

    /// The latest layout if it has already arrived.
    pub fn try_recv_latest(&self) -> Option<LayoutResponse> {
        let latest = self.latest_generation();
        self.receiver
            .try_iter()
            .filter(|r| r.generation == latest)
            .last()
    }
}

//! Convention dispatcher and batching
//!
//! Mutations are applied to the graph immediately; the events they raise are
//! queued. The queue is drained in FIFO order when the outermost batch
//! closes. Events raised while draining are appended and handled by the same
//! drain before control returns to the caller.

use crate::ModelBuilder;
use crate::conventions::{ConventionContext, ConventionEvent};
use ormforge_core::{ModelError, ModelResult};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Name reported for events raised directly by builder calls
const BUILDER_ORIGIN: &str = "<builder>";

#[derive(Debug)]
struct Queued {
    event: ConventionEvent,
    /// Convention that raised the event, if any
    origin: Option<&'static str>,
}

/// Batch depth, pending events and the cycle guard of one builder
#[derive(Debug, Default)]
pub(crate) struct Dispatcher {
    depth: usize,
    queue: VecDeque<Queued>,
    draining: bool,
    dispatched: HashSet<(ConventionEvent, u64)>,
    dispatch_count: usize,
    current: Option<&'static str>,
    pub(crate) pending_error: Option<ModelError>,
}

impl Dispatcher {
    /// Number of open batches
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Number of queued events
    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }

    fn discard_queue(&mut self) {
        if !self.queue.is_empty() {
            warn!(
                discarded = self.queue.len(),
                "Discarding queued convention events after a failed batch"
            );
            self.queue.clear();
        }
    }
}

impl ModelBuilder {
    /// Queue an event for the conventions
    pub(crate) fn notify(&mut self, event: ConventionEvent) {
        let dispatcher = &mut self.dispatcher;
        if dispatcher.queue.iter().any(|q| q.event == event) {
            trace!(%event, "Event already queued");
            return;
        }
        trace!(%event, origin = dispatcher.current.unwrap_or(BUILDER_ORIGIN), "Event queued");
        dispatcher.queue.push_back(Queued {
            event,
            origin: dispatcher.current,
        });
    }

    pub(crate) fn begin_batch(&mut self) {
        self.dispatcher.depth += 1;
        if self.dispatcher.depth == 1 && !self.dispatcher.draining {
            debug!("Convention batch opened");
        }
    }

    /// Close one batch level, draining when the outermost one closes
    pub(crate) fn end_batch(&mut self) -> ModelResult<()> {
        self.dispatcher.depth = self.dispatcher.depth.saturating_sub(1);
        if self.dispatcher.depth == 0 {
            self.drain()
        } else {
            Ok(())
        }
    }

    /// Close one batch level after a failure without draining
    pub(crate) fn abort_batch(&mut self) {
        self.dispatcher.depth = self.dispatcher.depth.saturating_sub(1);
        if self.dispatcher.depth == 0 && !self.dispatcher.draining {
            self.dispatcher.discard_queue();
        }
    }

    /// Run `f` inside a batch; the depth is released on every exit path
    pub(crate) fn run_batch<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ModelResult<T>,
    ) -> ModelResult<T> {
        self.begin_batch();
        match f(self) {
            Ok(value) => {
                self.end_batch()?;
                Ok(value)
            }
            Err(err) => {
                self.abort_batch();
                Err(err)
            }
        }
    }

    fn drain(&mut self) -> ModelResult<()> {
        // Re-entrant closes while draining only enqueue
        if self.dispatcher.draining || self.dispatcher.queue.is_empty() {
            return Ok(());
        }

        debug!(queued = self.dispatcher.queue.len(), "Draining convention queue");
        self.dispatcher.draining = true;
        let result = self.drain_queue();
        let dispatcher = &mut self.dispatcher;
        dispatcher.draining = false;
        dispatcher.current = None;
        dispatcher.dispatched.clear();
        debug!(dispatches = dispatcher.dispatch_count, "Convention batch closed");
        dispatcher.dispatch_count = 0;
        if result.is_err() {
            dispatcher.discard_queue();
        }
        result
    }

    fn drain_queue(&mut self) -> ModelResult<()> {
        while let Some(Queued { event, origin }) = self.dispatcher.queue.pop_front() {
            if !event.is_live(&self.model) {
                trace!(%event, "Skipping event for removed node");
                continue;
            }

            let fingerprint = event.fingerprint(&self.model);
            if !self
                .dispatcher
                .dispatched
                .insert((event.clone(), fingerprint))
            {
                return Err(ModelError::ConventionCycle {
                    convention: origin.unwrap_or(BUILDER_ORIGIN).to_string(),
                    event: event.to_string(),
                });
            }

            let conventions = Arc::clone(&self.conventions);
            let mut context = ConventionContext::default();
            for convention in conventions.handling(event.kind()) {
                if !event.is_live(&self.model) {
                    break;
                }

                self.dispatcher.dispatch_count += 1;
                if self.dispatcher.dispatch_count > self.config.max_dispatches {
                    return Err(ModelError::ConventionCycle {
                        convention: convention.name().to_string(),
                        event: event.to_string(),
                    });
                }

                trace!(convention = convention.name(), %event, "Dispatching convention");
                self.dispatcher.current = Some(convention.name());
                convention.apply(self, &event, &mut context)?;
                self.dispatcher.current = None;

                if context.is_stopped() {
                    trace!(convention = convention.name(), %event, "Convention stopped processing");
                    break;
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

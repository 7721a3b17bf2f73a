//! Summing up a property over a tree of entities.
//!
//! An [`Aggregation`] alternates between two steps: it measures all files of a batch and reports
//! the running [`Totals`] to its callback, then it lists the next queued container and makes its
//! children the next batch. The callback decides after every batch whether to go on, which is
//! where a superseded [`Ticket`] is noticed and the aggregation is cancelled.
//!
//! Failures are not fatal. A file that cannot be measured or a container that cannot be listed is
//! logged and skipped, and the totals end up covering everything else.

use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::config::AggregationConfig;
use crate::provider::{ByteSize, Entity, MetadataProvider};
use crate::types::Ticket;

/// Running totals of an aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// The number of files that were measured.
    pub count: u64,
    /// The sum of their sizes.
    pub size: u64,
}

impl Totals {
    fn add(&mut self, size: u64) {
        self.count = self.count.saturating_add(1);
        self.size = self.size.saturating_add(size);
    }
}

impl std::ops::AddAssign for Totals {
    fn add_assign(&mut self, other: Self) {
        self.count = self.count.saturating_add(other.count);
        self.size = self.size.saturating_add(other.size);
    }
}

/// Sums up one property over trees of entities.
#[derive(Debug)]
pub struct Aggregator<P> {
    provider: P,
    property: String,
    max_concurrent_loads: usize,
}

impl<P> Aggregator<P>
where
    P: MetadataProvider,
    P::Value: ByteSize,
{
    pub fn new(provider: P, config: &AggregationConfig) -> Self {
        Self {
            provider,
            property: config.property.clone(),
            max_concurrent_loads: config.max_concurrent_loads.max(1),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Starts an empty aggregation for `ticket`.
    ///
    /// `on_batch` is called with the running totals after every batch and returns whether the
    /// aggregation should go on.
    pub fn start<F>(&self, ticket: Ticket, on_batch: F) -> Aggregation<'_, P, F>
    where
        F: FnMut(Ticket, Totals) -> bool,
    {
        Aggregation {
            aggregator: self,
            ticket,
            queue: VecDeque::new(),
            totals: Totals::default(),
            on_batch,
            stopped: false,
        }
    }

    /// Aggregates over `roots` and everything below them, until done or stopped by `on_batch`.
    #[tracing::instrument(skip_all, fields(%ticket, roots = roots.len()))]
    pub async fn run<F>(&self, ticket: Ticket, roots: Vec<P::Entity>, on_batch: F) -> Totals
    where
        F: FnMut(Ticket, Totals) -> bool,
    {
        let start = Instant::now();
        let mut aggregation = self.start(ticket, on_batch);

        aggregation.enqueue(roots).await;
        while aggregation.expand_next().await {}

        metric!(timer("aggregation.duration") = start.elapsed());
        tracing::debug!(totals = ?aggregation.totals(), "aggregation finished");
        aggregation.totals()
    }
}

/// A single aggregation run.
pub struct Aggregation<'a, P: MetadataProvider, F> {
    aggregator: &'a Aggregator<P>,
    ticket: Ticket,
    queue: VecDeque<P::Entity>,
    totals: Totals,
    on_batch: F,
    stopped: bool,
}

impl<P, F> Aggregation<'_, P, F>
where
    P: MetadataProvider,
    P::Value: ByteSize,
    F: FnMut(Ticket, Totals) -> bool,
{
    /// Measures the files among `entities` and queues the containers for later.
    ///
    /// Returns the verdict of the batch callback, which is invoked even if every file failed.
    pub async fn enqueue(&mut self, entities: Vec<P::Entity>) -> bool {
        if self.stopped {
            return false;
        }
        let (containers, files): (Vec<_>, Vec<_>) =
            entities.into_iter().partition(Entity::is_container);
        self.queue.extend(containers);

        let batch = self.measure(&files).await;
        self.totals += batch;
        metric!(counter("aggregation.batches") += 1);

        if !(self.on_batch)(self.ticket, self.totals) {
            tracing::debug!(ticket = %self.ticket, "aggregation stopped");
            self.stopped = true;
        }
        !self.stopped
    }

    /// Lists the next queued container and enqueues its children.
    ///
    /// Returns `false` once the aggregation is stopped or nothing is left to expand.
    pub async fn expand_next(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        let Some(container) = self.queue.pop_front() else {
            return false;
        };

        match container.list_children().await {
            Ok(children) => {
                self.enqueue(children).await;
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    container = ?container.key(),
                    "failed to list children, skipping"
                );
                metric!(counter("aggregation.failures") += 1, "step" => "list");
            }
        }
        !self.stopped
    }

    /// The totals accumulated so far.
    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Whether the callback asked to stop.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The number of containers waiting to be listed.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    async fn measure(&self, files: &[P::Entity]) -> Totals {
        let aggregator = self.aggregator;
        let property = &aggregator.property;
        let names = BTreeSet::from([property.clone()]);
        let names = &names;

        let results: Vec<_> = stream::iter(files)
            .map(|file| async move { (file, aggregator.provider.load(file, names).await) })
            .buffer_unordered(aggregator.max_concurrent_loads)
            .collect()
            .await;

        let mut batch = Totals::default();
        for (file, result) in results {
            let size = match result.map(|mut values| values.remove(property)) {
                Ok(Some(Ok(value))) => value.byte_size(),
                Ok(Some(Err(err))) | Err(err) => {
                    tracing::warn!(
                        error = %err,
                        file = ?file.key(),
                        "failed to load {property}, skipping"
                    );
                    None
                }
                Ok(None) => {
                    tracing::warn!(file = ?file.key(), "no {property} reported, skipping");
                    None
                }
            };
            match size {
                Some(size) => batch.add(size),
                None => metric!(counter("aggregation.failures") += 1, "step" => "measure"),
            }
        }
        batch
    }
}

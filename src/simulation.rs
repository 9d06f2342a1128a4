use crate::error::SimError;
use crate::lru::{AccessOutcome, LruCache};
use crate::trace::{Operation, TraceEvent};

/// Hit, miss and eviction totals of one run.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl RunCounters {
    pub fn record(&mut self, outcome: AccessOutcome) {
        match outcome {
            AccessOutcome::Hit => self.hits += 1,
            AccessOutcome::MissCleanFill => self.misses += 1,
            AccessOutcome::MissWithEviction { .. } => {
                self.misses += 1;
                self.evictions += 1;
            }
        }
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        self.percent_of(self.hits)
    }

    pub fn miss_rate(&self) -> f64 {
        self.percent_of(self.misses)
    }

    fn percent_of(&self, count: u64) -> f64 {
        match self.accesses() {
            0 => 0.0,
            accesses => 100.0 * count as f64 / accesses as f64,
        }
    }
}

impl std::fmt::Display for RunCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        ))
    }
}

/// What the cache did for a single trace event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// Instruction fetches never reach the data cache.
    Skipped,
    Access(AccessOutcome),
    Modify {
        load: AccessOutcome,
        store: AccessOutcome,
    },
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Skipped => Ok(()),
            Step::Access(outcome) => f.write_fmt(format_args!("{outcome}")),
            Step::Modify { load, store } => f.write_fmt(format_args!("{load} {store}")),
        }
    }
}

/// Replays trace events against a cache it owns, in order.
#[derive(Debug)]
pub struct TraceRunner {
    cache: LruCache,
    counters: RunCounters,
}

impl TraceRunner {
    pub fn new(cache: LruCache) -> Self {
        Self {
            cache,
            counters: RunCounters::default(),
        }
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    pub fn cache(&self) -> &LruCache {
        &self.cache
    }

    pub fn step(&mut self, event: &TraceEvent) -> Step {
        let step = match event.operation {
            Operation::Instruction => Step::Skipped,
            Operation::Load | Operation::Store => {
                let outcome = self.cache.access(event.address);
                self.counters.record(outcome);
                Step::Access(outcome)
            }
            Operation::Modify => {
                let load = self.cache.access(event.address);
                self.counters.record(load);
                let store = self.cache.access(event.address);
                self.counters.record(store);

                // the load just installed or refreshed this exact block
                debug_assert_eq!(store, AccessOutcome::Hit);
                Step::Modify { load, store }
            }
        };

        tracing::debug!(%event, %step, "trace event");
        step
    }

    /// Runs every event and returns the final counters.
    ///
    /// The first error aborts the run.
    pub fn run<I>(self, events: I) -> Result<RunCounters, SimError>
    where
        I: IntoIterator<Item = Result<TraceEvent, SimError>>,
    {
        self.run_with(events, |_, _| {})
    }

    /// Like [`TraceRunner::run`], `on_step` is called after every processed event.
    pub fn run_with<I, F>(mut self, events: I, mut on_step: F) -> Result<RunCounters, SimError>
    where
        I: IntoIterator<Item = Result<TraceEvent, SimError>>,
        F: FnMut(&TraceEvent, &Step),
    {
        for event in events {
            let event = event?;
            let step = self.step(&event);
            on_step(&event, &step);
        }

        tracing::info!(
            hits = self.counters.hits,
            misses = self.counters.misses,
            evictions = self.counters.evictions,
            hit_rate = format_args!("{:.3}%", self.counters.hit_rate()),
            "simulation finished"
        );
        Ok(self.counters)
    }
}

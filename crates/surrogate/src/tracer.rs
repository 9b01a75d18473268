//! Dispatch tracing.
//!
//! A trait-based tracing system for the proxy engine. The factory owns an optional
//! tracer; when none is installed no hook is called and no lock is taken.
//!
//! # Architecture
//!
//! The [`DispatchTracer`] trait defines hook points at the engine's key events (type
//! synthesis, type cache hits, every routed operation, depth limit failures).
//! Concrete implementations collect different kinds of data:
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | No-op |
//! | [`StderrTracer`] | Human-readable dispatch log to stderr |
//! | [`ProfilingTracer`] | Per-operation and per-tier counters |
//! | [`RecordingTracer`] | Full event recording for post-mortem analysis |
//!
//! # Usage
//!
//! ```
//! use std::sync::{Arc, Mutex};
//!
//! use surrogate::{ProxyConfig, ProxyFactory, RecordingTracer, Value, ops};
//!
//! let recorder = Arc::new(Mutex::new(RecordingTracer::new()));
//! let factory = ProxyFactory::with_tracer(ProxyConfig::default(), Arc::clone(&recorder));
//! let p = factory.proxy(Value::list(vec![Value::Int(1)]));
//! assert_eq!(ops::len(&p).unwrap(), 1);
//! assert!(recorder.lock().unwrap().event_count() >= 2);
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

use crate::{capability::Op, proxy::ProxyId};

/// How the dispatch router resolved one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    /// A per-instance override handled the operation.
    Override,
    /// Attribute access returned a `direct` override bound to the proxy.
    Direct,
    /// The attribute was masked and reported as missing or filtered out.
    Masked,
    /// The operation was forwarded to the wrapped value.
    Forwarded,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Override => "override",
            Self::Direct => "direct",
            Self::Masked => "masked",
            Self::Forwarded => "forward",
        })
    }
}

/// Trace event emitted by the proxy engine.
///
/// Used by [`RecordingTracer`] to capture the full history of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceEvent {
    /// A proxy type was synthesized.
    Synthesize {
        /// Name of the synthesized class, e.g. `proxy[list]`.
        type_name: String,
        /// Number of operation slots on the type.
        slots: usize,
    },
    /// A proxy type request was served from the cache.
    CacheHit {
        /// Name of the cached class.
        type_name: String,
    },
    /// One operation was routed.
    Dispatch {
        /// The proxy the operation ran on.
        proxy: ProxyId,
        /// The operation.
        op: Op,
        /// Attribute name, for attribute access operations.
        attr: Option<String>,
        /// Which tier handled it.
        resolution: Resolution,
        /// Nested dispatch depth, 1 for the outermost.
        depth: usize,
    },
    /// A dispatch was refused because the depth limit was reached.
    DepthExceeded {
        /// The configured limit.
        limit: usize,
    },
}

/// Trait for proxy engine tracing.
///
/// All methods have default no-op implementations; implementations only override the
/// hooks they care about.
pub trait DispatchTracer: fmt::Debug {
    /// Called after a proxy type has been synthesized and before it is cached.
    fn on_synthesize(&mut self, _type_name: &str, _slots: usize) {}

    /// Called when a proxy type request is served from the cache.
    fn on_cache_hit(&mut self, _type_name: &str) {}

    /// Called once per routed operation, before the resolved tier runs.
    ///
    /// This is the hottest hook; implementations should be as lightweight as possible.
    ///
    /// # Arguments
    /// * `proxy` - The proxy the operation runs on
    /// * `op` - The operation
    /// * `attr` - Attribute name for attribute access operations
    /// * `resolution` - Which tier handles the call
    /// * `depth` - Nested dispatch depth
    fn on_dispatch(&mut self, _proxy: ProxyId, _op: Op, _attr: Option<&str>, _resolution: Resolution, _depth: usize) {}

    /// Called when a dispatch is refused because the depth limit was reached.
    fn on_depth_exceeded(&mut self, _limit: usize) {}
}

/// Lets callers keep a handle to a tracer they installed on a factory.
impl<T: DispatchTracer> DispatchTracer for Arc<Mutex<T>> {
    fn on_synthesize(&mut self, type_name: &str, slots: usize) {
        if let Ok(mut tracer) = self.lock() {
            tracer.on_synthesize(type_name, slots);
        }
    }

    fn on_cache_hit(&mut self, type_name: &str) {
        if let Ok(mut tracer) = self.lock() {
            tracer.on_cache_hit(type_name);
        }
    }

    fn on_dispatch(&mut self, proxy: ProxyId, op: Op, attr: Option<&str>, resolution: Resolution, depth: usize) {
        if let Ok(mut tracer) = self.lock() {
            tracer.on_dispatch(proxy, op, attr, resolution, depth);
        }
    }

    fn on_depth_exceeded(&mut self, limit: usize) {
        if let Ok(mut tracer) = self.lock() {
            tracer.on_depth_exceeded(limit);
        }
    }
}

/// Tracer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl DispatchTracer for NoopTracer {}

// ============================================================================
// StderrTracer
// ============================================================================

/// Tracer that prints a human-readable dispatch log to stderr.
///
/// Output format:
/// ```text
/// +++ SYNTHESIZE proxy[list]          slots=31
/// [    1] proxy#0 __len__             forward
/// [    1] proxy#0 __getattribute__    override  .append
/// [    2] proxy#1 __repr__            forward
/// ```
#[derive(Debug)]
pub struct StderrTracer {
    /// Maximum number of dispatches to trace before stopping. None = unlimited.
    limit: Option<usize>,
    /// Number of dispatches traced so far.
    count: usize,
    /// Whether we've stopped tracing (hit the limit).
    stopped: bool,
}

impl StderrTracer {
    /// Creates a new stderr tracer with no limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            count: 0,
            stopped: false,
        }
    }

    /// Creates a new stderr tracer that stops after `limit` dispatches.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
            stopped: false,
        }
    }
}

impl Default for StderrTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTracer for StderrTracer {
    fn on_synthesize(&mut self, type_name: &str, slots: usize) {
        if self.stopped {
            return;
        }
        eprintln!("+++ SYNTHESIZE {type_name:<20} slots={slots}");
    }

    fn on_cache_hit(&mut self, type_name: &str) {
        if self.stopped {
            return;
        }
        eprintln!("... CACHE HIT  {type_name}");
    }

    fn on_dispatch(&mut self, proxy: ProxyId, op: Op, attr: Option<&str>, resolution: Resolution, depth: usize) {
        if self.stopped {
            return;
        }
        match attr {
            Some(attr) => eprintln!("[{depth:>5}] {proxy} {:<20} {resolution:<9} .{attr}", op.dunder()),
            None => eprintln!("[{depth:>5}] {proxy} {:<20} {resolution}", op.dunder()),
        }
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count >= limit
        {
            eprintln!("--- trace limit reached ({limit} dispatches) ---");
            self.stopped = true;
        }
    }

    fn on_depth_exceeded(&mut self, limit: usize) {
        eprintln!("!!! DEPTH LIMIT {limit} EXCEEDED");
    }
}

// ============================================================================
// ProfilingTracer
// ============================================================================

/// Tracer that collects dispatch statistics.
///
/// Retrieve results via [`ProfilingTracer::report`].
#[derive(Debug, Default)]
pub struct ProfilingTracer {
    op_counts: HashMap<Op, u64>,
    resolution_counts: HashMap<Resolution, u64>,
    total_dispatches: u64,
    max_depth: usize,
    syntheses: u64,
    cache_hits: u64,
}

/// Summary report from a profiling trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfilingReport {
    /// Per-operation dispatch counts, most frequent first.
    pub op_counts: Vec<(Op, u64)>,
    /// Dispatch counts per resolution tier, in tier order.
    pub resolution_counts: Vec<(Resolution, u64)>,
    pub total_dispatches: u64,
    /// Deepest nested dispatch observed.
    pub max_depth: usize,
    pub syntheses: u64,
    pub cache_hits: u64,
}

impl ProfilingTracer {
    /// Creates a new profiling tracer with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a report from the collected data.
    #[must_use]
    pub fn report(&self) -> ProfilingReport {
        let mut op_counts: Vec<_> = self.op_counts.iter().map(|(&k, &v)| (k, v)).collect();
        op_counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut resolution_counts: Vec<_> = self.resolution_counts.iter().map(|(&k, &v)| (k, v)).collect();
        resolution_counts.sort();
        ProfilingReport {
            op_counts,
            resolution_counts,
            total_dispatches: self.total_dispatches,
            max_depth: self.max_depth,
            syntheses: self.syntheses,
            cache_hits: self.cache_hits,
        }
    }
}

impl DispatchTracer for ProfilingTracer {
    fn on_synthesize(&mut self, _type_name: &str, _slots: usize) {
        self.syntheses += 1;
    }

    fn on_cache_hit(&mut self, _type_name: &str) {
        self.cache_hits += 1;
    }

    fn on_dispatch(&mut self, _proxy: ProxyId, op: Op, _attr: Option<&str>, resolution: Resolution, depth: usize) {
        *self.op_counts.entry(op).or_insert(0) += 1;
        *self.resolution_counts.entry(resolution).or_insert(0) += 1;
        self.total_dispatches += 1;
        self.max_depth = self.max_depth.max(depth);
    }
}

impl fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Proxy Dispatch Report ===")?;
        writeln!(f, "Total dispatches:   {}", self.total_dispatches)?;
        writeln!(f, "Max depth:          {}", self.max_depth)?;
        writeln!(f, "Types synthesized:  {}", self.syntheses)?;
        writeln!(f, "Type cache hits:    {}", self.cache_hits)?;
        writeln!(f)?;
        writeln!(f, "--- Resolution ---")?;
        for (resolution, count) in &self.resolution_counts {
            writeln!(f, "  {resolution:<20} {count:>10}")?;
        }
        writeln!(f)?;
        writeln!(f, "--- Operation Frequency ---")?;
        for (op, count) in &self.op_counts {
            let pct = (*count as f64 / self.total_dispatches as f64) * 100.0;
            writeln!(f, "  {:<20} {count:>10}  ({pct:>5.1}%)", op.dunder())?;
        }
        Ok(())
    }
}

// ============================================================================
// RecordingTracer
// ============================================================================

/// Tracer that records every event.
///
/// Allocates per event, so use it for tests and short runs. Install it behind an
/// `Arc<Mutex<_>>` to read the events back while the factory is alive.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
    limit: Option<usize>,
}

impl RecordingTracer {
    /// Creates a new recording tracer with no event limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Drops every recorded event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_some_and(|l| self.events.len() >= l) {
            return;
        }
        self.events.push(event);
    }
}

impl DispatchTracer for RecordingTracer {
    fn on_synthesize(&mut self, type_name: &str, slots: usize) {
        self.record(TraceEvent::Synthesize {
            type_name: type_name.to_owned(),
            slots,
        });
    }

    fn on_cache_hit(&mut self, type_name: &str) {
        self.record(TraceEvent::CacheHit {
            type_name: type_name.to_owned(),
        });
    }

    fn on_dispatch(&mut self, proxy: ProxyId, op: Op, attr: Option<&str>, resolution: Resolution, depth: usize) {
        self.record(TraceEvent::Dispatch {
            proxy,
            op,
            attr: attr.map(String::from),
            resolution,
            depth,
        });
    }

    fn on_depth_exceeded(&mut self, limit: usize) {
        self.record(TraceEvent::DepthExceeded { limit });
    }
}

//! Mock collaborators shared by the executor and orchestrator tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::flow::FlowMeasurement;
use crate::plan::FlowSpec;
use crate::topology::{Host, Topology};
use crate::traits::{FlowMeter, ListenerControl, ListenerError, MeterError};

/// Topology of `n` hosts named host1..hostN
pub(crate) fn topology(n: usize) -> Topology {
    let hosts = (0..n)
        .map(|i| {
            Host::new(
                format!("host{}", i + 1),
                format!("192.168.200.{}", 31 + i),
                format!("192.168.10.{}", 1 + i),
            )
        })
        .collect();
    Topology::from_hosts(hosts).expect("valid topology")
}

// ============================================================================
// Mock FlowMeter
// ============================================================================

#[derive(Clone, Copy)]
pub(crate) enum Behavior {
    Hang,
    Fail,
    Malformed,
    Panic,
    Rate(f64),
}

pub(crate) struct MockMeter {
    bandwidth_bps: f64,
    cpu_percent: f64,
    delay: Option<Duration>,
    behaviors: HashMap<(String, String), Behavior>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    per_source: Mutex<HashMap<String, (usize, usize)>>,
    seen: Mutex<Vec<(String, String, FlowSpec)>>,
}

impl MockMeter {
    pub(crate) fn new(bandwidth_gbps: f64) -> Self {
        Self {
            bandwidth_bps: bandwidth_gbps * 1e9,
            cpu_percent: 10.0,
            delay: None,
            behaviors: HashMap::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            per_source: Mutex::new(HashMap::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn on(mut self, src: &str, dst: &str, behavior: Behavior) -> Self {
        self.behaviors
            .insert((src.to_string(), dst.to_string()), behavior);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent flows any single source reached
    pub(crate) fn max_per_source(&self) -> usize {
        self.per_source
            .lock()
            .unwrap()
            .values()
            .map(|&(_, max)| max)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn seen(&self) -> Vec<(String, String, FlowSpec)> {
        self.seen.lock().unwrap().clone()
    }
}

struct InFlight<'a> {
    meter: &'a MockMeter,
    src: String,
}

impl<'a> InFlight<'a> {
    fn enter(meter: &'a MockMeter, src: &str) -> Self {
        let now = meter.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        meter.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let mut per_source = meter.per_source.lock().unwrap();
        let entry = per_source.entry(src.to_string()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 = entry.1.max(entry.0);

        Self {
            meter,
            src: src.to_string(),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.meter.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(entry) = self.meter.per_source.lock().unwrap().get_mut(&self.src) {
            entry.0 -= 1;
        }
    }
}

#[async_trait]
impl FlowMeter for MockMeter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn measure(
        &self,
        src: &Host,
        dst: &Host,
        spec: &FlowSpec,
    ) -> Result<FlowMeasurement, MeterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((src.name.clone(), dst.name.clone(), *spec));

        let _guard = InFlight::enter(self, &src.name);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.behaviors.get(&(src.name.clone(), dst.name.clone())) {
            Some(Behavior::Hang) => std::future::pending().await,
            Some(Behavior::Fail) => Err(MeterError::Remote("connection refused".into())),
            Some(Behavior::Malformed) => Ok(FlowMeasurement::new(f64::NAN, 0, 0.0)),
            Some(Behavior::Panic) => panic!("meter blew up"),
            Some(Behavior::Rate(gbps)) => {
                Ok(FlowMeasurement::new(gbps * 1e9, 0, self.cpu_percent))
            }
            None => Ok(FlowMeasurement::new(self.bandwidth_bps, 0, self.cpu_percent)),
        }
    }
}

// ============================================================================
// Mock ListenerControl
// ============================================================================

#[derive(Default)]
pub(crate) struct MockListeners {
    starts: AtomicUsize,
    stops: AtomicUsize,
    failing: HashSet<String>,
    events: Mutex<Vec<String>>,
    cancel_after_stops: Option<(usize, CancellationToken)>,
}

impl MockListeners {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_on(mut self, host: &str) -> Self {
        self.failing.insert(host.to_string());
        self
    }

    /// Fire `token` once `stops` stop calls have been made
    pub(crate) fn cancel_after_stops(mut self, stops: usize, token: CancellationToken) -> Self {
        self.cancel_after_stops = Some((stops, token));
        self
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListenerControl for MockListeners {
    async fn start(&self, host: &Host) -> Result<(), ListenerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(format!("start:{}", host.name));
        if self.failing.contains(&host.name) {
            return Err(ListenerError::new(&host.name, "permission denied"));
        }
        Ok(())
    }

    async fn stop(&self, host: &Host) -> Result<(), ListenerError> {
        let stops = self.stops.fetch_add(1, Ordering::SeqCst) + 1;
        self.events.lock().unwrap().push(format!("stop:{}", host.name));
        if let Some((after, token)) = &self.cancel_after_stops {
            if stops >= *after {
                token.cancel();
            }
        }
        if self.failing.contains(&host.name) {
            return Err(ListenerError::new(&host.name, "no such process"));
        }
        Ok(())
    }
}

// Aggregation service - windowed fan-out of sample batches into per-key history
use crate::domain::events::{EventBus, TelemetryEvent};
use crate::domain::history::{BoundedHistory, HistoryChange};
use crate::domain::telemetry::{SampleBatch, SampleKey, SeriesInfo, SeriesSnapshot};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// ~60 Hz, bounds the renderer's update rate independently of the firmware's sample rate
pub const AGGREGATION_WINDOW: Duration = Duration::from_micros(16_700);

struct Series {
    info: SeriesInfo,
    history: BoundedHistory<f64>,
    primed: bool,
}

/// Per-session set of series, indexed by first-observation order
pub struct SeriesRegistry {
    series: Vec<Series>,
    index_by_key: HashMap<SampleKey, usize>,
    capacity: usize,
    events: EventBus,
}

impl SeriesRegistry {
    pub fn new(capacity: usize, events: EventBus) -> Self {
        Self {
            series: Vec::new(),
            index_by_key: HashMap::new(),
            capacity,
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn info(&self, key: SampleKey) -> Option<&SeriesInfo> {
        self.index_by_key.get(&key).map(|&i| &self.series[i].info)
    }

    pub fn values(&self, key: SampleKey) -> Option<Vec<f64>> {
        self.index_by_key
            .get(&key)
            .map(|&i| self.series[i].history.to_vec())
    }

    pub fn snapshot(&self) -> Vec<SeriesSnapshot> {
        self.series
            .iter()
            .map(|s| SeriesSnapshot {
                info: s.info.clone(),
                values: s.history.to_vec(),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.series.clear();
        self.index_by_key.clear();
    }

    /// One aggregation pass over every batch that arrived during a window
    pub fn apply_window(&mut self, batches: &[SampleBatch]) {
        let mut pending: BTreeMap<usize, Vec<f64>> = BTreeMap::new();

        for batch in batches {
            for reading in &batch.readings {
                let index = self.ensure_series(reading.id);
                pending
                    .entry(index)
                    .or_default()
                    .push(f64::from(reading.value));
            }
        }

        for (index, values) in pending {
            let series = &mut self.series[index];

            if !series.primed
                && series.history.is_empty()
                && values.len() <= series.history.capacity()
            {
                for value in values {
                    series.history.push(value);
                }
            } else {
                let mut bulk = series.history.bulk_update();
                let excess = (bulk.len() + values.len()).saturating_sub(bulk.capacity());
                bulk.evict_front(excess);
                for value in values {
                    bulk.push(value);
                }
            }

            series.primed = true;
        }
    }

    fn ensure_series(&mut self, key: SampleKey) -> usize {
        if let Some(&index) = self.index_by_key.get(&key) {
            return index;
        }

        let index = self.series.len();
        let info = SeriesInfo::new(key, index);
        let events = self.events.clone();
        let history = BoundedHistory::with_listener(
            self.capacity,
            Box::new(move |_: &HistoryChange<f64>, items: &VecDeque<f64>| {
                events.publish(TelemetryEvent::SeriesChanged {
                    key,
                    values: items.iter().copied().collect(),
                });
            }),
        );

        tracing::info!("New series {} (index {}, color {})", info.label, index, info.color);
        self.series.push(Series {
            info: info.clone(),
            history,
            primed: false,
        });
        self.index_by_key.insert(key, index);
        self.events.publish(TelemetryEvent::SeriesCreated(info));

        index
    }
}

/// Spawn the single task that owns window flushing for one connection
pub fn spawn_aggregator(
    registry: Arc<Mutex<SeriesRegistry>>,
    batches: mpsc::UnboundedReceiver<SampleBatch>,
    window: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(aggregate(registry, batches, window, cancel))
}

async fn aggregate(
    registry: Arc<Mutex<SeriesRegistry>>,
    mut batches: mpsc::UnboundedReceiver<SampleBatch>,
    window: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: Vec<SampleBatch> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if !pending.is_empty() {
                    let window_batches = std::mem::take(&mut pending);
                    tracing::trace!("Flushing {} batches", window_batches.len());
                    registry.lock().apply_window(&window_batches);
                }
            }
            batch = batches.recv() => match batch {
                Some(batch) => pending.push(batch),
                None => break,
            },
        }
    }

    tracing::debug!("Aggregator exiting with {} unflushed batches", pending.len());
}

use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Process-wide count of open source handles, shared by every budget.
#[derive(Clone, Debug, Default)]
pub struct HandleGauge {
    inner: Arc<GaugeInner>,
}

#[derive(Debug, Default)]
struct GaugeInner {
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl HandleGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) -> usize {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Highest number of handles that were open at the same time.
    pub fn peak(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    fn opened(&self) {
        let now = self.inner.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn closed(&self) {
        self.inner.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded cache of open source readers with evict-oldest-opened policy.
///
/// At most `capacity` readers are open at any instant: the oldest one is
/// closed before a new one is opened. An evicted source is simply reopened
/// by its next `acquire`.
pub struct HandleBudget {
    capacity: usize,
    order: VecDeque<usize>,
    handles: FxHashMap<usize, BufReader<File>>,
    gauge: HandleGauge,
    opens: usize,
    evictions: usize,
}

impl HandleBudget {
    pub fn new(capacity: usize, gauge: HandleGauge) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            handles: FxHashMap::default(),
            gauge,
            opens: 0,
            evictions: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_open(&self, index: usize) -> bool {
        self.handles.contains_key(&index)
    }

    pub fn opens(&self) -> usize {
        self.opens
    }

    pub fn evictions(&self) -> usize {
        self.evictions
    }

    pub fn gauge(&self) -> &HandleGauge {
        &self.gauge
    }

    /// Returns the reader for `index`, opening `path` if it is not cached.
    pub fn acquire(&mut self, index: usize, path: &Path) -> io::Result<&mut BufReader<File>> {
        if !self.handles.contains_key(&index) {
            while self.order.len() >= self.capacity {
                self.evict_oldest();
            }
            let file = File::open(path)?;
            self.gauge.opened();
            self.opens += 1;
            self.order.push_back(index);
            self.handles.insert(index, BufReader::new(file));
        }
        self.handles
            .get_mut(&index)
            .ok_or_else(|| io::Error::other(format!("handle {} missing after open", index)))
    }

    /// Closes the handle for `index` if it is open.
    pub fn close(&mut self, index: usize) {
        if self.handles.remove(&index).is_some() {
            self.order.retain(|&open| open != index);
            self.gauge.closed();
        }
    }

    /// Moves another budget's open handles in behind this budget's, oldest first.
    pub fn absorb(&mut self, mut other: HandleBudget) {
        let order = std::mem::take(&mut other.order);
        let mut handles = std::mem::take(&mut other.handles);
        self.opens += other.opens;
        self.evictions += other.evictions;

        for index in order {
            if let Some(reader) = handles.remove(&index) {
                self.order.push_back(index);
                self.handles.insert(index, reader);
            }
        }
        while self.order.len() > self.capacity {
            self.evict_oldest();
        }
    }

    /// Closes every remaining handle and returns how many were open.
    pub fn release_all(&mut self) -> usize {
        let mut closed = 0;
        while let Some(index) = self.order.pop_front() {
            if self.handles.remove(&index).is_some() {
                self.gauge.closed();
                closed += 1;
            }
        }
        closed
    }

    fn evict_oldest(&mut self) {
        if let Some(index) = self.order.pop_front() {
            if self.handles.remove(&index).is_some() {
                self.gauge.closed();
                self.evictions += 1;
                debug!(source = index, "evicted source handle");
            }
        }
    }
}

impl Drop for HandleBudget {
    fn drop(&mut self) {
        self.release_all();
    }
}

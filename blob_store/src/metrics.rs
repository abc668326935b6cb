//! Latency and error instruments around any [`BlobStore`].

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use opentelemetry::{
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

use crate::{BlobResult, BlobStore, StorageKind};

/// Wraps a backend and records `blob_storage_operation_duration_seconds` and
/// `blob_storage_errors_total`, labelled by backend and operation.
///
/// A `None` result from `get` counts as success.
pub struct InstrumentedBlobStore {
    inner: Arc<dyn BlobStore>,
    backend: StorageKind,
    durations: Histogram<f64>,
    errors: Counter<u64>,
}

impl InstrumentedBlobStore {
    pub fn new(inner: Arc<dyn BlobStore>, backend: StorageKind, meter: &Meter) -> Self {
        let durations = meter
            .f64_histogram("blob_storage_operation_duration_seconds")
            .with_description("Duration of blob storage operations in seconds")
            .build();
        let errors = meter
            .u64_counter("blob_storage_errors_total")
            .with_description("Total number of blob storage errors")
            .build();
        Self {
            inner,
            backend,
            durations,
            errors,
        }
    }

    fn labels(&self, operation: &'static str) -> [KeyValue; 2] {
        [
            KeyValue::new("backend", self.backend.as_ref().to_string()),
            KeyValue::new("operation", operation),
        ]
    }

    fn observe<T>(&self, result: &BlobResult<T>, labels: &[KeyValue]) {
        if result.is_err() {
            self.errors.add(1, labels);
        }
    }
}

/// Records the elapsed time into the histogram when dropped, so early returns
/// and cancelled futures are measured too.
struct Timer<'a> {
    start: Instant,
    histogram: &'a Histogram<f64>,
    labels: &'a [KeyValue],
}

impl<'a> Timer<'a> {
    fn start(histogram: &'a Histogram<f64>, labels: &'a [KeyValue]) -> Self {
        Self {
            start: Instant::now(),
            histogram,
            labels,
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.histogram
            .record(self.start.elapsed().as_secs_f64(), self.labels);
    }
}

#[async_trait]
impl BlobStore for InstrumentedBlobStore {
    async fn put(&self, id: &str, data: Vec<u8>) -> BlobResult<()> {
        let labels = self.labels("put");
        let _timer = Timer::start(&self.durations, &labels);
        let result = self.inner.put(id, data).await;
        self.observe(&result, &labels);
        result
    }

    async fn get(&self, id: &str) -> BlobResult<Option<Vec<u8>>> {
        let labels = self.labels("get");
        let _timer = Timer::start(&self.durations, &labels);
        let result = self.inner.get(id).await;
        self.observe(&result, &labels);
        result
    }
}

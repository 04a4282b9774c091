use prometheus::{Counter, Gauge, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

/// Prometheus metrics for the search service
#[derive(Clone)]
pub struct SearchMetrics {
    // Counters
    pub documents_added: Counter,
    pub documents_deleted: Counter,
    pub searches_total: Counter,
    pub search_errors: Counter,
    pub compactions_total: Counter,

    // Gauges
    pub total_documents: Gauge,
    pub store_size_bytes: Gauge,

    // Histograms
    pub write_latency: Histogram,
    pub search_latency: Histogram,

    registry: Arc<Registry>,
}

const LATENCY_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

impl SearchMetrics {
    /// Create a new SearchMetrics instance with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let documents_added = Counter::with_opts(Opts::new(
            "hamfts_documents_added_total",
            "Total number of documents added",
        ))?;
        registry.register(Box::new(documents_added.clone()))?;

        let documents_deleted = Counter::with_opts(Opts::new(
            "hamfts_documents_deleted_total",
            "Total number of documents deleted",
        ))?;
        registry.register(Box::new(documents_deleted.clone()))?;

        let searches_total = Counter::with_opts(Opts::new(
            "hamfts_searches_total",
            "Total number of searches",
        ))?;
        registry.register(Box::new(searches_total.clone()))?;

        let search_errors = Counter::with_opts(Opts::new(
            "hamfts_search_errors_total",
            "Total number of failed searches",
        ))?;
        registry.register(Box::new(search_errors.clone()))?;

        let compactions_total = Counter::with_opts(Opts::new(
            "hamfts_compactions_total",
            "Total number of completed compactions",
        ))?;
        registry.register(Box::new(compactions_total.clone()))?;

        let total_documents = Gauge::with_opts(Opts::new(
            "hamfts_total_documents",
            "Current number of live documents",
        ))?;
        registry.register(Box::new(total_documents.clone()))?;

        let store_size_bytes = Gauge::with_opts(Opts::new(
            "hamfts_store_size_bytes",
            "Size of the document record log in bytes",
        ))?;
        registry.register(Box::new(store_size_bytes.clone()))?;

        let write_latency = Histogram::with_opts(
            HistogramOpts::new("hamfts_write_latency_seconds", "Add/delete latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(write_latency.clone()))?;

        let search_latency = Histogram::with_opts(
            HistogramOpts::new("hamfts_search_latency_seconds", "Search latency")
                .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        registry.register(Box::new(search_latency.clone()))?;

        Ok(Self {
            documents_added,
            documents_deleted,
            searches_total,
            search_errors,
            compactions_total,
            total_documents,
            store_size_bytes,
            write_latency,
            search_latency,
            registry: Arc::new(registry),
        })
    }

    /// Record `count` added documents
    pub fn record_add(&self, count: usize, duration_secs: f64) {
        self.documents_added.inc_by(count as f64);
        self.write_latency.observe(duration_secs);
    }

    pub fn record_delete(&self, duration_secs: f64) {
        self.documents_deleted.inc();
        self.write_latency.observe(duration_secs);
    }

    pub fn record_search(&self, duration_secs: f64) {
        self.searches_total.inc();
        self.search_latency.observe(duration_secs);
    }

    pub fn record_search_error(&self) {
        self.search_errors.inc();
    }

    pub fn record_compaction(&self) {
        self.compactions_total.inc();
    }

    /// Refresh gauges from the latest index stats
    pub fn set_index_size(&self, documents: usize, store_bytes: u64) {
        self.total_documents.set(documents as f64);
        self.store_size_bytes.set(store_bytes as f64);
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode_text(&self) -> Result<Vec<u8>, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

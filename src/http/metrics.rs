// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for gateway traffic.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
	requests: AtomicU64,
	unauthorized: AtomicU64,
	transport_failures: AtomicU64,
}
impl GatewayMetrics {
	/// Returns the total number of requests handed to the transport.
	pub fn requests(&self) -> u64 {
		self.requests.load(Ordering::Relaxed)
	}

	/// Returns the number of HTTP 401 responses observed.
	pub fn unauthorized(&self) -> u64 {
		self.unauthorized.load(Ordering::Relaxed)
	}

	/// Returns the number of requests that never produced a response.
	pub fn transport_failures(&self) -> u64 {
		self.transport_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_request(&self) {
		self.requests.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_unauthorized(&self) {
		self.unauthorized.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_transport_failure(&self) {
		self.transport_failures.fetch_add(1, Ordering::Relaxed);
	}
}

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Atomic request counters, rendered in Prometheus text format at `/metrics`.
///
/// Handler calls are counted by the middleware hooks. Requests rejected before
/// dispatch (404, 405, 422) are counted through [`MetricsMiddleware::record_rejection`].
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    top_level_requests: AtomicUsize,
    rejected_requests: AtomicUsize,
    status_2xx: AtomicUsize,
    status_4xx: AtomicUsize,
    status_5xx: AtomicUsize,
    stack_size: AtomicUsize,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached a handler.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Every request seen by the HTTP service, including infrastructure endpoints.
    pub fn inc_top_level_request(&self) {
        self.top_level_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn top_level_request_count(&self) -> usize {
        self.top_level_requests.load(Ordering::Relaxed)
    }

    pub fn record_rejection(&self, status: u16) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
        self.record_status(status);
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected_requests.load(Ordering::Relaxed)
    }

    /// Responses counted by status class: (2xx, 4xx, 5xx).
    pub fn status_counts(&self) -> (usize, usize, usize) {
        (
            self.status_2xx.load(Ordering::Relaxed),
            self.status_4xx.load(Ordering::Relaxed),
            self.status_5xx.load(Ordering::Relaxed),
        )
    }

    fn record_status(&self, status: u16) {
        let counter = match status {
            200..=299 => &self.status_2xx,
            400..=499 => &self.status_4xx,
            500..=599 => &self.status_5xx,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        let (ok, client, server) = self.status_counts();
        format!(
            "# HELP items_api_requests_total Requests received by the HTTP service\n\
             # TYPE items_api_requests_total counter\n\
             items_api_requests_total {top_level}\n\
             # HELP items_api_handler_requests_total Requests dispatched to a handler\n\
             # TYPE items_api_handler_requests_total counter\n\
             items_api_handler_requests_total {handled}\n\
             # HELP items_api_rejected_requests_total Requests rejected before dispatch\n\
             # TYPE items_api_rejected_requests_total counter\n\
             items_api_rejected_requests_total {rejected}\n\
             # HELP items_api_responses_total Responses by status class\n\
             # TYPE items_api_responses_total counter\n\
             items_api_responses_total{{class=\"2xx\"}} {ok}\n\
             items_api_responses_total{{class=\"4xx\"}} {client}\n\
             items_api_responses_total{{class=\"5xx\"}} {server}\n\
             # HELP items_api_handler_latency_seconds_avg Average handler latency\n\
             # TYPE items_api_handler_latency_seconds_avg gauge\n\
             items_api_handler_latency_seconds_avg {latency:.6}\n\
             # HELP items_api_coroutine_stack_bytes Handler coroutine stack size\n\
             # TYPE items_api_coroutine_stack_bytes gauge\n\
             items_api_coroutine_stack_bytes {stack}\n",
            top_level = self.top_level_request_count(),
            handled = self.request_count(),
            rejected = self.rejected_count(),
            latency = self.average_latency().as_secs_f64(),
            stack = self.stack_size.load(Ordering::Relaxed),
        )
    }
}

impl Middleware for MetricsMiddleware {
    fn before(&self, _req: &HandlerRequest) -> Option<HandlerResponse> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn after(&self, _req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        self.record_status(res.status);
        let stack = if may::coroutine::is_coroutine() {
            may::coroutine::current().stack_size()
        } else {
            may::config().get_stack_size()
        };
        self.stack_size.store(stack, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        let m = MetricsMiddleware::new();
        m.record_rejection(404);
        m.record_rejection(422);
        m.record_status(200);
        m.record_status(503);
        assert_eq!(m.status_counts(), (1, 2, 1));
        assert_eq!(m.rejected_count(), 2);
        assert_eq!(m.request_count(), 0);
        assert_eq!(m.average_latency(), Duration::ZERO);
    }

    #[test]
    fn test_prometheus_text() {
        let m = MetricsMiddleware::new();
        m.inc_top_level_request();
        m.record_rejection(405);
        let text = m.render_prometheus();
        assert!(text.contains("items_api_requests_total 1"));
        assert!(text.contains("items_api_responses_total{class=\"4xx\"} 1"));
        assert!(text.contains("# TYPE items_api_handler_latency_seconds_avg gauge"));
    }
}

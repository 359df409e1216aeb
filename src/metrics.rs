use metriken::{metric, Counter, LazyCounter};

// Question metrics
#[metric(
    name = "questions",
    description = "Questions submitted to the routing service",
    metadata = { status = "sent" }
)]
pub static QUESTIONS_SENT: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "questions",
    description = "Questions answered successfully",
    metadata = { status = "answered" }
)]
pub static QUESTIONS_ANSWERED: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "questions",
    description = "Questions with no answer after all attempts",
    metadata = { status = "failed" }
)]
pub static QUESTIONS_FAILED: LazyCounter = LazyCounter::new(Counter::default);

// Attempt metrics
#[metric(
    name = "request_retries",
    description = "Completion attempts retried after a transient failure"
)]
pub static REQUEST_RETRIES: LazyCounter = LazyCounter::new(Counter::default);

#[metric(
    name = "rate_limit_hits",
    description = "Rate-limit responses received from the routing service"
)]
pub static RATE_LIMIT_HITS: LazyCounter = LazyCounter::new(Counter::default);

pub struct Metrics;

impl Metrics {
    pub fn record_sent() {
        QUESTIONS_SENT.increment();
    }

    pub fn record_success() {
        QUESTIONS_ANSWERED.increment();
    }

    pub fn record_failed() {
        QUESTIONS_FAILED.increment();
    }

    pub fn record_retry() {
        REQUEST_RETRIES.increment();
    }

    pub fn record_rate_limited() {
        RATE_LIMIT_HITS.increment();
    }

    pub fn retries() -> u64 {
        REQUEST_RETRIES.value()
    }

    pub fn rate_limits() -> u64 {
        RATE_LIMIT_HITS.value()
    }
}

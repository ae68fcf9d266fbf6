use crate::domain::payment::PaymentSubmission;
use crate::gateways::{HealthReport, PaymentProcessor, ProcessorError};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    AlwaysAccept,
    AlwaysDuplicate,
    AlwaysFailure,
}

impl MockBehavior {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => MockBehavior::AlwaysDuplicate,
            2 => MockBehavior::AlwaysFailure,
            _ => MockBehavior::AlwaysAccept,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            MockBehavior::AlwaysAccept => 0,
            MockBehavior::AlwaysDuplicate => 1,
            MockBehavior::AlwaysFailure => 2,
        }
    }
}

/// In-process processor whose answers can be flipped while it is shared.
pub struct MockProcessor {
    behavior: AtomicU8,
    failing: AtomicBool,
    health_unreachable: AtomicBool,
    health_delay_ms: AtomicU64,
    submissions: AtomicUsize,
    health_checks: AtomicUsize,
}

impl MockProcessor {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: AtomicU8::new(behavior.as_u8()),
            failing: AtomicBool::new(false),
            health_unreachable: AtomicBool::new(false),
            health_delay_ms: AtomicU64::new(0),
            submissions: AtomicUsize::new(0),
            health_checks: AtomicUsize::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        self.behavior.store(behavior.as_u8(), Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_health_unreachable(&self, unreachable: bool) {
        self.health_unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_health_delay(&self, delay: Duration) {
        self.health_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn health_checks(&self) -> usize {
        self.health_checks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PaymentProcessor for MockProcessor {
    async fn submit(&self, _submission: &PaymentSubmission) -> Result<(), ProcessorError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        match MockBehavior::from_u8(self.behavior.load(Ordering::SeqCst)) {
            MockBehavior::AlwaysAccept => Ok(()),
            MockBehavior::AlwaysDuplicate => Err(ProcessorError::AlreadyProcessed),
            MockBehavior::AlwaysFailure => Err(ProcessorError::Rejected {
                status: 500,
                body: "mock failure".to_string(),
            }),
        }
    }

    async fn health(&self) -> Result<HealthReport, ProcessorError> {
        self.health_checks.fetch_add(1, Ordering::SeqCst);
        let delay = self.health_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.health_unreachable.load(Ordering::SeqCst) {
            return Err(ProcessorError::Decode("mock health unreachable".to_string()));
        }
        Ok(HealthReport {
            failing: self.failing.load(Ordering::SeqCst),
            min_response_time: 0,
        })
    }
}

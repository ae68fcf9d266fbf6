pub mod config;
pub mod domain {
    pub mod payment;
}
pub mod gateways;
pub mod http;
pub mod repo {
    pub mod payments_repo;
}
pub mod router {
    pub mod health;
    pub mod processor_router;
}
pub mod service {
    pub mod payment_service;
}
pub mod storage;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub payment_service: service::payment_service::PaymentService,
    pub payment_wait_timeout: Option<Duration>,
    /// Parent of every request's cancel token.
    pub shutdown: CancellationToken,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub connections: usize,
    pub online_users: usize,
    pub registered_handlers: usize,
}

impl HealthCheckResponse {
    /// A bus with no handlers can only ever answer with failures.
    pub fn new(connections: usize, online_users: usize, registered_handlers: usize) -> Self {
        let status = if registered_handlers == 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            timestamp: Utc::now(),
            connections,
            online_users,
            registered_handlers,
        }
    }
}

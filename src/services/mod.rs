pub mod background_service;
pub mod discovery_service;
pub mod job_scheduler_service;
pub mod rate_limiter;

pub mod cycle_service;
pub mod execution_service;
pub mod report;
pub mod telegram_service;

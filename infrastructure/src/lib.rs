pub mod command;
pub mod config;
pub mod job_scheduler;

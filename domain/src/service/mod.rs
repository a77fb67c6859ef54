mod job_scheduler;

#[cfg(test)]
pub use self::job_scheduler::MockJobScheduler;
pub use self::job_scheduler::JobScheduler;

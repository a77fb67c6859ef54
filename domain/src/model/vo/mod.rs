pub mod hold;
pub mod job_id;
pub mod job_info;
pub mod resources;

#[rustfmt::skip]
pub use self::{
    hold::{HoldType, KNOWN_HOLD_TYPES},
    job_id::JobId,
    job_info::{JobInfo, JobState},
    resources::{MailEvent, ResourceSpec},
};

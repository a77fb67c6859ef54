mod models;
mod slurm_client;

#[rustfmt::skip]
pub use self::{
    models::*,
    slurm_client::*
};

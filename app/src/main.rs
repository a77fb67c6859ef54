mod cli;
mod config;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use domain::model::vo::JobId;
use domain::service::JobScheduler;
use infrastructure::job_scheduler::build_scheduler;
use service::prelude::*;
use tracing_subscriber::EnvFilter;

use self::cli::{Cli, Command};
use self::config::{build_config, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config =
        build_config(cli.config.as_deref()).with_context(|| "Failed to build config".red())?;
    if let Some(timeout) = cli.timeout {
        config.scheduler.timeout = timeout;
    }
    init_logger(&config.log).with_context(|| "Failed to initialize logger".red())?;

    let scheduler = build_scheduler(&config.scheduler);
    match cli.command {
        Command::Submit { batch, hold } => submit(scheduler.as_ref(), &batch, hold).await,
        Command::Plan { batch } => plan(&batch),
        Command::Info { job_id, attrs } => info(scheduler.as_ref(), &job_id, attrs).await,
    }
}

fn init_logger(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

fn read_batch(path: &Path) -> anyhow::Result<Vec<JobSpec>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open batch file {}", path.display()).red())?;
    serde_yaml::from_reader(file)
        .with_context(|| format!("Cannot parse batch file {}", path.display()).red())
}

async fn submit(scheduler: &dyn JobScheduler, batch: &Path, hold: bool) -> anyhow::Result<()> {
    let specs = read_batch(batch)?;
    let jobs = match BatchSubmitter::new(scheduler).with_hold(hold).submit_all(specs).await {
        Ok(jobs) => jobs,
        Err(BatchError::Job {
            name,
            source,
            submitted,
        }) => {
            for (name, id) in &submitted {
                println!("{name}\t{id}");
            }
            return Err(source).with_context(|| format!("Job `{name}` was not submitted").red());
        }
        Err(e) => return Err(e).with_context(|| "Invalid batch".red()),
    };

    for job in &jobs {
        if let Some(id) = job.id() {
            println!("{}\t{id}", job.name());
        }
    }
    Ok(())
}

fn plan(batch: &Path) -> anyhow::Result<()> {
    let specs = read_batch(batch)?;
    let order = BatchSubmitter::<dyn JobScheduler>::plan(&specs).context("Invalid batch".red())?;
    for i in order {
        let spec = &specs[i];
        if spec.after.is_empty() {
            println!("{}", spec.name);
        } else {
            println!("{}\tafter {}", spec.name, spec.after.join(","));
        }
    }
    Ok(())
}

async fn info(scheduler: &dyn JobScheduler, job_id: &str, attrs: Vec<String>) -> anyhow::Result<()> {
    let id = JobId::from_numeric(job_id)
        .with_context(|| format!("`{job_id}` is not a job id").red())?;
    let types = (!attrs.is_empty()).then_some(attrs);
    let info = scheduler
        .query(&id, types, scheduler.default_timeout())
        .await
        .with_context(|| format!("Cannot query job {id}").red())?;

    tracing::info!(job_id = %id, state = ?info.state(), "Job info");
    println!("{}", serde_json::to_string_pretty(info.attributes())?);
    Ok(())
}

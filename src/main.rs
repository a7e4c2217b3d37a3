use colored::Colorize;
use log::LevelFilter;

use crate::args::Args;
use crate::job::Job;
use crate::pipeline::Invoker;
use crate::tools::Toolchain;

mod args;
mod download;
mod error;
mod job;
mod pipeline;
mod progress;
mod tools;
mod transcode;

#[tokio::main]
async fn main() {
    let args: Args = argh::from_env();
    init_logger(args.verbose);

    if let Err(err) = run(args).await {
        log::debug!("{:?}", err);
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(error::exit_code(&err));
    }
}

fn init_logger(verbose: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let job = Job::from_args(&args)?;
    let accelerator = job.accelerator.is_some();
    let transcode = job.transcode.is_some();

    if args.dry_run {
        let invoker = Invoker::new(job, Toolchain::unresolved(accelerator, transcode));
        for command in invoker.commands() {
            println!("{}", command);
        }
        return Ok(());
    }

    let tools = Toolchain::resolve(accelerator, transcode)?;
    for output in Invoker::new(job, tools).run().await? {
        println!("{} {}", "Saved to".green(), output.display());
    }

    Ok(())
}

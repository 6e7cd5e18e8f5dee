// src/main.rs

use taskflow::{SchedulerState, cli, logging, run};

fn main() {
    match run_main() {
        Ok(SchedulerState::Aborted) => std::process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("taskflow error: {err:?}");
            std::process::exit(1);
        }
    }
}

fn run_main() -> anyhow::Result<SchedulerState> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args)
}

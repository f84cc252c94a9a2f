// src/main.rs

use pipedag::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("pipedag error: {err:?}");
        std::process::exit(1);
    }

    match run(args).await {
        Ok(report) => {
            if !report.success() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("pipedag error: {err:?}");
            std::process::exit(1);
        }
    }
}

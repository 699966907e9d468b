use clap::Parser;

use summarizex_lib::cli::Cli;
use summarizex_lib::error::CommandError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    summarizex_lib::init_logging(&[
        "summarizex=info",
        "summarizex_lib=info",
        "summarizex_core=info",
    ]);

    if let Err(e) = summarizex_lib::run(cli).await {
        // With --json the report already lists per-document failures
        let reported = matches!(e, CommandError::PipelineError { kind: None, .. });
        if json && !reported {
            match serde_json::to_string(&e) {
                Ok(body) => println!("{}", body),
                Err(_) => eprintln!("Error: {}", e),
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

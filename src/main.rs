use clap::Parser;
use restloader::app;
use restloader::core::config::{self, CliOverrides};
use restloader::loader::HttpVerb;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "restloader", about = "Load a REST search in the background and list the results")]
struct Args {
    /// HTTP method for the request
    #[arg(short, long, value_enum)]
    method: Option<HttpVerb>,

    /// Endpoint URI
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Request parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = config::parse_param)]
    params: Vec<(String, String)>,

    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> std::io::Result<ExitCode> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}, falling back to defaults");
            Default::default()
        }
    };
    let cli = CliOverrides {
        method: args.method,
        endpoint: args.endpoint,
        params: args.params,
        timeout_secs: args.timeout,
    };
    let resolved = config::resolve(&file_config, &cli);

    // Initialize file logger
    let log_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();

    if let Ok(log_file) = File::create(&resolved.log_file) {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    log::info!(
        "restloader starting: {} {}",
        resolved.method,
        resolved.endpoint
    );

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let shown = app::run(
        &resolved,
        tokio::runtime::Handle::current(),
        &mut stdout.lock(),
        &mut stderr.lock(),
    )?;

    Ok(if shown {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

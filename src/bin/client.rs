//! rawhttp client: fetch a document and mirror it with its images

use clap::Parser;
use rawhttp::config::ClientConfig;
use rawhttp::fetch::{self, Target};
use rawhttp::http::Method;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rawhttp-client")]
#[command(about = "Send one HTTP/1.1 request and mirror the result", long_about = None)]
struct Cli {
    /// HEAD, GET, PUT or POST
    #[arg(value_parser = parse_method)]
    method: Method,

    /// Host with optional path, e.g. www.example.com/index.html
    url: String,

    /// Port to connect to
    port: u16,

    /// Directory the mirrored files are written under
    #[arg(short, long, default_value = "..")]
    out: PathBuf,
}

fn parse_method(value: &str) -> Result<Method, String> {
    value.parse().map_err(|_| format!("unsupported method {}", value))
}

fn read_body() -> io::Result<Vec<u8>> {
    print!("Enter data to insert: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).as_bytes().to_vec())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rawhttp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let target = match Target::parse(&cli.url) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let body = if cli.method.is_write() {
        match read_body() {
            Ok(body) => body,
            Err(e) => {
                eprintln!("error: cannot read body: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        Vec::new()
    };

    let config = ClientConfig::default().output_dir(cli.out);

    match fetch::run(cli.method, &target, cli.port, &body, &config) {
        Ok(outcome) => {
            let response = &outcome.response;
            println!("{} {} {}", response.version(), response.status().code(), response.reason());
            print!("{}", response.headers());

            if let Some(file) = &outcome.document {
                println!("saved {}", file.display());
            }
            for file in &outcome.resources {
                println!("saved {}", file.display());
            }
            for (reference, e) in &outcome.failed {
                eprintln!("failed {}: {}", reference, e);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

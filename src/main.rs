//! Serve one emulated GET from the local filesystem and print the response
//!
//! Usage: `httpsim [--config FILE] PATH [Header: value ...]`

use clap::Parser;
use httpsim::config::Config;
use httpsim::context::{RequestContext, ResponseContext};
use httpsim::logger;
use httpsim::transfer::{EventLog, FsStore, TransferPipeline};

const DEFAULT_CONFIG: &str = "httpsim";

#[derive(Debug, Parser)]
#[command(name = "httpsim", version)]
#[command(about = "Serve one emulated GET from the local filesystem")]
struct Args {
    /// Configuration file, without or with extension
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Request target, optionally with a query string
    path: String,

    /// Request headers as `Name: value`
    #[arg(value_name = "HEADER", value_parser = parse_header)]
    headers: Vec<(String, String)>,
}

fn parse_header(arg: &str) -> Result<(String, String), String> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{arg}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in `{arg}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let cfg = Config::load_from(args.config.as_deref().unwrap_or(DEFAULT_CONFIG))?;
    logger::init(&cfg.logging)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async_main(cfg, args))
}

async fn async_main(cfg: Config, args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut pipeline = TransferPipeline::new(FsStore::new(), cfg.send.clone())?;
    if cfg.logging.access_log {
        pipeline = pipeline.with_access_log(cfg.logging.access_log_format.clone());
    }

    let mut req = RequestContext::get(args.path);
    for (name, value) in &args.headers {
        req = req.with_header(name, value)?;
    }

    let mut res = ResponseContext::new();
    let mut events = EventLog::new();
    let outcome = pipeline.transfer(&req, &mut res, &mut events).await;

    println!(
        "HTTP/1.1 {} {}",
        res.status(),
        res.status_message().unwrap_or_default()
    );
    for (name, value) in res.headers() {
        println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
    }
    println!();
    println!("[events] {}", events.names().join(" -> "));
    println!("[body] {} bytes", res.body().len());
    if let Some(err) = outcome.error {
        println!("[error] {err}");
    }
    Ok(())
}

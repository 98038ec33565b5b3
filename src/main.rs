//! rswebscan 命令行入口：扫描结果以 JSON 输出到 stdout，日志输出到 stderr

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use rswebscan::{
    default_info_modules, default_probes, BasicAuth, RetryPolicy, RuleLoader, ScanConfig, Scanner, TechnologyDatabase,
};

#[derive(Debug, Parser)]
#[command(name = "rswebscan", version, about = "Scan a website")]
struct Args {
    /// URL to scan
    #[arg(short, long)]
    url: String,

    /// Output json file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Cookie
    #[arg(short, long)]
    cookie: Option<String>,

    /// User Agent
    #[arg(short = 'a', long)]
    user_agent: Option<String>,

    /// HTTP Headers, e.g. "X-Api-Key: abc"
    #[arg(short = 'H', long = "headers", num_args = 0..)]
    headers: Vec<String>,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 60)]
    timeout: u64,

    /// Number of retries
    #[arg(short, long, default_value_t = 3)]
    retries: u32,

    /// Limits the number of HTTP requests per second
    #[arg(short = 'l', long)]
    rate_limit: Option<u32>,

    /// Maximum crawler depth
    #[arg(short, long, default_value_t = 3)]
    depth: u32,

    /// Paths to ignore e.g. /logout
    #[arg(short, long, num_args = 0.., default_values_t = vec!["/logout".to_string()])]
    ignore: Vec<String>,

    /// HTTP Proxy
    #[arg(long)]
    proxy: Option<String>,

    /// Basic Authentication <username>:<password>
    #[arg(long)]
    auth: Option<String>,

    /// Do not fill empty parameter values in probe requests
    #[arg(long = "no-fill")]
    no_fill: bool,

    /// Scan for vulnerabilities
    #[arg(long)]
    vulnerabilities: bool,

    /// Maximum directory traversal depth for LFI checks
    #[arg(long, default_value_t = 5)]
    lfi_depth: u32,

    /// WordPress user ids to enumerate
    #[arg(long, num_args = 1.., default_values_t = (1..20).collect::<Vec<u32>>())]
    wordpress_user_ids: Vec<u32>,

    /// Threshold for the technology identification (0-100)
    #[arg(long, default_value_t = 80)]
    confidence_threshold: u8,

    /// Technology database (JSON)
    #[arg(long, requires = "categories")]
    technologies: Option<PathBuf>,

    /// Category table (JSON)
    #[arg(long, requires = "technologies")]
    categories: Option<PathBuf>,

    /// MessagePack cache for the technology database
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder(&args.url)
        .timeout(Duration::from_secs(args.timeout))
        .retry_policy(RetryPolicy::exponential(args.retries, 2.0))
        .rate_limit(args.rate_limit)
        .max_depth(args.depth)
        .ignore_paths(args.ignore.clone())
        .confidence_threshold(args.confidence_threshold)
        .cookie(args.cookie.clone())
        .proxy(args.proxy.clone())
        .fill(!args.no_fill)
        .probe(args.vulnerabilities)
        .lfi_depth(args.lfi_depth)
        .wordpress_user_ids(args.wordpress_user_ids.clone());

    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    for header in &args.headers {
        // 没有冒号的参数被忽略
        if let Some((name, value)) = header.split_once(':') {
            builder = builder.header(name, value);
        }
    }
    if let Some(auth) = &args.auth {
        builder = builder.auth(Some(BasicAuth::parse(auth)?));
    }

    Ok(builder.build()?)
}

async fn load_database(args: &Args) -> Result<TechnologyDatabase> {
    let (Some(technologies), Some(categories)) = (&args.technologies, &args.categories) else {
        warn!("未指定技术库，技术识别结果将为空");
        return Ok(TechnologyDatabase::default());
    };

    let database = match &args.cache {
        Some(cache) => RuleLoader::load_cached(technologies, categories, cache).await,
        None => RuleLoader::load_from_files(technologies, categories).await,
    };
    database.with_context(|| format!("加载技术库失败：{}", technologies.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = build_config(&args)?;
    let database = load_database(&args).await?;

    let scanner = Scanner::new(
        config,
        Arc::new(database),
        default_info_modules().instantiate_all(),
        default_probes().instantiate_all(),
    )?;
    let report = scanner.run().await;

    let json = serde_json::to_string_pretty(&report)?;
    if let Some(path) = &args.output {
        tokio::fs::write(path, &json)
            .await
            .with_context(|| format!("写入输出文件失败：{}", path.display()))?;
    }
    println!("{}", json);

    Ok(())
}

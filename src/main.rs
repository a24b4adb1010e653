/// Version injected at compile time via GDISCOVERY_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("GDISCOVERY_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use gdiscovery::config::Config;
use gdiscovery::gcp::auth::AdcCredentials;
use gdiscovery::gcp::client::{Auth, Client};
use gdiscovery::{CallArgs, GoogleApi, Lookup, Method, Request, Resource, Response, ResponseBody};
use serde_json::Value;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Google APIs from their Discovery Documents
#[derive(Parser, Debug)]
#[command(name = "gdiscovery", version, about, long_about = None)]
struct Args {
    /// Discovery document to load instead of discovering one
    #[arg(long, global = true)]
    doc: Option<PathBuf>,

    /// API to discover, e.g. "youtube"
    #[arg(long, global = true)]
    api: Option<String>,

    /// API version; the preferred version when omitted
    #[arg(long, global = true)]
    api_version: Option<String>,

    /// API key (overrides config and GOOGLE_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Validate arguments against the discovery document
    #[arg(long, global = true)]
    validate: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List resources, methods and parameters
    Describe {
        /// Dotted resource or method path, e.g. "videos.list"
        path: Option<String>,
    },
    /// Print the request a method call would send
    Build(RequestArgs),
    /// Build a request and send it
    Call {
        #[command(flatten)]
        request: RequestArgs,

        /// Credentials to send with
        #[arg(long, value_enum, default_value = "auto")]
        auth: AuthMode,

        /// Follow nextPageToken, up to this many pages
        #[arg(long)]
        pages: Option<usize>,
    },
}

#[derive(ClapArgs, Debug)]
struct RequestArgs {
    /// Dotted method path, e.g. "videos.list"
    method: String,

    /// Parameter as name=value; repeat a name for repeated parameters
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,

    /// JSON request body
    #[arg(long)]
    json: Option<String>,

    /// File to upload
    #[arg(long)]
    upload: Option<PathBuf>,

    /// File to download the response into
    #[arg(long)]
    download: Option<PathBuf>,

    /// Request timeout in seconds (overrides config)
    #[arg(long)]
    timeout: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AuthMode {
    Auto,
    Anon,
    ApiKey,
    Adc,
}

impl From<AuthMode> for Auth {
    fn from(mode: AuthMode) -> Self {
        match mode {
            AuthMode::Auto => Auth::Auto,
            AuthMode::Anon => Auth::Anon,
            AuthMode::ApiKey => Auth::ApiKey,
            AuthMode::Adc => Auth::ServiceAccount,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got {raw:?}")),
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", log_path.display(), e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gdiscovery {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gdiscovery").join("gdiscovery.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gdiscovery").join("gdiscovery.log");
    }
    PathBuf::from("gdiscovery.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();
    let mut client = Client::new()?
        .with_discovery_root_url(&config.effective_discovery_root_url())
        .context("Invalid discovery root URL")?;
    if let Some(key) = config.effective_api_key(args.api_key.as_deref()) {
        client = client.with_api_key(key);
    }

    let api = load_api(&args, &mut config, &client)
        .await?
        .with_validation(args.validate || config.validate);

    match &args.command {
        Command::Describe { path } => describe(&api, path.as_deref())?,
        Command::Build(request) => {
            let built = build_request(&api, request, &config)?;
            print_request(&built);
        },
        Command::Call { request, auth, pages } => {
            let built = build_request(&api, request, &config)?;
            let use_adc = match auth {
                AuthMode::Adc => true,
                AuthMode::Auto => config.effective_api_key(args.api_key.as_deref()).is_none(),
                AuthMode::Anon | AuthMode::ApiKey => false,
            };
            if use_adc {
                let scopes = api_scopes(&api, &request.method)?;
                match AdcCredentials::new(&scopes).await {
                    Ok(credentials) => client = client.with_service_account(credentials),
                    Err(e) if matches!(auth, AuthMode::Auto) => {
                        tracing::warn!("No application default credentials, sending anonymously: {}", e);
                    },
                    Err(e) => return Err(e.into()),
                }
            }
            let auth = Auth::from(*auth);
            let responses = match pages {
                Some(max) => client.pages_as(auth, built, Some(*max)).await?,
                None => vec![client.send_as(auth, built).await?],
            };
            for response in &responses {
                print_response(response)?;
            }
        },
    }

    Ok(())
}

/// Discovery document from `--doc`, `--api` or the last discovered API
async fn load_api(args: &Args, config: &mut Config, client: &Client) -> Result<GoogleApi> {
    if let Some(path) = &args.doc {
        let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        return GoogleApi::from_json(&text).with_context(|| format!("Invalid discovery document {}", path.display()));
    }

    let (name, version) = match (&args.api, &args.api_version) {
        (Some(name), version) => (name.clone(), version.clone()),
        (None, _) => match config.last_api.as_deref().and_then(|last| last.split_once(':')) {
            Some((name, version)) => (name.to_string(), Some(version.to_string())),
            None => bail!("No API given. Use --doc <file> or --api <name>"),
        },
    };

    let api = match version {
        Some(version) => client.discover(&name, &version).await,
        None => client.discover_preferred(&name).await,
    }
    .with_context(|| format!("Failed to discover {name}"))?;

    if let Err(e) = config.set_last_api(api.name(), api.version()) {
        tracing::warn!("Failed to save config: {}", e);
    }
    Ok(api)
}

fn describe(api: &GoogleApi, path: Option<&str>) -> Result<()> {
    let Some(path) = path else {
        println!("{api}");
        print_listing(&api.resources_available(), &api.methods_available());
        return Ok(());
    };

    match api.resolve(path) {
        Lookup::Resource(resource) => print_resource(&resource),
        Lookup::Method(method) => print_method(&method),
        not_found => {
            not_found.into_method()?;
        },
    }
    Ok(())
}

fn print_listing(resources: &[&str], methods: &[&str]) {
    if !resources.is_empty() {
        println!("\nResources:");
        for name in resources {
            println!("  {name}");
        }
    }
    if !methods.is_empty() {
        println!("\nMethods:");
        for name in methods {
            println!("  {name}");
        }
    }
}

fn print_resource(resource: &Resource<'_>) {
    println!("{resource}");
    print_listing(&resource.resources_available(), &resource.methods_available());
}

fn print_method(method: &Method<'_>) {
    println!("{method}");
    if let Some(description) = method.description() {
        println!("\n{description}");
    }
    println!("\n{} {}", method.http_method(), method.path());

    let parameters = method.parameters();
    if !parameters.is_empty() {
        println!("\nParameters:");
        for (name, schema) in parameters.iter() {
            println!(
                "  {:<24} {:<6} {:<8} {}",
                name,
                schema.location.as_deref().unwrap_or("-"),
                schema.kind().unwrap_or("-"),
                if schema.is_required() { "required" } else { "" }
            );
        }
    }
    if method.request_schema().is_some() {
        println!("\nAccepts a JSON body");
    }
    if !method.scopes().is_empty() {
        println!("\nScopes:");
        for scope in method.scopes() {
            println!("  {scope}");
        }
    }
}

fn build_request(api: &GoogleApi, request: &RequestArgs, config: &Config) -> Result<Request> {
    let method = api.resolve(&request.method).into_method()?;
    let mut args = CallArgs::new();

    let parameters = method.parameters();
    for (name, raw) in &request.params {
        let schema = parameters.wire_name(name).and_then(|wire| parameters.get(wire));
        let value = coerce_param(schema.and_then(|s| s.kind()), raw);
        let merged = match args.params.shift_remove(name) {
            Some(Value::Array(mut values)) => {
                values.push(value);
                Value::Array(values)
            },
            Some(previous) => Value::Array(vec![previous, value]),
            None => value,
        };
        args = args.param(name.clone(), merged);
    }

    if let Some(json) = &request.json {
        args = args.json(serde_json::from_str(json).context("--json is not valid JSON")?);
    }
    if let Some(path) = &request.upload {
        args = args.upload_file(path.clone());
    }
    if let Some(path) = &request.download {
        args = args.download_file(path.clone());
    }
    if let Some(timeout) = request.timeout.or(config.timeout_secs) {
        args = args.timeout(timeout);
    }

    Ok(method.build(args)?)
}

/// Command line values are strings; type them after the parameter schema
fn coerce_param(kind: Option<&str>, raw: &str) -> Value {
    let typed = match kind {
        Some("integer") => raw.parse::<i64>().ok().map(Value::from),
        Some("number") => raw.parse::<f64>().ok().map(Value::from),
        Some("boolean") => raw.parse::<bool>().ok().map(Value::from),
        _ => None,
    };
    typed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn api_scopes(api: &GoogleApi, path: &str) -> Result<Vec<String>> {
    Ok(api.resolve(path).into_method()?.scopes().to_vec())
}

fn print_request(request: &Request) {
    println!("{} {}", request.method(), request.url());
    for (name, value) in request.headers() {
        println!("{name}: {value}");
    }
    if let Some(upload) = request.media_upload() {
        println!("\nUpload: {} -> {}", upload.source, upload.upload_path);
    }
    if let Some(download) = request.media_download() {
        println!("\nDownload: {} -> {}", download.download_url, download.file_path.display());
    }
    if let Some(json) = request.json() {
        println!("\n{}", serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string()));
    }
}

fn print_response(response: &Response) -> Result<()> {
    match &response.body {
        ResponseBody::Json(json) => println!("{}", serde_json::to_string_pretty(json)?),
        ResponseBody::Text(text) => println!("{text}"),
        ResponseBody::Bytes(bytes) => println!("<{} bytes>", bytes.len()),
        ResponseBody::Empty => match &response.download_file {
            Some(path) => println!("Downloaded to {}", path.display()),
            None => println!("{} {}", response.status_code, response.reason.as_deref().unwrap_or("")),
        },
    }
    Ok(())
}

use clap::Parser;
use oar_classify::api::routes;
use oar_classify::app::AppContext;
use oar_classify::core::config::{ExecutionMode, ModelSelection, ServiceConfig};
use oar_classify::core::constants::EXECUTION_MODE_ENV;
use oar_classify::core::errors::{ClassifyError, ClassifyResult};
use oar_classify::processors::ResizeSpec;
use oar_classify::utils::init_tracing;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "oar-classify")]
#[command(version)]
#[command(
    about = "HTTP image classification service backed by a versioned ONNX model",
    long_about = None
)]
struct Args {
    /// JSON configuration file; command line values override its fields
    #[arg(short, long, env = "CLASSIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "CLASSIFIER_HOST")]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long, env = "CLASSIFIER_PORT")]
    port: Option<u16>,

    /// Directory holding the model artifacts
    #[arg(short, long, env = "CLASSIFIER_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Load the first artifact with this version tag instead of the latest
    #[arg(long, env = "CLASSIFIER_MODEL_VERSION", conflicts_with = "model_name")]
    model_version: Option<String>,

    /// Load the artifact with exactly this name instead of the latest
    #[arg(long, env = "CLASSIFIER_MODEL_NAME")]
    model_name: Option<String>,

    /// Ordered class labels, comma separated
    #[arg(long, env = "CLASSIFIER_LABELS", value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Input size used when the model declares none, e.g. `128` or `128x96`
    #[arg(long, env = "CLASSIFIER_INPUT_SIZE")]
    input_size: Option<ResizeSpec>,

    /// Execution mode: DEVELOPMENT or PRODUCTION
    #[arg(long, env = EXECUTION_MODE_ENV)]
    mode: Option<String>,

    /// Number of ONNX Runtime sessions
    #[arg(long, env = "CLASSIFIER_SESSION_POOL_SIZE")]
    session_pool_size: Option<usize>,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "CLASSIFIER_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<u64>,

    /// Directory receiving the rolling log file
    #[arg(long, env = "CLASSIFIER_LOG_DIR", conflicts_with = "no_log_file")]
    log_dir: Option<PathBuf>,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,
}

impl Args {
    /// Layers command line values over the config file over defaults.
    fn into_config(self) -> ClassifyResult<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_json_file(path)?,
            None => ServiceConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = self.model_dir {
            config.model_dir = dir;
        }
        if let Some(version) = self.model_version {
            config.selection = ModelSelection::Version(version);
        }
        if let Some(name) = self.model_name {
            config.selection = ModelSelection::Name(name);
        }
        if let Some(labels) = self.labels {
            config.class_labels = labels.into_iter().map(|l| l.trim().to_string()).collect();
        }
        if let Some(size) = self.input_size {
            let (width, height) = size.dimensions();
            config.default_input_size = (height as usize, width as usize);
        }
        if let Some(mode) = self.mode {
            config.mode = ExecutionMode::from_name(&mode);
        }
        if let Some(pool) = self.session_pool_size {
            config.inference.session_pool_size = pool;
        }
        if let Some(limit) = self.max_upload_bytes {
            config.max_upload_bytes = limit;
        }
        if let Some(dir) = self.log_dir {
            config.log_dir = Some(dir);
        }
        if self.no_log_file {
            config.log_dir = None;
        }

        config.validate()?;
        Ok(config)
    }
}

fn bind_address(config: &ServiceConfig) -> ClassifyResult<SocketAddr> {
    let ip: IpAddr = config.host.parse().map_err(|e| {
        ClassifyError::config_error_with_context(
            "host",
            &config.host,
            &format!("invalid bind address: {}", e),
        )
    })?;
    Ok(SocketAddr::new(ip, config.port))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let cli_mode = args
        .mode
        .as_deref()
        .map(ExecutionMode::from_name)
        .unwrap_or_default();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            // console only; the configured log directory is unknown here
            let _ = init_tracing(cli_mode, None);
            error!("invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match init_tracing(config.mode, config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            let _ = init_tracing(config.mode, None);
            error!("failed to set up file logging: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("API starting in {}", config.mode);

    let addr = match bind_address(&config) {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let ctx = match tokio::task::spawn_blocking(move || AppContext::bootstrap(&config)).await {
        Ok(Ok(ctx)) => Arc::new(ctx),
        Ok(Err(e)) => {
            error!("startup failed: {}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("startup task aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let server = warp::serve(routes(ctx));
    let (bound, running) = match server.try_bind_with_graceful_shutdown(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    }) {
        Ok(bound) => bound,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on {}", bound);
    running.await;
    info!("server stopped");
    ExitCode::SUCCESS
}

use crate::services::pipeline::DestinationBinding;
use crate::services::storage::StorageBackend;
use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_CONVERSION_URL: &str = "https://v2.convertapi.com";
const DEFAULT_PNG_BUCKET: &str = "png-img-test-bucket";
const DEFAULT_GIF_BUCKET: &str = "gif-img-test-bucket";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; CLI wins.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_backend: StorageBackend,
    pub storage_dir: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub conversion_url: String,
    pub api_key: String,
    pub png_bucket: String,
    pub gif_bucket: String,
    pub request_timeout: Duration,
    pub inline_results: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Converts uploaded JPEG objects to PNG and GIF")]
pub struct Args {
    /// Host to bind to (overrides CONVERTER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CONVERTER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Object storage backend (overrides CONVERTER_STORAGE_BACKEND)
    #[arg(long, value_enum)]
    pub storage_backend: Option<StorageBackend>,

    /// Root directory of the local backend (overrides CONVERTER_STORAGE_DIR).
    /// Bucket names follow S3 rules here too: 3-63 lowercase characters.
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// S3 region (overrides CONVERTER_S3_REGION)
    #[arg(long)]
    pub s3_region: Option<String>,

    /// Custom S3-compatible endpoint (overrides CONVERTER_S3_ENDPOINT)
    #[arg(long)]
    pub s3_endpoint: Option<String>,

    /// Base URL of the conversion API (overrides CONVERTER_CONVERSION_URL)
    #[arg(long)]
    pub conversion_url: Option<String>,

    /// Destination bucket for PNG output (overrides CONVERTER_PNG_BUCKET)
    #[arg(long)]
    pub png_bucket: Option<String>,

    /// Destination bucket for GIF output (overrides CONVERTER_GIF_BUCKET)
    #[arg(long)]
    pub gif_bucket: Option<String>,

    /// Per-request timeout for conversion calls (overrides CONVERTER_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Ask the API to return results inline instead of storing them (overrides CONVERTER_INLINE_RESULTS)
    #[arg(long)]
    pub inline_results: bool,

    /// Process a single notification JSON file and exit
    #[arg(long, value_name = "FILE")]
    pub event: Option<PathBuf>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the optional one-shot event file.
    pub fn from_env_and_args() -> Result<(Self, Option<PathBuf>)> {
        let args = Args::parse();
        let event = args.event.clone();
        let cfg = Self::resolve(args, |name| env::var(name))?;
        Ok((cfg, event))
    }

    fn resolve<F>(args: Args, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let text = |name: &str, default: &str| -> Result<String> {
            match var(name) {
                Ok(value) => Ok(value),
                Err(env::VarError::NotPresent) => Ok(default.to_string()),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };
        let optional = |name: &str| -> Result<Option<String>> {
            match var(name) {
                Ok(value) if !value.is_empty() => Ok(Some(value)),
                Ok(_) | Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", name)),
            }
        };

        let env_port = parse_var(&var, "CONVERTER_PORT", 3000u16)?;
        let env_timeout = parse_var(&var, "CONVERTER_REQUEST_TIMEOUT_SECS", 30u64)?;
        let env_inline = parse_var(&var, "CONVERTER_INLINE_RESULTS", false)?;
        let env_backend = match optional("CONVERTER_STORAGE_BACKEND")? {
            Some(value) => <StorageBackend as ValueEnum>::from_str(&value, true)
                .map_err(|e| anyhow!(e))
                .with_context(|| {
                    format!("parsing CONVERTER_STORAGE_BACKEND value `{}`", value)
                })?,
            None => StorageBackend::Local,
        };

        let api_key = optional("API_KEY")?.context("API_KEY must be set")?;

        let request_timeout_secs = args.request_timeout_secs.unwrap_or(env_timeout);
        if request_timeout_secs == 0 {
            anyhow::bail!("request timeout must be at least one second");
        }

        Ok(Self {
            host: args.host.map_or_else(|| text("CONVERTER_HOST", "0.0.0.0"), Ok)?,
            port: args.port.unwrap_or(env_port),
            storage_backend: args.storage_backend.unwrap_or(env_backend),
            storage_dir: args
                .storage_dir
                .map_or_else(|| text("CONVERTER_STORAGE_DIR", "./data/objects"), Ok)?,
            s3_region: args
                .s3_region
                .map_or_else(|| text("CONVERTER_S3_REGION", "us-east-1"), Ok)?,
            s3_endpoint: args
                .s3_endpoint
                .map_or_else(|| optional("CONVERTER_S3_ENDPOINT"), |v| Ok(Some(v)))?,
            conversion_url: args
                .conversion_url
                .map_or_else(|| text("CONVERTER_CONVERSION_URL", DEFAULT_CONVERSION_URL), Ok)?,
            api_key,
            png_bucket: args
                .png_bucket
                .map_or_else(|| text("CONVERTER_PNG_BUCKET", DEFAULT_PNG_BUCKET), Ok)?,
            gif_bucket: args
                .gif_bucket
                .map_or_else(|| text("CONVERTER_GIF_BUCKET", DEFAULT_GIF_BUCKET), Ok)?,
            request_timeout: Duration::from_secs(request_timeout_secs),
            inline_results: args.inline_results || env_inline,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn destinations(&self) -> DestinationBinding {
        DestinationBinding::new(self.png_bucket.clone(), self.gif_bucket.clone())
    }
}

fn parse_var<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

// Hand-written so the API secret never reaches the logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage_backend", &self.storage_backend)
            .field("storage_dir", &self.storage_dir)
            .field("s3_region", &self.s3_region)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("conversion_url", &self.conversion_url)
            .field("api_key", &"<redacted>")
            .field("png_bucket", &self.png_bucket)
            .field("gif_bucket", &self.gif_bucket)
            .field("request_timeout", &self.request_timeout)
            .field("inline_results", &self.inline_results)
            .finish()
    }
}

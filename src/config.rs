use crate::error::ViewerError;
use crate::flow::{DataSource, FlowOptions};
use crate::loader::Decoder;
use crate::render::RenderMode;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_MOCK_DELAY_MS: u64 = 2000;
const DEFAULT_MAX_UPLOAD_MB: usize = 512;

/// Runtime settings shared by both binaries.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base URL of the processing service; `/process` is appended for uploads.
    pub base_url: String,
    pub bind: String,
    pub render_mode: RenderMode,
    pub decoder: Decoder,
    pub data_source: DataSource,
    pub mock_delay: Duration,
    /// No timeout unless set.
    pub timeout: Option<Duration>,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: DEFAULT_BASE_URL.to_string(),
            bind: DEFAULT_BIND.to_string(),
            render_mode: RenderMode::Popup,
            decoder: Decoder::Hand,
            data_source: DataSource::Remote,
            mock_delay: Duration::from_millis(DEFAULT_MOCK_DELAY_MS),
            timeout: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl Config {
    /// Defaults overridden by `VIEWER_*` environment variables.
    pub fn from_env() -> Result<Self, ViewerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ViewerError> {
        let mut config = Config::default();

        if let Some(url) = lookup("VIEWER_BASE_URL") {
            config.base_url = url;
        }
        if let Some(bind) = lookup("VIEWER_BIND") {
            config.bind = bind;
        }
        if let Some(mode) = lookup("VIEWER_RENDER_MODE") {
            config.render_mode = parse_setting("VIEWER_RENDER_MODE", &mode)?;
        }
        if let Some(decoder) = lookup("VIEWER_DECODER") {
            config.decoder = parse_setting("VIEWER_DECODER", &decoder)?;
        }
        if let Some(source) = lookup("VIEWER_DATA_SOURCE") {
            config.data_source = parse_setting("VIEWER_DATA_SOURCE", &source)?;
        }
        if let Some(ms) = lookup("VIEWER_MOCK_DELAY_MS") {
            config.mock_delay = Duration::from_millis(parse_number("VIEWER_MOCK_DELAY_MS", &ms)?);
        }
        if let Some(secs) = lookup("VIEWER_TIMEOUT_SECS") {
            config.timeout = Some(Duration::from_secs(parse_number("VIEWER_TIMEOUT_SECS", &secs)?));
        }
        if let Some(mb) = lookup("VIEWER_MAX_UPLOAD_MB") {
            config.max_upload_bytes = parse_number("VIEWER_MAX_UPLOAD_MB", &mb)?
                .checked_mul(1024 * 1024)
                .and_then(|bytes| usize::try_from(bytes).ok())
                .ok_or_else(|| {
                    ViewerError::Config(format!("VIEWER_MAX_UPLOAD_MB: {} is too large", mb.trim()))
                })?;
        }

        Ok(config)
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            data_source: self.data_source,
            decoder: self.decoder,
            mock_delay: self.mock_delay,
        }
    }
}

fn parse_setting<T: FromStr<Err = String>>(key: &str, value: &str) -> Result<T, ViewerError> {
    value
        .parse()
        .map_err(|e| ViewerError::Config(format!("{}: {}", key, e)))
}

fn parse_number(key: &str, value: &str) -> Result<u64, ViewerError> {
    value
        .trim()
        .parse()
        .map_err(|_| ViewerError::Config(format!("{}: expected a number, got {:?}", key, value)))
}

/// Command line overrides for [`Config`].
#[cfg(feature = "web")]
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// Base URL of the processing service
    #[arg(long)]
    pub base_url: Option<String>,

    /// How datasets are shown: popup or inpage
    #[arg(long)]
    pub render_mode: Option<RenderMode>,

    /// CSV decoder: hand or library
    #[arg(long)]
    pub decoder: Option<Decoder>,

    /// Publish the demo summary instead of contacting the service
    #[arg(long)]
    pub mock: bool,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[cfg(feature = "web")]
impl ConfigArgs {
    pub fn apply(self, mut config: Config) -> Config {
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(mode) = self.render_mode {
            config.render_mode = mode;
        }
        if let Some(decoder) = self.decoder {
            config.decoder = decoder;
        }
        if self.mock {
            config.data_source = DataSource::Mock;
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Some(Duration::from_secs(secs));
        }
        config
    }
}

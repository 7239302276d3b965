use serde::Deserialize;

pub const DEFAULT_HISTORY_CAPACITY: usize = 2000;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ViewerConfig {
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SerialSettings {
    /// Port to connect to on startup, e.g. "/dev/ttyACM0" or "COM3"
    pub port: Option<String>,
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            auto_start: default_auto_start(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_auto_start() -> bool {
    true
}

fn default_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_filter() -> String {
    "info".to_string()
}

pub fn load_viewer_config() -> anyhow::Result<ViewerConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/viewer").required(false))
        .add_source(config::Environment::with_prefix("VIEWER").separator("__"))
        .build()?;

    validate(settings.try_deserialize()?)
}

fn validate(config: ViewerConfig) -> anyhow::Result<ViewerConfig> {
    if config.history.capacity == 0 {
        anyhow::bail!("history.capacity must be at least 1");
    }
    Ok(config)
}

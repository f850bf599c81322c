use std::{collections::HashMap, time::Duration};

use crate::store::{StoreConfig, DEFAULT_SWEEP_INTERVAL};

pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_PORT: u16 = 8080;

pub const TTL_ENV: &str = "OTP_TTL";
pub const PORT_ENV: &str = "OTP_PORT";

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum Parameter {
    Ttl,
    Port,
    SweepIntervalMs,
    Unknown,
}

impl Parameter {
    pub fn deserialize(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ttl" => Parameter::Ttl,
            "port" => Parameter::Port,
            "sweep-interval-ms" => Parameter::SweepIntervalMs,
            _ => Parameter::Unknown,
        }
    }
}

/// Collects `--name value` pairs. Unrecognised names are kept as
/// [`Parameter::Unknown`] and ignored later.
pub fn parse_args<I>(args: I) -> anyhow::Result<HashMap<Parameter, String>>
where
    I: IntoIterator<Item = String>,
{
    let mut parameters = HashMap::new();
    let mut current_key = None;
    for arg in args {
        if let Some(current_key) = current_key.take() {
            parameters.insert(current_key, arg);
        } else if let Some(name) = arg.strip_prefix("--") {
            current_key = Some(Parameter::deserialize(name));
        } else {
            anyhow::bail!("invalid argument {:?}", arg)
        }
    }
    if let Some(key) = current_key {
        anyhow::bail!("missing value for {:?}", key)
    }
    parameters.remove(&Parameter::Unknown);
    Ok(parameters)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ttl: Duration,
    pub port: u16,
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ttl: DEFAULT_TTL,
            port: DEFAULT_PORT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Config {
    /// Builds the config from command line arguments (program name already
    /// skipped), falling back to the environment through `env`.
    pub fn load<I, E>(args: I, env: E) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut parameters = parse_args(args)?;
        let mut config = Config::default();

        match parameters.remove(&Parameter::Ttl).or_else(|| env(TTL_ENV)) {
            Some(ttl) => match ttl.parse::<u64>() {
                Ok(secs) => config.ttl = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    value = %ttl,
                    "invalid OTP TTL, defaulting to {} seconds",
                    DEFAULT_TTL.as_secs()
                ),
            },
            None => tracing::info!(
                "{TTL_ENV} not set, defaulting to {} seconds",
                DEFAULT_TTL.as_secs()
            ),
        }

        if let Some(port) = parameters.remove(&Parameter::Port).or_else(|| env(PORT_ENV)) {
            config.port = port
                .parse()
                .map_err(|_| anyhow::format_err!("invalid port {:?}", port))?;
        }

        if let Some(millis) = parameters.remove(&Parameter::SweepIntervalMs) {
            match millis.parse::<u64>() {
                Ok(millis) if millis > 0 => config.sweep_interval = Duration::from_millis(millis),
                _ => anyhow::bail!("invalid sweep interval {:?}", millis),
            }
        }

        Ok(config)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            sweep_interval: self.sweep_interval,
            ..StoreConfig::default()
        }
    }
}

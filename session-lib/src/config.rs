use crate::DEFAULT_PORT;
use clap::Args;
use std::num::ParseIntError;
use std::time::Duration;

/// Where the server lives and how long to wait on it.
///
/// Every field can come from the command line or the environment, so the
/// programs built on this crate share one configuration surface.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[arg(long, env = "REDIS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "REDIS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Give up connecting after this many milliseconds.
    #[arg(long, env = "REDIS_CONNECT_TIMEOUT_MS", value_parser = duration_from)]
    pub connect_timeout: Option<Duration>,

    /// Fail a request whose reply takes longer than this many milliseconds.
    #[arg(long, env = "REDIS_RESPONSE_TIMEOUT_MS", value_parser = duration_from)]
    pub response_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            response_timeout: None,
        }
    }
}

impl Config {
    pub fn new(host: impl Into<String>, port: u16) -> Config {
        Config {
            host: host.into(),
            port,
            ..Config::default()
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, limit: Duration) -> Config {
        self.connect_timeout = Some(limit);
        self
    }

    #[must_use]
    pub fn with_response_timeout(mut self, limit: Duration) -> Config {
        self.response_timeout = Some(limit);
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn duration_from(src: &str) -> Result<Duration, ParseIntError> {
    let ms = src.parse::<u64>()?;
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Cli {
        #[command(flatten)]
        config: Config,
    }

    #[test]
    fn defaults_point_at_local_server() {
        let cli = Cli::try_parse_from(["prog"]).unwrap();

        assert_eq!(cli.config.host, Config::default().host);
        assert_eq!(cli.config.port, DEFAULT_PORT);
        assert_eq!(cli.config.addr(), "127.0.0.1:6379");
    }

    #[test]
    fn timeouts_are_milliseconds() {
        let cli = Cli::try_parse_from(["prog", "--port", "7000", "--response-timeout", "250"]).unwrap();

        assert_eq!(cli.config.port, 7000);
        assert_eq!(cli.config.response_timeout, Some(Duration::from_millis(250)));
        assert_eq!(cli.config.connect_timeout, None);
    }
}

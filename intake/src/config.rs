use provisioner::config::Config as ProvisionerConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub provisioner: ProvisionerConfig,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://public@sentry.example.com/1
            provisioner:
                listener:
                    host: 0.0.0.0
                    port: 8080
                endpoints:
                    graph_url: https://graph.microsoft.com/beta
                polling:
                    max_attempts: 5
                    interval_ms: 500
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(
            config.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );
        assert!(config.logging.is_some());
        assert_eq!(config.provisioner.listener.port, 8080);
        assert_eq!(
            config.provisioner.endpoints.graph_url.as_str(),
            "https://graph.microsoft.com/beta"
        );
        assert_eq!(config.provisioner.polling.max_attempts, 5);
        assert!(config.provisioner.validate().is_ok());
    }

    #[test]
    fn minimal_config() {
        let tmp = write_tmp_file("provisioner: {}\n");
        let config = Config::from_file(tmp.path()).expect("load config");

        assert!(config.metrics.is_none());
        assert!(config.logging.is_none());
        assert_eq!(config.provisioner.listener.port, 3000);
        assert_eq!(config.provisioner.polling.max_attempts, 10);
    }

    #[test]
    fn missing_file() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/intake.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }

    #[test]
    fn invalid_yaml() {
        let tmp = write_tmp_file("provisioner:\n    polling:\n        max_attempts: many\n");
        let err = Config::from_file(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}

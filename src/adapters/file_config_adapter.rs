//! INI file configuration adapter.

use crate::domain::error::InvquantError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, InvquantError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(content).map_err(|reason| InvquantError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, InvquantError> {
        Self::parse(content.to_string()).map_err(|reason| InvquantError::ConfigParse {
            file: "<string>".to_string(),
            reason,
        })
    }

    fn parse(content: String) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content)?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
dir = /var/lib/inventory

[arbitrage]
metal = COPPER
source_a = COMEX
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("/var/lib/inventory".to_string())
        );
        assert_eq!(
            adapter.get_string("arbitrage", "source_a"),
            Some("COMEX".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[beta]\nlong_entry = 0.05\n").unwrap();
        assert_eq!(adapter.get_string("beta", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn values_are_returned_unparsed() {
        let adapter =
            FileConfigAdapter::from_string("[factors]\nwindow_years = two\n[backtest]\nslippage_rate = 5e-4\n")
                .unwrap();
        assert_eq!(adapter.get_string("factors", "window_years"), Some("two".to_string()));
        assert_eq!(adapter.get_string("backtest", "slippage_rate"), Some("5e-4".to_string()));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[event]\nmetric_b = comex_registered_oz\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("event", "metric_b"),
            Some("comex_registered_oz".to_string())
        );
    }

    #[test]
    fn from_file_returns_io_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, InvquantError::Io(_)));
        assert_eq!(err.exit_status(), 1);
    }
}

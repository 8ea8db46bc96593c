//! Configuration module

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use validator::Validate;

/// Registry entries used when `EXTRACTORS` is not set
const DEFAULT_EXTRACTORS: &str = "modbus=modbusParser.py,dnp3=dnp3Parser.py,iec104=iec104Parser.py";

/// One registered extractor script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorSpec {
    /// Stable name, used for diagnostics only
    pub name: String,
    /// Script file, relative to `parsers_dir` unless absolute
    pub script: PathBuf,
}

/// Application configuration
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Directory where uploaded captures are written
    pub upload_dir: PathBuf,

    /// Request body limit for uploads
    #[validate(range(min = 1))]
    pub max_upload_bytes: usize,

    /// Directory holding extractor scripts
    pub parsers_dir: PathBuf,

    /// Program used to launch each extractor script
    #[validate(length(min = 1))]
    pub extractor_interpreter: String,

    /// Ordered extractor registry, as `name=script` entries
    pub extractors: String,

    /// Per-extractor timeout in seconds
    #[validate(range(min = 1))]
    pub extractor_timeout_secs: u64,

    /// Cap on in-flight extractors per request (0 = unbounded)
    pub max_concurrent_extractors: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(512 * 1024 * 1024),

            parsers_dir: env::var("PARSERS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("parsers")),

            extractor_interpreter: env::var("EXTRACTOR_INTERPRETER")
                .unwrap_or_else(|_| "python3".to_string()),

            extractors: env::var("EXTRACTORS")
                .unwrap_or_else(|_| DEFAULT_EXTRACTORS.to_string()),

            extractor_timeout_secs: env::var("EXTRACTOR_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(120),

            max_concurrent_extractors: env::var("MAX_CONCURRENT_EXTRACTORS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Parsed registry entries, in declaration order
    pub fn extractor_specs(&self) -> Vec<ExtractorSpec> {
        parse_extractor_specs(&self.extractors)
    }

    pub fn extractor_timeout(&self) -> Duration {
        Duration::from_secs(self.extractor_timeout_secs)
    }

    /// `None` when fan-out is unbounded
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent_extractors > 0).then_some(self.max_concurrent_extractors)
    }

    /// Resolve a registered script against `parsers_dir`
    pub fn script_path(&self, script: &Path) -> PathBuf {
        if script.is_absolute() {
            script.to_path_buf()
        } else {
            self.parsers_dir.join(script)
        }
    }
}

/// Parse a comma-separated `name=script` list.
///
/// An entry without `=` is named after the script stem. Entries with an empty
/// name or script are skipped.
pub fn parse_extractor_specs(raw: &str) -> Vec<ExtractorSpec> {
    let mut specs = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, script) = match entry.split_once('=') {
            Some((name, script)) => (name.trim().to_string(), script.trim()),
            None => {
                let stem = Path::new(entry)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (stem, entry)
            }
        };

        if name.is_empty() || script.is_empty() {
            tracing::warn!("Skipping malformed extractor entry '{}'", entry);
            continue;
        }

        specs.push(ExtractorSpec {
            name,
            script: PathBuf::from(script),
        });
    }

    specs
}

#[cfg(test)]
pub(crate) fn test_config(upload_dir: &Path) -> Config {
    Config {
        port: 0,
        upload_dir: upload_dir.to_path_buf(),
        max_upload_bytes: 1024 * 1024,
        parsers_dir: PathBuf::from("parsers"),
        extractor_interpreter: "python3".to_string(),
        extractors: DEFAULT_EXTRACTORS.to_string(),
        extractor_timeout_secs: 5,
        max_concurrent_extractors: 0,
        environment: "test".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        test_config(Path::new("uploads"))
    }

    #[test]
    fn test_default_registry_order() {
        let specs = parse_extractor_specs(DEFAULT_EXTRACTORS);
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["modbus", "dnp3", "iec104"]);
        assert_eq!(specs[0].script, PathBuf::from("modbusParser.py"));
    }

    #[test]
    fn test_entry_without_name_uses_stem() {
        let specs = parse_extractor_specs(" s7Parser.py , bacnet = bacnet.py ");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "s7Parser");
        assert_eq!(specs[1].name, "bacnet");
        assert_eq!(specs[1].script, PathBuf::from("bacnet.py"));
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let specs = parse_extractor_specs("=x.py,empty=,,ok=ok.py");
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "ok");
    }

    #[test]
    fn test_empty_registry_is_allowed() {
        assert!(parse_extractor_specs("").is_empty());
    }

    #[test]
    fn test_validation() {
        assert!(base_config().validate().is_ok());

        let mut config = base_config();
        config.extractor_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.extractor_interpreter = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_concurrency_limit() {
        let mut config = base_config();
        assert_eq!(config.concurrency_limit(), None);
        config.max_concurrent_extractors = 2;
        assert_eq!(config.concurrency_limit(), Some(2));
    }

    #[test]
    fn test_script_path_resolution() {
        let config = base_config();
        assert_eq!(
            config.script_path(Path::new("modbusParser.py")),
            PathBuf::from("parsers/modbusParser.py")
        );
        assert_eq!(
            config.script_path(Path::new("/opt/x.py")),
            PathBuf::from("/opt/x.py")
        );
    }
}

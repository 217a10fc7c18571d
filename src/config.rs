use crate::error::{AppResult, ConfigErrorKind, DomainError};
use crate::hardening::MAX_SCAN_INTERVAL_SECS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub definitions_dir: PathBuf,       // e.g. "data/collections"
    pub world_file: PathBuf,            // JSON world snapshot
    #[serde(default = "default_interval")]
    pub scan_interval_secs: f64,
    #[serde(default = "default_enabled")]
    pub collections_enabled: bool,
    #[serde(default)]
    pub settings_file: Option<PathBuf>, // TOML looting settings
    #[serde(default = "default_passes")]
    pub passes: u32,                    // scan passes the runner performs
}

fn default_interval() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

fn default_passes() -> u32 {
    3
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| DomainError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Read(e),
        })?;
        let cfg: Self = toml::from_str(&data).map_err(|e| DomainError::Config {
            path: path.to_path_buf(),
            source: ConfigErrorKind::Parse(e),
        })?;
        cfg.validate(path)?;
        Ok(cfg)
    }

    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::from_filename(".env");
        let cfg = Self {
            definitions_dir: std::env::var("HARVEST_DEFINITIONS_DIR")
                .unwrap_or_else(|_| "data/collections".to_string())
                .into(),
            world_file: std::env::var("HARVEST_WORLD_FILE")
                .unwrap_or_else(|_| "data/world.json".to_string())
                .into(),
            scan_interval_secs: env_parse("HARVEST_SCAN_INTERVAL_SECS", default_interval())?,
            collections_enabled: env_parse("HARVEST_COLLECTIONS_ENABLED", default_enabled())?,
            settings_file: std::env::var("HARVEST_SETTINGS_FILE").ok().map(PathBuf::from),
            passes: env_parse("HARVEST_PASSES", default_passes())?,
        };

        cfg.validate(Path::new(".env"))?;
        Ok(cfg)
    }

    /// Rejects values the scan worker cannot turn into a delay.
    fn validate(&self, path: &Path) -> AppResult<()> {
        let secs = self.scan_interval_secs;
        if !secs.is_finite() || !(0.0..=MAX_SCAN_INTERVAL_SECS).contains(&secs) {
            return Err(DomainError::Config {
                path: path.to_path_buf(),
                source: ConfigErrorKind::ScanInterval { value: secs, max: MAX_SCAN_INTERVAL_SECS },
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T> {
    match std::env::var(key) {
        Ok(v) => v.trim().parse().map_err(|_| DomainError::Config {
            path: PathBuf::from(".env"),
            source: ConfigErrorKind::InvalidEnv(key.to_string(), v),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_load_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("harvest.toml");
        std::fs::write(&p, "definitions_dir = \"defs\"\nworld_file = \"w.json\"\n").unwrap();
        let cfg = Config::load(&p).unwrap();
        assert_eq!(cfg.definitions_dir, PathBuf::from("defs"));
        assert_eq!(cfg.scan_interval_secs, 1.0);
        assert!(cfg.collections_enabled);
        assert_eq!(cfg.passes, 3);
        assert!(cfg.settings_file.is_none());
    }

    #[test]
    fn t_scan_interval_out_of_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("inf.toml", "inf"), ("huge.toml", "1e30"), ("neg.toml", "-1.0"), ("nan.toml", "nan")] {
            let p = dir.path().join(name);
            std::fs::write(&p, format!("definitions_dir = \"d\"\nworld_file = \"w\"\nscan_interval_secs = {value}\n"))
                .unwrap();
            match Config::load(&p) {
                Err(DomainError::Config { source: ConfigErrorKind::ScanInterval { .. }, .. }) => {}
                other => panic!("{value}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn t_load_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("bad.toml");
        std::fs::write(&p, "definitions_dir = [").unwrap();
        match Config::load(&p) {
            Err(DomainError::Config { path, source: ConfigErrorKind::Parse(_) }) => assert_eq!(path, p),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

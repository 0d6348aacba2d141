// Configuration module entry point
// Loads the typed configuration from an optional file and the environment

mod types;

pub use types::{Config, Dotfiles, LoggingConfig, MaxAge, SendOptions};

use crate::error::Result;

/// Prefix of environment overrides, e.g. `HTTPSIM_SEND__MAX_AGE=1h`
pub const ENV_PREFIX: &str = "HTTPSIM";

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// A missing file is not an error; environment variables override the
    /// file and built-in defaults fill the rest.
    pub fn load_from(config_path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("send.index")
                    .with_list_parse_key("send.extensions"),
            )
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", false)?
            .set_default("logging.access_log_format", "combined")?
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EtagMode;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from("/nonexistent/httpsim-config").unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.access_log);
        assert_eq!(config.send, SendOptions::default());
        assert_eq!(config.app.etag, EtagMode::Weak);
    }

    #[test]
    fn test_load_toml_file() {
        let dir = std::env::temp_dir().join(format!("httpsim-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("httpsim.toml");
        std::fs::write(
            &path,
            r#"
[logging]
access_log = true
access_log_format = "json"

[send]
dotfiles = "deny"
extensions = ["html", "htm"]
index = []
max_age = "2h"
immutable = true
root = "/srv/www"

[app]
etag = "strong"
json_spaces = 2
"#,
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert!(config.logging.access_log);
        assert_eq!(config.logging.access_log_format, "json");
        assert_eq!(config.send.dotfiles, Dotfiles::Deny);
        assert_eq!(config.send.extensions, vec!["html", "htm"]);
        assert!(config.send.index.is_empty());
        assert_eq!(config.send.max_age.to_millis().unwrap(), 7_200_000);
        assert!(config.send.immutable);
        assert!(config.send.accept_ranges);
        assert_eq!(config.send.root.as_deref(), Some("/srv/www"));
        assert_eq!(config.app.etag, EtagMode::Strong);
        assert_eq!(config.app.json_spaces, Some(2));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

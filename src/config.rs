use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tuiter", about = "Users, tuits, likes and attached media")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Base URL clients use to reach this server; media URLs are built from it.
    pub public_url: Option<String>,
    /// Browser origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    /// bcrypt work factor for password digests
    pub bcrypt_cost: u32,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MediaConfig {
    pub path: Option<PathBuf>,
    pub image_limit: usize,
    pub video_limit: usize,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            public_url: None,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "tuiter_session".to_string(),
            session_hours: 720,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            admin_username: None,
            admin_password: None,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            path: None,
            image_limit: 6,
            video_limit: 1,
            max_upload_mb: 100,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("tuiter.db"));
        }
        if config.media.path.is_none() {
            config.media.path = Some(data_dir.join("media"));
        }
        if config.server.public_url.is_none() {
            config.server.public_url = Some(format!(
                "http://localhost:{}",
                config.server.port
            ));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".tuiter")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("tuiter.db"))
    }

    pub fn media_path(&self) -> PathBuf {
        self.media
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("media"))
    }

    pub fn public_url(&self) -> String {
        self.server
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.server.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.cookie_name, "tuiter_session");
        assert_eq!(config.auth.session_hours, 720);
        assert_eq!(config.media.image_limit, 6);
        assert_eq!(config.media.video_limit, 1);
        assert!(config.database.path.is_none());
        assert!(config.media.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(PathBuf::from("/tmp/test-tuiter")),
        };
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-tuiter"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.db_path(), tmp.path().join("tuiter.db"));
        assert_eq!(config.media_path(), tmp.path().join("media"));
        assert_eq!(config.public_url(), "http://localhost:4000");
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000
public_url = "https://tuiter.example"

[auth]
admin_username = "root"
admin_password = "hunter2"

[media]
image_limit = 4
video_limit = 2
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: None,
            port: None,
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.public_url(), "https://tuiter.example");
        assert_eq!(config.auth.admin_username.as_deref(), Some("root"));
        assert_eq!(config.auth.cookie_name, "tuiter_session");
        assert_eq!(config.media.image_limit, 4);
        assert_eq!(config.media.video_limit, 2);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4100),
            data_dir: Some(tmp.path().to_path_buf()),
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.public_url(), "http://localhost:4100");
    }
}

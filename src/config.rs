use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

use crate::journal::locale::LocalePolicy;
use crate::payments::stripe::DEFAULT_API_BASE;
use crate::payments::webhook::DEFAULT_TOLERANCE_SECS;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error opening configuration file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Error parsing configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Unable to resolve ${{exe_dir}}: {0}")]
    ExeDir(std::io::Error),
}

#[derive(Deserialize)]
pub struct Paths {
    pub template_dir: PathBuf,
    pub public_dir: PathBuf,
    /// Where shopper carts are kept. Defaults to the user cache dir.
    #[serde(default)]
    pub cart_dir: Option<PathBuf>,
}

impl Paths {
    pub fn cart_dir(&self) -> PathBuf {
        self.cart_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(env::temp_dir)
                .join("wecut")
                .join("carts")
        })
    }
}

#[derive(Deserialize)]
pub struct Server {
    pub address: String,
    pub port: u16,
    /// Used for checkout return links when a request carries no `Origin`.
    pub site_url: Option<String>,
}

impl Server {
    pub fn site_url(&self) -> String {
        match &self.site_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.address, self.port),
        }
    }
}

#[derive(Deserialize)]
pub struct Journal {
    pub page_size: u32,
    #[serde(default)]
    pub locale_policy: LocalePolicy,
    #[serde(default = "default_brand")]
    pub brand: String,
}

fn default_brand() -> String {
    "WECUT".to_string()
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Repository {
    Files {
        posts_dir: PathBuf,
        products_file: Option<PathBuf>,
    },
    Rest {
        url: String,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    },
}

#[derive(Deserialize, Default)]
pub struct Payments {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub api_base: Option<String>,
    pub currency: Option<String>,
    pub timeout_secs: Option<u64>,
    pub tolerance_secs: Option<i64>,
}

impl Payments {
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or("aud")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn tolerance_secs(&self) -> i64 {
        self.tolerance_secs.unwrap_or(DEFAULT_TOLERANCE_SECS)
    }
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub server: Server,
    pub journal: Journal,
    pub repository: Repository,
    #[serde(default)]
    pub payments: Payments,
    pub log: Option<Log>,
}

impl Repository {
    pub fn timeout(&self) -> Duration {
        match self {
            Repository::Rest { timeout_secs: Some(secs), .. } => Duration::from_secs(*secs),
            _ => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn parse_path(path: PathBuf, exe_dir: &Path) -> PathBuf {
    match path.to_str() {
        Some(str_path) if str_path.starts_with("${exe_dir}") => {
            PathBuf::from(str_path.replace("${exe_dir}", &exe_dir.to_string_lossy()))
        }
        _ => path,
    }
}

fn env_fallback(value: Option<String>, var: &str) -> Option<String> {
    value.filter(|v| !v.is_empty()).or_else(|| env::var(var).ok().filter(|v| !v.is_empty()))
}

/// Parses a configuration, expanding `${exe_dir}` against `exe_dir` and
/// filling unset secrets from the environment.
pub fn parse_config(cfg_content: &str, exe_dir: &Path) -> Result<Config, ConfigError> {
    let mut cfg: Config = toml::from_str(cfg_content)?;

    cfg.paths = Paths {
        template_dir: parse_path(cfg.paths.template_dir, exe_dir),
        public_dir: parse_path(cfg.paths.public_dir, exe_dir),
        cart_dir: cfg.paths.cart_dir.map(|p| parse_path(p, exe_dir)),
    };

    cfg.repository = match cfg.repository {
        Repository::Files { posts_dir, products_file } => Repository::Files {
            posts_dir: parse_path(posts_dir, exe_dir),
            products_file: products_file.map(|p| parse_path(p, exe_dir)),
        },
        Repository::Rest { url, api_key, timeout_secs } => Repository::Rest {
            url,
            api_key: env_fallback(api_key, "SUPABASE_SERVICE_ROLE_KEY"),
            timeout_secs,
        },
    };

    cfg.payments.secret_key = env_fallback(cfg.payments.secret_key.take(), "STRIPE_SECRET_KEY");
    cfg.payments.webhook_secret = env_fallback(cfg.payments.webhook_secret.take(), "STRIPE_WEBHOOK_SECRET");

    if let Some(log) = cfg.log.as_mut() {
        log.location = log.location.take().map(|p| parse_path(p, exe_dir));
    }

    Ok(cfg)
}

pub fn read_config(cfg_path: &Path) -> Result<Config, ConfigError> {
    let cfg_content = fs::read_to_string(cfg_path)
        .map_err(|source| ConfigError::Read { path: cfg_path.to_path_buf(), source })?;

    let cur_exe = env::current_exe().map_err(ConfigError::ExeDir)?;
    let exe_dir = cur_exe.parent().map(Path::to_path_buf).unwrap_or_default();

    parse_config(&cfg_content, &exe_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[paths]
template_dir = "${exe_dir}/template"
public_dir = "public"
cart_dir = "${exe_dir}/carts"

[server]
address = "0.0.0.0"
port = 8080

[journal]
page_size = 9
locale_policy = "strict"

[repository]
kind = "files"
posts_dir = "${exe_dir}/posts"
products_file = "products.toml"

[payments]
secret_key = "sk_test_1"
webhook_secret = "whsec_1"
currency = "twd"
"#;

    #[test]
    fn test_parse_config() {
        let cfg = parse_config(SAMPLE, Path::new("/opt/wecut")).unwrap();
        assert_eq!(cfg.paths.template_dir, PathBuf::from("/opt/wecut/template"));
        assert_eq!(cfg.paths.public_dir, PathBuf::from("public"));
        assert_eq!(cfg.paths.cart_dir(), PathBuf::from("/opt/wecut/carts"));
        assert_eq!(cfg.journal.locale_policy, LocalePolicy::Strict);
        assert_eq!(cfg.journal.brand, "WECUT");
        assert_eq!(cfg.server.site_url(), "http://0.0.0.0:8080");
        assert_eq!(cfg.payments.currency(), "twd");
        assert_eq!(cfg.payments.api_base(), DEFAULT_API_BASE);
        assert_eq!(cfg.payments.tolerance_secs(), 300);
        assert!(cfg.log.is_none());

        match cfg.repository {
            Repository::Files { posts_dir, products_file } => {
                assert_eq!(posts_dir, PathBuf::from("/opt/wecut/posts"));
                assert_eq!(products_file, Some(PathBuf::from("products.toml")));
            }
            Repository::Rest { .. } => panic!("expected files repository"),
        }
    }

    #[test]
    fn test_rest_repository() {
        let raw = r#"
[paths]
template_dir = "template"
public_dir = "public"

[server]
address = "127.0.0.1"
port = 8080
site_url = "https://wecut.example/"

[journal]
page_size = 9

[repository]
kind = "rest"
url = "https://project.supabase.co"
api_key = "service-key"
timeout_secs = 3
"#;
        let cfg = parse_config(raw, Path::new("/")).unwrap();
        assert_eq!(cfg.journal.locale_policy, LocalePolicy::Fallback);
        assert!(cfg.paths.cart_dir().ends_with("wecut/carts"));
        assert_eq!(cfg.server.site_url(), "https://wecut.example");
        assert_eq!(cfg.repository.timeout(), Duration::from_secs(3));
        assert!(matches!(cfg.repository, Repository::Rest { api_key: Some(ref k), .. } if k == "service-key"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(parse_config("[paths]\n", Path::new("/")), Err(ConfigError::Parse(_))));
        assert!(matches!(read_config(Path::new("/nonexistent/wecut.toml")), Err(ConfigError::Read { .. })));
    }
}

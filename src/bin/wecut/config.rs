use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use wecut::config::{read_config, Config};
use wecut::logger::default_log_location;

use crate::CFG_FILE_NAME;

/// Next to the binary, then the working directory, then the user config dir.
fn get_config_path() -> Option<PathBuf> {
    let exe_dir = env::current_exe().ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()));
    let cur_dir = env::current_dir().ok();

    [exe_dir, cur_dir, dirs::config_dir()]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(CFG_FILE_NAME))
        .find(|path| path.exists())
}

pub(crate) fn open_config(cfg_path: Option<PathBuf>) -> Result<Config> {
    let config_path = match cfg_path.or_else(get_config_path) {
        Some(path) => path,
        None => return Err(anyhow!("Could not find {} configuration", CFG_FILE_NAME)),
    };

    println!("Reading config from {}", config_path.display());
    let mut config = read_config(&config_path)
        .with_context(|| format!("Loading {}", config_path.display()))?;

    if let Some(log) = config.log.as_mut() {
        let location = log.location.get_or_insert_with(default_log_location);
        println!("Log enabled. Files will be written in {}", location.display());
    } else {
        println!("Log disabled. Using stdout");
    }

    Ok(config)
}

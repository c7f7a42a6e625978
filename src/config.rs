use std::env;
use std::path::PathBuf;

use anyhow::{Result, bail};

const DATA_DIR: &str = "footy_ingest";
const DB_FILE: &str = "footy.sqlite";
pub const DB_PATH_ENV: &str = "FOOTY_DB_PATH";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve settings from `.env` files and the process environment. An
    /// explicit path (the `--db` flag) wins over both.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        load_dotenv();
        if let Some(db_path) = db_override {
            return Ok(Self { db_path });
        }
        if let Some(path) = opt_env(DB_PATH_ENV) {
            return Ok(Self {
                db_path: PathBuf::from(path),
            });
        }
        match default_db_path() {
            Some(db_path) => Ok(Self { db_path }),
            None => bail!("no database path: set {DB_PATH_ENV} or pass --db"),
        }
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Some(base) = opt_env("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(DATA_DIR).join(DB_FILE));
    }
    let home = opt_env("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(DATA_DIR)
            .join(DB_FILE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let cfg = Config::load(Some(PathBuf::from("/tmp/x.sqlite"))).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/x.sqlite"));
    }
}

// sdeupdater/src/config/mod.rs
use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

const DEFAULT_LEDGER_PATH: &str = ".update.log";
const DEFAULT_GITHUB_API: &str = "https://api.github.com";
const DEFAULT_GITHUB_REPOSITORY: &str = "mjuopperi/eve-sde-postgres-updater";
const DEFAULT_GITHUB_WORKFLOW: &str = "build-images.yml";
const DEFAULT_BRANCH: &str = "master";

/// Settings shared by every mode: where the dump lives and where the
/// ledger is kept.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dump_url: String,
    pub ledger_path: PathBuf,
}

/// How pg_restore is driven against the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStyle {
    /// dropdb + createdb from template0, then `pg_restore --no-owner`.
    Recreate,
    /// A single `pg_restore --clean --if-exists --create` run.
    Clean,
}

impl RestoreStyle {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "recreate" => Ok(RestoreStyle::Recreate),
            "clean" => Ok(RestoreStyle::Clean),
            other => Err(anyhow::anyhow!(
                "RESTORE_STYLE must be 'recreate' or 'clean', got '{}'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub docker_executable: Option<String>,
    pub container_name: Option<String>,
    pub db_username: String,
    pub db_name: String,
    pub maintenance_db: String,
    pub style: RestoreStyle,
    pub pg_restore_executable: String,
    pub dropdb_executable: String,
    pub createdb_executable: String,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub api_url: String,
    pub repository: String,
    pub workflow: String,
    pub branch: String,
    pub token: String,
}

/// Loads `config/<env_file_name>` into the process environment. A missing
/// file is fine: everything may already be exported by the scheduler.
pub fn load_env_file(env_file_name: &str) -> Result<()> {
    let env_path = Path::new("config").join(env_file_name);
    if !env_path.is_file() {
        debug!("No env file at {}, using process environment only", env_path.display());
        return Ok(());
    }
    dotenv::from_path(&env_path)
        .with_context(|| format!("Failed to load env file {}", env_path.display()))?;
    debug!("Loaded env file {}", env_path.display());
    Ok(())
}

/// Reads a variable from the process environment, treating empty as unset.
pub fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn load_app_config(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let dump_url = lookup("DB_DUMP_URL").context("DB_DUMP_URL must be set")?;
    url::Url::parse(&dump_url).with_context(|| format!("DB_DUMP_URL is not a valid URL: {}", dump_url))?;

    let ledger_path = lookup("UPDATE_LOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_PATH));

    Ok(AppConfig { dump_url, ledger_path })
}

pub fn load_restore_config(lookup: impl Fn(&str) -> Option<String>) -> Result<RestoreConfig> {
    let docker_executable = lookup("DOCKER_EXECUTABLE");
    let container_name = match &docker_executable {
        Some(_) => Some(identifier(&lookup, "SDE_CONTAINER_NAME")?),
        None => None,
    };

    let style = match lookup("RESTORE_STYLE") {
        Some(raw) => RestoreStyle::parse(&raw)?,
        None => RestoreStyle::Recreate,
    };

    Ok(RestoreConfig {
        docker_executable,
        container_name,
        db_username: identifier(&lookup, "SDE_DB_USERNAME")?,
        db_name: identifier(&lookup, "SDE_DB_NAME")?,
        maintenance_db: match lookup("SDE_MAINTENANCE_DB") {
            Some(_) => identifier(&lookup, "SDE_MAINTENANCE_DB")?,
            None => "postgres".to_string(),
        },
        style,
        pg_restore_executable: lookup("PG_RESTORE_EXECUTABLE").unwrap_or_else(|| "pg_restore".to_string()),
        dropdb_executable: lookup("DROPDB_EXECUTABLE").unwrap_or_else(|| "dropdb".to_string()),
        createdb_executable: lookup("CREATEDB_EXECUTABLE").unwrap_or_else(|| "createdb".to_string()),
    })
}

/// Branch and token given on the command line win over the environment.
pub fn load_dispatch_config(
    lookup: impl Fn(&str) -> Option<String>,
    branch: Option<String>,
    token: Option<String>,
) -> Result<DispatchConfig> {
    let token = token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| lookup("GITHUB_TOKEN"))
        .context("A GitHub token must be given with --token or GITHUB_TOKEN")?;
    let branch = branch
        .filter(|b| !b.trim().is_empty())
        .or_else(|| lookup("GITHUB_BRANCH"))
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());

    Ok(DispatchConfig {
        api_url: lookup("GITHUB_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string()),
        repository: lookup("GITHUB_REPOSITORY").unwrap_or_else(|| DEFAULT_GITHUB_REPOSITORY.to_string()),
        workflow: lookup("GITHUB_WORKFLOW").unwrap_or_else(|| DEFAULT_GITHUB_WORKFLOW.to_string()),
        branch,
        token,
    })
}

/// Names handed to dropdb/createdb/pg_restore/docker must not be empty and
/// must not look like a flag.
fn identifier(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    let value = lookup(key).with_context(|| format!("{} must be set", key))?;
    let value = value.trim().to_string();
    if value.starts_with('-') {
        return Err(anyhow::anyhow!("{} must not start with '-': {}", key, value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_app_config_defaults_ledger_path() -> anyhow::Result<()> {
        let cfg = load_app_config(lookup_from(&[("DB_DUMP_URL", "https://example.com/sde.dmp.bz2")]))?;
        assert_eq!(cfg.dump_url, "https://example.com/sde.dmp.bz2");
        assert_eq!(cfg.ledger_path, PathBuf::from(".update.log"));
        Ok(())
    }

    #[test]
    fn test_app_config_requires_valid_url() {
        assert!(load_app_config(lookup_from(&[])).is_err());
        assert!(load_app_config(lookup_from(&[("DB_DUMP_URL", "not a url")])).is_err());
    }

    #[test]
    fn test_restore_config_without_docker() -> anyhow::Result<()> {
        let cfg = load_restore_config(lookup_from(&[
            ("SDE_DB_USERNAME", "yaml"),
            ("SDE_DB_NAME", "sde"),
        ]))?;
        assert!(cfg.docker_executable.is_none());
        assert!(cfg.container_name.is_none());
        assert_eq!(cfg.style, RestoreStyle::Recreate);
        assert_eq!(cfg.maintenance_db, "postgres");
        assert_eq!(cfg.pg_restore_executable, "pg_restore");
        Ok(())
    }

    #[test]
    fn test_restore_config_docker_requires_container() {
        let result = load_restore_config(lookup_from(&[
            ("DOCKER_EXECUTABLE", "/usr/bin/docker"),
            ("SDE_DB_USERNAME", "yaml"),
            ("SDE_DB_NAME", "sde"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_restore_config_clean_style() -> anyhow::Result<()> {
        let cfg = load_restore_config(lookup_from(&[
            ("DOCKER_EXECUTABLE", "docker"),
            ("SDE_CONTAINER_NAME", "sde-db"),
            ("SDE_DB_USERNAME", "yaml"),
            ("SDE_DB_NAME", "sde"),
            ("RESTORE_STYLE", "Clean"),
        ]))?;
        assert_eq!(cfg.style, RestoreStyle::Clean);
        assert_eq!(cfg.container_name.as_deref(), Some("sde-db"));
        Ok(())
    }

    #[test]
    fn test_restore_config_rejects_flag_like_identifiers() {
        let result = load_restore_config(lookup_from(&[
            ("SDE_DB_USERNAME", "--superuser"),
            ("SDE_DB_NAME", "sde"),
        ]));
        assert!(result.is_err());

        let result = load_restore_config(lookup_from(&[
            ("SDE_DB_USERNAME", "yaml"),
            ("SDE_DB_NAME", "sde"),
            ("RESTORE_STYLE", "incremental"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_dispatch_config_cli_overrides_env() -> anyhow::Result<()> {
        let lookup = lookup_from(&[("GITHUB_TOKEN", "env-token"), ("GITHUB_BRANCH", "develop")]);
        let cfg = load_dispatch_config(&lookup, Some("main".into()), Some("cli-token".into()))?;
        assert_eq!(cfg.branch, "main");
        assert_eq!(cfg.token, "cli-token");

        let cfg = load_dispatch_config(&lookup, None, None)?;
        assert_eq!(cfg.branch, "develop");
        assert_eq!(cfg.token, "env-token");
        assert_eq!(cfg.api_url, "https://api.github.com");
        assert_eq!(cfg.workflow, "build-images.yml");
        Ok(())
    }

    #[test]
    fn test_dispatch_config_requires_token() {
        assert!(load_dispatch_config(lookup_from(&[]), None, None).is_err());
    }

    #[test]
    fn test_dispatch_config_default_branch() -> anyhow::Result<()> {
        let cfg = load_dispatch_config(lookup_from(&[("GITHUB_API_URL", "http://localhost:9/")]), None, Some("t".into()))?;
        assert_eq!(cfg.branch, "master");
        assert_eq!(cfg.api_url, "http://localhost:9");
        Ok(())
    }
}

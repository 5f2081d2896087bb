// sdeupdater/src/restore/command.rs
use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use which::which;

use crate::config::{RestoreConfig, RestoreStyle};

/// One external tool call as a program plus discrete arguments. Nothing
/// here goes through a shell, so configured names are never re-parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolInvocation {
    /// Builds the invocation for `tool`, prefixed with
    /// `<docker> exec -i <container>` when a container runtime is configured.
    fn for_tool(config: &RestoreConfig, tool: &str, tool_args: Vec<String>) -> Self {
        match (&config.docker_executable, &config.container_name) {
            (Some(docker), Some(container)) => {
                let mut args = vec!["exec".to_string(), "-i".to_string(), container.clone(), tool.to_string()];
                args.extend(tool_args);
                ToolInvocation {
                    program: docker.clone(),
                    args,
                }
            }
            _ => ToolInvocation {
                program: tool.to_string(),
                args: tool_args,
            },
        }
    }

    /// `dropdb -U <user> --if-exists <db>`
    pub fn drop_database(config: &RestoreConfig) -> Self {
        Self::for_tool(
            config,
            &config.dropdb_executable,
            vec![
                "-U".to_string(),
                config.db_username.clone(),
                "--if-exists".to_string(),
                config.db_name.clone(),
            ],
        )
    }

    /// `createdb -U <user> -T template0 <db>`; template0 carries no objects
    /// that could collide with the dump.
    pub fn create_database(config: &RestoreConfig) -> Self {
        Self::for_tool(
            config,
            &config.createdb_executable,
            vec![
                "-U".to_string(),
                config.db_username.clone(),
                "-T".to_string(),
                "template0".to_string(),
                config.db_name.clone(),
            ],
        )
    }

    /// pg_restore reading the archive from stdin, in the configured style.
    pub fn restore(config: &RestoreConfig) -> Self {
        let mut args = Vec::new();
        let target_db = match config.style {
            RestoreStyle::Recreate => &config.db_name,
            RestoreStyle::Clean => {
                args.extend(["--clean", "--if-exists", "--create"].map(String::from));
                &config.maintenance_db
            }
        };
        args.extend([
            "--no-owner".to_string(),
            "-U".to_string(),
            config.db_username.clone(),
            "-v".to_string(),
            "-d".to_string(),
            target_db.clone(),
        ]);
        Self::for_tool(config, &config.pg_restore_executable, args)
    }

    /// Resolves the program through PATH and returns a ready `Command`.
    pub fn to_command(&self) -> Result<Command> {
        let program: PathBuf = which(&self.program).with_context(|| {
            format!(
                "{} executable not found in PATH. Please ensure it is installed and in your PATH.",
                self.program
            )
        })?;
        let mut command = Command::new(program);
        command.args(&self.args);
        Ok(command)
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

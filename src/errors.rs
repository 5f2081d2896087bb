use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote dump did not tell us when it was last modified.
    #[error("Last-Modified header missing or unreadable for {url}")]
    MetadataUnavailable { url: String },

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Restore tool exited with code {code}")]
    Restore {
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("{status} status from workflow dispatch endpoint: {body}")]
    Dispatch { status: u16, body: String },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Process exit code for this failure. A failed restore hands back the
    /// tool's own code so the scheduler sees what pg_restore saw.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Restore { code, .. } => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_failure_keeps_tool_exit_code() {
        let err = AppError::Restore {
            code: 3,
            stdout: String::new(),
            stderr: "relation does not exist".to_string(),
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn out_of_range_restore_code_collapses_to_one() {
        let err = AppError::Restore {
            code: -1,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn other_failures_exit_with_one() {
        let err = AppError::Dispatch {
            status: 422,
            body: "Unprocessable".to_string(),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            AppError::MetadataUnavailable { url: "http://x".into() }.exit_code(),
            1
        );
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not classify instruction: {0}")]
    Classification(String),

    #[error("Unsupported app: {0}")]
    UnsupportedApp(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RunnerError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            RunnerError::Io(_) => 1,
            RunnerError::Config(_) | RunnerError::Toml(_) => 2,
            RunnerError::Classification(_) | RunnerError::Llm(_) | RunnerError::Serde(_) => 3,
            RunnerError::UnsupportedApp(_) => 4,
            RunnerError::Device(_) => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_kind() {
        assert_eq!(RunnerError::Config("x".into()).exit_code(), 2);
        assert_eq!(RunnerError::Classification("x".into()).exit_code(), 3);
        assert_eq!(RunnerError::UnsupportedApp("x".into()).exit_code(), 4);
        assert_eq!(RunnerError::Device("x".into()).exit_code(), 5);
        assert_ne!(RunnerError::Device("x".into()).exit_code(), 0);
    }

    #[test]
    fn test_display_is_human_readable() {
        let err = RunnerError::UnsupportedApp("Snapchat".into());
        assert_eq!(err.to_string(), "Unsupported app: Snapchat");
    }
}

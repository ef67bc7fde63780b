use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,
    ConfigLocalPathMissing,

    ValidationInvalidArgument,

    HostNotFound,
    RoutineNotFound,

    SshIdentityFileNotFound,
    SessionOpenFailed,
    SessionLost,

    StepExecutionFailed,
    RemoteCommandFailed,

    DeployFailed,

    BuildFailed,
    BuildArtifactMissing,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigLocalPathMissing => "config.local_path_missing",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::HostNotFound => "host.not_found",
            ErrorCode::RoutineNotFound => "routine.not_found",

            ErrorCode::SshIdentityFileNotFound => "ssh.identity_file_not_found",
            ErrorCode::SessionOpenFailed => "session.open_failed",
            ErrorCode::SessionLost => "session.lost",

            ErrorCode::StepExecutionFailed => "step.execution_failed",
            ErrorCode::RemoteCommandFailed => "remote.command_failed",

            ErrorCode::DeployFailed => "deploy.failed",

            ErrorCode::BuildFailed => "build.failed",
            ErrorCode::BuildArtifactMissing => "build.artifact_missing",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalPathMissingDetails {
    pub host_alias: String,
    pub step_index: usize,
    pub local_path: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    pub host_alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecutionDetails {
    pub operation: String,
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub host_alias: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CauseDetails {
    pub code: String,
    pub message: String,
    pub details: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployFailedDetails {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub cause: CauseDetails,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshIdentityFileNotFoundDetails {
    pub host_alias: String,
    pub identity_file: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFailedDetails {
    pub command: String,
    pub working_dir: String,
    pub exit_code: i32,
    pub output_tail: String,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem,
                id,
                tried,
            }),
        )
    }

    pub fn host_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        let id = id.into();
        Self::new(
            ErrorCode::HostNotFound,
            format!("Host alias '{}' is not configured", id),
            to_details(NotFoundDetails { id, available }),
        )
        .with_hint("Run 'robodeploy routines' to see the hosts each routine uses")
    }

    pub fn routine_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        let id = id.into();
        Self::new(
            ErrorCode::RoutineNotFound,
            format!("Routine '{}' is not configured", id),
            to_details(NotFoundDetails { id, available }),
        )
        .with_hint("Run 'robodeploy routines' to see available routines")
    }

    pub fn ssh_identity_file_not_found(
        host_alias: impl Into<String>,
        identity_file: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            "SSH identity file not found",
            to_details(SshIdentityFileNotFoundDetails {
                host_alias: host_alias.into(),
                identity_file: identity_file.into(),
            }),
        )
    }

    pub fn session_open_failed(
        host_alias: impl Into<String>,
        host: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        let host_alias = host_alias.into();
        Self::new(
            ErrorCode::SessionOpenFailed,
            format!("Could not open session to '{}'", host_alias),
            to_details(SessionDetails {
                host_alias,
                host,
                error: error.into(),
            }),
        )
    }

    pub fn session_lost(
        host_alias: impl Into<String>,
        host: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        let host_alias = host_alias.into();
        Self::new(
            ErrorCode::SessionLost,
            format!("Session to '{}' was lost", host_alias),
            to_details(SessionDetails {
                host_alias,
                host,
                error: error.into(),
            }),
        )
    }

    pub fn step_execution_failed(
        operation: impl Into<String>,
        path: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let operation = operation.into();
        let path = path.into();
        let error = error.into();
        Self::new(
            ErrorCode::StepExecutionFailed,
            format!("{} failed for {}: {}", operation, path, error),
            to_details(StepExecutionDetails {
                operation,
                path,
                error,
            }),
        )
    }

    pub fn remote_command_failed(details: RemoteCommandFailedDetails) -> Self {
        let message = format!(
            "Command '{}' exited with status {}",
            details.command, details.exit_code
        );
        Self::new(ErrorCode::RemoteCommandFailed, message, to_details(details))
    }

    /// Wrap a target-level failure with the target identity and failing step.
    pub fn deploy_failed(
        target: impl Into<String>,
        step_index: Option<usize>,
        step: Option<String>,
        cause: Error,
    ) -> Self {
        let target = target.into();
        let message = match (step_index, step.as_deref()) {
            (Some(index), Some(step)) => format!(
                "Deployment to '{}' failed at step {} ({}): {}",
                target, index, step, cause.message
            ),
            _ => format!("Deployment to '{}' failed: {}", target, cause.message),
        };
        let hints = cause.hints.clone();

        let mut err = Self::new(
            ErrorCode::DeployFailed,
            message,
            to_details(DeployFailedDetails {
                target,
                step_index,
                step,
                cause: CauseDetails {
                    code: cause.code.as_str().to_string(),
                    message: cause.message,
                    details: cause.details,
                },
            }),
        );
        err.hints = hints;
        err
    }

    pub fn build_failed(details: BuildFailedDetails) -> Self {
        let message = format!(
            "Build command '{}' exited with status {}",
            details.command, details.exit_code
        );
        Self::new(ErrorCode::BuildFailed, message, to_details(details))
    }

    pub fn build_artifact_missing(kind: impl Into<String>, path: impl Into<String>) -> Self {
        let kind = kind.into();
        let path = path.into();
        Self::new(
            ErrorCode::BuildArtifactMissing,
            format!("Build output is missing its {}: {}", kind, path),
            serde_json::json!({ "artifact": kind, "path": path }),
        )
        .with_hint("Run the build without --skip-build, or check the build settings")
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        Self::new(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            to_details(ConfigMissingKeyDetails {
                key: key.into(),
                path,
            }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            to_details(ConfigInvalidJsonDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let problem = problem.into();
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid configuration value for '{}': {}", key, problem),
            to_details(ConfigInvalidValueDetails {
                key,
                value,
                problem,
            }),
        )
    }

    pub fn config_local_path_missing(
        host_alias: impl Into<String>,
        step_index: usize,
        local_path: impl Into<String>,
    ) -> Self {
        let local_path = local_path.into();
        Self::new(
            ErrorCode::ConfigLocalPathMissing,
            format!("Local path does not exist: {}", local_path),
            to_details(LocalPathMissingDetails {
                host_alias: host_alias.into(),
                step_index,
                local_path,
            }),
        )
        .with_hint("Run the build first, or drop --skip-build")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalJsonErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use robodeploy::error::Hint;
use robodeploy::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

pub fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigMissingKey
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ConfigLocalPathMissing
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::HostNotFound | ErrorCode::RoutineNotFound => 4,

        ErrorCode::SshIdentityFileNotFound
        | ErrorCode::SessionOpenFailed
        | ErrorCode::SessionLost => 10,

        ErrorCode::StepExecutionFailed
        | ErrorCode::RemoteCommandFailed
        | ErrorCode::DeployFailed => 20,

        ErrorCode::BuildFailed | ErrorCode::BuildArtifactMissing => 30,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robodeploy::error::RemoteCommandFailedDetails;

    #[test]
    fn remote_command_failed_serializes_output() {
        let err = Error::remote_command_failed(RemoteCommandFailedDetails {
            command: "ls -la /srv/app/lib".to_string(),
            exit_code: 2,
            stdout: String::new(),
            stderr: "No such file or directory".to_string(),
            host_alias: "link".to_string(),
        });

        let json = CliResponse::<()>::from_error(&err).to_json().unwrap();

        assert!(json.contains("\"code\": \"remote.command_failed\""));
        assert!(json.contains("No such file or directory"));
        assert!(json.contains("\"exitCode\": 2"));
        assert!(!json.contains("retryable"));
    }

    #[test]
    fn deploy_failure_maps_to_exit_code_20() {
        let cause = Error::step_execution_failed("copy", "/srv/app/lib", "disk full");
        let err = Error::deploy_failed("link", Some(2), Some("copy".to_string()), cause);

        let (_value, exit_code) = map_cmd_result_to_json::<serde_json::Value>(Err(err));

        assert_eq!(exit_code, 20);
    }

    #[test]
    fn success_passes_exit_code_through() {
        let (value, exit_code) = map_cmd_result_to_json(Ok((serde_json::json!({"ok": true}), 0)));

        assert_eq!(exit_code, 0);
        assert_eq!(value.unwrap()["ok"], true);
    }
}

//! Structured output handling for CLI commands.

use quarry_error::QuarryError;
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Eq, Copy)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Returns true if the output format is intended for machine consumption
    pub fn is_machine_readable(&self) -> bool {
        match self {
            OutputFormat::Human => false,
            OutputFormat::Json | OutputFormat::Yaml => true,
        }
    }
}

/// Envelope for machine-readable responses
#[derive(Serialize)]
pub struct CommandResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            exit_code: Some(0),
            data,
        }
    }

    pub fn error(message: String, exit_code: i32, data: T) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            exit_code: Some(exit_code),
            data,
        }
    }
}

/// Error payload; carries the full typed error when one is available.
#[derive(Serialize, Default)]
pub struct ErrorPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<QuarryError>,
}

pub fn render<T: Serialize>(format: OutputFormat, data: &T) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Yaml => serde_yaml::to_string(data)?,
        OutputFormat::Human => String::new(),
    })
}

/// Print the output to stdout in the requested format
pub fn print_output<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    // Human mode: the command has already printed its own output.
    if format.is_machine_readable() {
        println!("{}", render(format, &data)?);
    }
    Ok(())
}

/// Print a structured success response for machine outputs
pub fn print_success<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    print_output(format, CommandResponse::success(data))
}

/// Print a structured error response for machine outputs.
/// Human mode errors are printed to stderr by main.
pub fn print_error(format: OutputFormat, err: &anyhow::Error, exit_code: i32) -> anyhow::Result<()> {
    if format == OutputFormat::Human {
        return Ok(());
    }

    let payload = ErrorPayload {
        error: err.downcast_ref::<QuarryError>().cloned(),
    };
    print_output(
        format,
        CommandResponse::error(format!("{:#}", err), exit_code, payload),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_error::ErrorCode;

    #[test]
    fn test_error_envelope_carries_typed_error() {
        let err: anyhow::Error = QuarryError::new(ErrorCode::InvalidFilter, "No date bound")
            .with_hint("Add SQLDATE >= 20250101")
            .into();
        let response = CommandResponse::error(
            err.to_string(),
            5,
            ErrorPayload {
                error: err.downcast_ref::<QuarryError>().cloned(),
            },
        );

        let json: serde_json::Value =
            serde_json::from_str(&render(OutputFormat::Json, &response).unwrap()).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["exit_code"], 5);
        assert_eq!(json["error"]["code"], "QUARRY-1003");
        assert_eq!(json["error"]["stage"], "validation");
    }

    #[test]
    fn test_success_envelope_flattens_data() {
        #[derive(Serialize)]
        struct Data {
            name: &'static str,
        }
        let yaml = render(OutputFormat::Yaml, &CommandResponse::success(Data { name: "ukr_jan" }))
            .unwrap();
        assert!(yaml.contains("status: success"));
        assert!(yaml.contains("name: ukr_jan"));
        assert!(render(OutputFormat::Human, &Data { name: "x" }).unwrap().is_empty());
    }
}

use std::fmt;

use aws_sdk_eks::error::{ProvideErrorMetadata, SdkError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of an upstream AWS failure
///
/// AWS signals failures through a string error code; the codes relevant to the
/// SSM and EKS APIs used here collapse into this closed set. Codes that are not
/// recognized map to `Unknown` rather than failing classification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  /// The requested parameter, cluster, or node group does not exist
  NotFound,
  /// The request was malformed or rejected by the service
  Client,
  /// The service encountered an internal failure
  Server,
  /// The service is temporarily unavailable or throttling
  ServiceUnavailable,
  /// Anything that does not match a known error code
  Unknown,
}

impl ErrorKind {
  /// Map an AWS error code to its category
  pub fn from_code(code: &str) -> Self {
    match code {
      "ResourceNotFoundException" | "NotFoundException" | "ParameterNotFound" | "ParameterVersionNotFound" => {
        Self::NotFound
      }
      "ClientException" | "InvalidParameterException" | "InvalidRequestException" | "InvalidKeyId" => Self::Client,
      "ServerException" | "InternalServerError" => Self::Server,
      "ServiceUnavailableException" | "ThrottlingException" | "TooManyRequestsException" => Self::ServiceUnavailable,
      _ => Self::Unknown,
    }
  }
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::NotFound => "not found",
      Self::Client => "client error",
      Self::Server => "server error",
      Self::ServiceUnavailable => "service unavailable",
      Self::Unknown => "unknown error",
    })
  }
}

/// An upstream failure reduced to its category and original message
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
  pub kind: ErrorKind,
  pub message: String,
}

impl ClassifiedError {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
    }
  }
}

/// Classify an AWS SDK failure
///
/// Service-reported errors are categorized by their error code and carry the
/// service message verbatim. Everything else (connect timeouts, dispatch
/// failures, response parsing) carries the error's display string.
pub fn classify<E>(err: SdkError<E>) -> ClassifiedError
where
  E: ProvideErrorMetadata + std::error::Error,
{
  match &err {
    SdkError::ServiceError(context) => {
      let service_err = context.err();
      let kind = service_err.code().map_or(ErrorKind::Unknown, ErrorKind::from_code);
      let message = match service_err.message() {
        Some(message) => message.to_owned(),
        None => service_err.to_string(),
      };
      ClassifiedError::new(kind, message)
    }
    _ => ClassifiedError::new(ErrorKind::Unknown, err.to_string()),
  }
}

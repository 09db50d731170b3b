use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::{
  config::{self, retry::RetryConfig},
  Client,
};

use crate::{
  error::{self, ClassifiedError, ErrorKind},
  release::ReleaseResolver,
};

/// Get the SSM client
///
/// Retries are disabled; each invocation performs a single fresh request
pub async fn get_client(config: &SdkConfig) -> Result<Client> {
  let client = Client::from_conf(
    // Start with the shared environment configuration
    config::Builder::from(config)
      .retry_config(RetryConfig::disabled())
      .build(),
  );
  Ok(client)
}

/// Parameter path under which EKS publishes the recommended AMI release version
///
/// Specific to the EKS optimized Amazon Linux 2 arm64 image family
pub fn release_version_parameter(kubernetes_version: &str) -> String {
  format!("/aws/service/eks/optimized-ami/{kubernetes_version}/amazon-linux-2-arm64/recommended/release_version")
}

/// Resolves release versions from the public parameters EKS publishes to SSM
#[derive(Clone, Debug)]
pub struct ParameterStoreResolver {
  client: Client,
}

impl ParameterStoreResolver {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl ReleaseResolver for ParameterStoreResolver {
  /// Get the latest recommended AMI release version for the given Kubernetes version
  ///
  /// A missing parameter means the Kubernetes version has no published AMI release
  async fn latest_release_version(&self, kubernetes_version: &str) -> Result<String, ClassifiedError> {
    let name = release_version_parameter(kubernetes_version);
    let response = self
      .client
      .get_parameter()
      .name(&name)
      .send()
      .await
      .map_err(error::classify)?;

    match response.parameter().and_then(|parameter| parameter.value()) {
      Some(value) => Ok(value.to_owned()),
      None => Err(ClassifiedError::new(
        ErrorKind::NotFound,
        format!("parameter {name} returned no value"),
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn it_constructs_the_parameter_path() {
    let result = release_version_parameter("1.27");
    assert_eq!(
      result,
      "/aws/service/eks/optimized-ami/1.27/amazon-linux-2-arm64/recommended/release_version"
    );
  }

  #[test]
  fn parameter_path_is_deterministic() {
    assert_eq!(release_version_parameter("1.27"), release_version_parameter("1.27"));
  }
}

use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{release::ReleaseResolver, ssm};

/// Input arguments for `check-latest` command
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct CheckLatestInput {
  /// EKS Kubernetes version to check (e.g. 1.27)
  #[arg(long, value_parser = clap::builder::NonEmptyStringValueParser::new())]
  pub k8s_version: String,

  /// AWS region to query; defaults to the ambient environment configuration
  #[arg(long)]
  pub region: Option<String>,

  /// Output the result in JSON format
  #[arg(long)]
  pub output_json: bool,
}

/// Resulting output from the release version lookup
#[derive(Debug, Serialize, Deserialize)]
struct LatestRelease {
  latest_version: String,
}

impl CheckLatestInput {
  /// Look up the latest recommended AMI release version and print it
  pub async fn check(&self) -> Result<()> {
    let config = crate::get_sdk_config(&self.region).await?;
    let resolver = ssm::ParameterStoreResolver::new(ssm::get_client(&config).await?);
    let latest_version = resolver.latest_release_version(&self.k8s_version).await?;

    match self.output_json {
      true => println!("{}", serde_json::to_string_pretty(&LatestRelease { latest_version })?),
      false => println!("{latest_version}"),
    }

    Ok(())
  }
}

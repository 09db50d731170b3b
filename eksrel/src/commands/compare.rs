use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use tabled::Table;
use tracing::error;

use crate::{eks, release, ssm};

/// Input arguments for `compare` command
#[derive(Args, Debug, Serialize, Deserialize)]
pub struct CompareInput {
  /// EKS Kubernetes version to compare against (e.g. 1.27)
  #[arg(long, value_parser = clap::builder::NonEmptyStringValueParser::new())]
  pub k8s_version: String,

  /// AWS region to query; defaults to the ambient environment configuration
  #[arg(long)]
  pub region: Option<String>,

  /// Output the report in JSON format
  #[arg(long)]
  pub output_json: bool,
}

impl CompareInput {
  /// Compare every node group's AMI release version against the latest recommended
  pub async fn compare(&self) -> Result<()> {
    let config = crate::get_sdk_config(&self.region).await?;
    let resolver = ssm::ParameterStoreResolver::new(ssm::get_client(&config).await?);
    let inventory = eks::EksInventory::new(eks::get_client(&config).await?);

    let report = release::compare_release_versions(&resolver, &inventory, &self.k8s_version).await?;

    match self.output_json {
      true => println!("{}", serde_json::to_string_pretty(&report)?),
      false => {
        match report.rows.is_empty() {
          true => println!("No node groups found - latest release version is {}", report.latest_version),
          false => println!("{}", Table::new(&report.rows)),
        }

        for failure in &report.errors {
          error!("{failure}");
        }
      }
    }

    Ok(())
  }
}

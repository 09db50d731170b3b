use anyhow::Result;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_eks::{
  config::{self, retry::RetryConfig},
  Client,
};

use crate::{
  error::{self, ClassifiedError, ErrorKind},
  release::NodegroupInventory,
};

/// Get the EKS client
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

/// Inventory of EKS clusters and their managed node groups
#[derive(Clone, Debug)]
pub struct EksInventory {
  client: Client,
}

impl EksInventory {
  pub fn new(client: Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl NodegroupInventory for EksInventory {
  async fn clusters(&self) -> Result<Vec<String>, ClassifiedError> {
    let mut clusters = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
      let response = self
        .client
        .list_clusters()
        .set_next_token(next_token)
        .send()
        .await
        .map_err(error::classify)?;

      clusters.extend(response.clusters().unwrap_or_default().iter().cloned());
      next_token = response.next_token().map(ToOwned::to_owned);
      if next_token.is_none() {
        break;
      }
    }

    Ok(clusters)
  }

  async fn nodegroups(&self, cluster: &str) -> Result<Vec<String>, ClassifiedError> {
    let mut nodegroups = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
      let response = self
        .client
        .list_nodegroups()
        .cluster_name(cluster)
        .set_next_token(next_token)
        .send()
        .await
        .map_err(error::classify)?;

      nodegroups.extend(response.nodegroups().unwrap_or_default().iter().cloned());
      next_token = response.next_token().map(ToOwned::to_owned);
      if next_token.is_none() {
        break;
      }
    }

    Ok(nodegroups)
  }

  async fn release_version(&self, cluster: &str, nodegroup: &str) -> Result<String, ClassifiedError> {
    let response = self
      .client
      .describe_nodegroup()
      .cluster_name(cluster)
      .nodegroup_name(nodegroup)
      .send()
      .await
      .map_err(error::classify)?;

    match response.nodegroup().and_then(|nodegroup| nodegroup.release_version()) {
      Some(version) => Ok(version.to_owned()),
      None => Err(ClassifiedError::new(
        ErrorKind::Unknown,
        format!("no release version reported for nodegroup {cluster}/{nodegroup}"),
      )),
    }
  }
}

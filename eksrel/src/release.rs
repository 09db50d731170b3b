use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tracing::{debug, info};

use crate::error::{ClassifiedError, ErrorKind};

/// Resolves the latest recommended AMI release version for a Kubernetes version
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
  async fn latest_release_version(&self, kubernetes_version: &str) -> Result<String, ClassifiedError>;
}

/// Enumerates clusters and node groups and reports their deployed release versions
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait NodegroupInventory: Send + Sync {
  /// All cluster names in the target account and region; empty is a valid result
  async fn clusters(&self) -> Result<Vec<String>, ClassifiedError>;

  /// All node group names attached to the cluster; empty is a valid result
  async fn nodegroups(&self, cluster: &str) -> Result<Vec<String>, ClassifiedError>;

  /// The AMI release version the node group is currently running
  async fn release_version(&self, cluster: &str, nodegroup: &str) -> Result<String, ClassifiedError>;
}

/// One node group's deployed release version alongside the latest recommended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Tabled)]
pub struct ReleaseRow {
  #[tabled(rename = "Cluster Name")]
  pub cluster: String,

  #[tabled(rename = "Nodegroup Name")]
  pub nodegroup: String,

  #[tabled(rename = "Current Release Version")]
  pub current_version: String,

  #[tabled(rename = "Latest Release Version")]
  pub latest_version: String,
}

/// Identity of the resource a non-fatal failure is attributed to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
  Cluster { cluster: String },
  Nodegroup { cluster: String, nodegroup: String },
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Cluster { cluster } => write!(f, "cluster {cluster}"),
      Self::Nodegroup { cluster, nodegroup } => write!(f, "nodegroup {cluster}/{nodegroup}"),
    }
  }
}

/// A classified failure attributed to the cluster or node group it occurred on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopedError {
  pub scope: Scope,
  pub kind: ErrorKind,
  pub message: String,
}

impl ScopedError {
  fn cluster(cluster: &str, err: ClassifiedError) -> Self {
    Self {
      scope: Scope::Cluster {
        cluster: cluster.to_owned(),
      },
      kind: err.kind,
      message: err.message,
    }
  }

  fn nodegroup(cluster: &str, nodegroup: &str, err: ClassifiedError) -> Self {
    Self {
      scope: Scope::Nodegroup {
        cluster: cluster.to_owned(),
        nodegroup: nodegroup.to_owned(),
      },
      kind: err.kind,
      message: err.message,
    }
  }
}

impl fmt::Display for ScopedError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}: {}", self.scope, self.kind, self.message)
  }
}

/// Result of comparing a fleet of node groups against the latest release version
///
/// Rows and errors are kept in discovery order - clusters in listing order and
/// node groups within a cluster in listing order. A failure scoped to one
/// cluster or node group never removes rows gathered for the others.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareReport {
  pub latest_version: String,
  pub rows: Vec<ReleaseRow>,
  pub errors: Vec<ScopedError>,
}

/// Compare every node group's deployed release version against the latest recommended
///
/// The latest version is resolved exactly once before any inventory call is made;
/// a resolver failure aborts the comparison outright. Listing the clusters is
/// likewise fatal. Failures below the cluster listing - enumerating one cluster's
/// node groups, or describing one node group - are recorded against the resource
/// they occurred on and the comparison continues.
pub async fn compare_release_versions(
  resolver: &impl ReleaseResolver,
  inventory: &impl NodegroupInventory,
  kubernetes_version: &str,
) -> Result<CompareReport, ClassifiedError> {
  let latest_version = resolver.latest_release_version(kubernetes_version).await?;
  debug!("Latest release version for Kubernetes {kubernetes_version}: {latest_version}");

  let clusters = inventory.clusters().await?;
  if clusters.is_empty() {
    info!("No EKS clusters found in the target account and region");
  }

  let mut rows = Vec::new();
  let mut errors = Vec::new();

  for cluster in &clusters {
    let nodegroups = match inventory.nodegroups(cluster).await {
      Ok(nodegroups) => nodegroups,
      Err(err) => {
        errors.push(ScopedError::cluster(cluster, err));
        continue;
      }
    };

    for nodegroup in nodegroups {
      match inventory.release_version(cluster, &nodegroup).await {
        Ok(current_version) => rows.push(ReleaseRow {
          cluster: cluster.to_owned(),
          nodegroup,
          current_version,
          latest_version: latest_version.to_owned(),
        }),
        Err(err) => errors.push(ScopedError::nodegroup(cluster, &nodegroup, err)),
      }
    }
  }

  Ok(CompareReport {
    latest_version,
    rows,
    errors,
  })
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  struct StaticResolver(&'static str);

  #[async_trait]
  impl ReleaseResolver for StaticResolver {
    async fn latest_release_version(&self, _kubernetes_version: &str) -> Result<String, ClassifiedError> {
      Ok(self.0.to_owned())
    }
  }

  struct FailingResolver(ErrorKind);

  #[async_trait]
  impl ReleaseResolver for FailingResolver {
    async fn latest_release_version(&self, kubernetes_version: &str) -> Result<String, ClassifiedError> {
      Err(ClassifiedError::new(
        self.0,
        format!("no release version published for {kubernetes_version}"),
      ))
    }
  }

  /// Inventory that must never be reached
  struct UnreachableInventory;

  #[async_trait]
  impl NodegroupInventory for UnreachableInventory {
    async fn clusters(&self) -> Result<Vec<String>, ClassifiedError> {
      unreachable!("clusters must not be listed")
    }

    async fn nodegroups(&self, _cluster: &str) -> Result<Vec<String>, ClassifiedError> {
      unreachable!("node groups must not be listed")
    }

    async fn release_version(&self, _cluster: &str, _nodegroup: &str) -> Result<String, ClassifiedError> {
      unreachable!("node groups must not be described")
    }
  }

  /// In-memory inventory backed by static lookup tables
  struct StaticInventory {
    clusters: Result<Vec<&'static str>, ErrorKind>,
    nodegroups: HashMap<&'static str, Result<Vec<&'static str>, ErrorKind>>,
    versions: HashMap<(&'static str, &'static str), Result<&'static str, ErrorKind>>,
  }

  impl StaticInventory {
    fn with_clusters(clusters: Result<Vec<&'static str>, ErrorKind>) -> Self {
      Self {
        clusters,
        nodegroups: HashMap::new(),
        versions: HashMap::new(),
      }
    }
  }

  #[async_trait]
  impl NodegroupInventory for StaticInventory {
    async fn clusters(&self) -> Result<Vec<String>, ClassifiedError> {
      to_result(&self.clusters)
    }

    async fn nodegroups(&self, cluster: &str) -> Result<Vec<String>, ClassifiedError> {
      to_result(self.nodegroups.get(cluster).expect("cluster not in fixture"))
    }

    async fn release_version(&self, cluster: &str, nodegroup: &str) -> Result<String, ClassifiedError> {
      let entry = self
        .versions
        .get(&(cluster, nodegroup))
        .copied()
        .expect("nodegroup not in fixture");
      entry
        .map(ToOwned::to_owned)
        .map_err(|kind| ClassifiedError::new(kind, "injected failure"))
    }
  }

  fn to_result(entry: &Result<Vec<&'static str>, ErrorKind>) -> Result<Vec<String>, ClassifiedError> {
    match entry {
      Ok(names) => Ok(names.iter().map(|name| (*name).to_owned()).collect()),
      Err(kind) => Err(ClassifiedError::new(*kind, "injected failure")),
    }
  }

  #[tokio::test]
  async fn compares_all_nodegroups() {
    let resolver = StaticResolver("1.27.3-20240101");
    let inventory = StaticInventory {
      clusters: Ok(vec!["prod", "dev"]),
      nodegroups: HashMap::from([("prod", Ok(vec!["ng1"])), ("dev", Ok(vec![]))]),
      versions: HashMap::from([(("prod", "ng1"), Ok("1.27.1-20231201"))]),
    };

    let report = compare_release_versions(&resolver, &inventory, "1.27").await.unwrap();

    assert_eq!(report.latest_version, "1.27.3-20240101");
    assert_eq!(
      report.rows,
      vec![ReleaseRow {
        cluster: "prod".to_owned(),
        nodegroup: "ng1".to_owned(),
        current_version: "1.27.1-20231201".to_owned(),
        latest_version: "1.27.3-20240101".to_owned(),
      }]
    );
    assert!(report.errors.is_empty());
  }

  #[tokio::test]
  async fn resolver_failure_aborts_before_any_inventory_call() {
    let resolver = FailingResolver(ErrorKind::NotFound);

    let result = compare_release_versions(&resolver, &UnreachableInventory, "0.1").await;

    assert_eq!(result.unwrap_err().kind, ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn no_clusters_is_a_valid_result() {
    let resolver = StaticResolver("1.27.3-20240101");
    let inventory = StaticInventory::with_clusters(Ok(vec![]));

    let report = compare_release_versions(&resolver, &inventory, "1.27").await.unwrap();

    assert!(report.rows.is_empty());
    assert!(report.errors.is_empty());
  }

  #[tokio::test]
  async fn cluster_listing_failure_is_fatal() {
    let resolver = StaticResolver("1.27.3-20240101");
    let inventory = StaticInventory::with_clusters(Err(ErrorKind::ServiceUnavailable));

    let result = compare_release_versions(&resolver, &inventory, "1.27").await;

    assert_eq!(result.unwrap_err().kind, ErrorKind::ServiceUnavailable);
  }

  #[tokio::test]
  async fn nodegroup_listing_failure_is_scoped_to_its_cluster() {
    let resolver = StaticResolver("1.27.3-20240101");
    let inventory = StaticInventory {
      clusters: Ok(vec!["a", "b"]),
      nodegroups: HashMap::from([("a", Err(ErrorKind::Server)), ("b", Ok(vec!["ng1"]))]),
      versions: HashMap::from([(("b", "ng1"), Ok("1.27.1-20231201"))]),
    };

    let report = compare_release_versions(&resolver, &inventory, "1.27").await.unwrap();

    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].cluster, "b");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
      report.errors[0].scope,
      Scope::Cluster {
        cluster: "a".to_owned()
      }
    );
    assert_eq!(report.errors[0].kind, ErrorKind::Server);
  }

  #[tokio::test]
  async fn nodegroup_describe_failure_is_scoped_to_the_nodegroup() {
    let resolver = StaticResolver("1.27.3-20240101");
    let inventory = StaticInventory {
      clusters: Ok(vec!["prod"]),
      nodegroups: HashMap::from([("prod", Ok(vec!["ng1", "ng2"]))]),
      versions: HashMap::from([
        (("prod", "ng1"), Ok("1.27.1-20231201")),
        (("prod", "ng2"), Err(ErrorKind::Server)),
      ]),
    };

    let report = compare_release_versions(&resolver, &inventory, "1.27").await.unwrap();

    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].nodegroup, "ng1");
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
      report.errors[0].scope,
      Scope::Nodegroup {
        cluster: "prod".to_owned(),
        nodegroup: "ng2".to_owned(),
      }
    );
    assert_eq!(report.errors[0].kind, ErrorKind::Server);
  }

  #[tokio::test]
  async fn rows_keep_discovery_order() {
    let resolver = StaticResolver("1.27.3-20240101");
    let inventory = StaticInventory {
      clusters: Ok(vec!["a", "b"]),
      nodegroups: HashMap::from([("a", Ok(vec!["ng2", "ng1"])), ("b", Ok(vec!["ng3"]))]),
      versions: HashMap::from([
        (("a", "ng2"), Ok("1.27.0-20231101")),
        (("a", "ng1"), Ok("1.27.1-20231201")),
        (("b", "ng3"), Ok("1.27.3-20240101")),
      ]),
    };

    let report = compare_release_versions(&resolver, &inventory, "1.27").await.unwrap();

    let order = report
      .rows
      .iter()
      .map(|row| (row.cluster.as_str(), row.nodegroup.as_str()))
      .collect::<Vec<_>>();
    assert_eq!(order, vec![("a", "ng2"), ("a", "ng1"), ("b", "ng3")]);
  }
}

//! Console quickstart step. Loads QuickStart manifests from a directory
//! baked into the operator image and upserts them with owner references so
//! they are garbage-collected with the owner. Failures here never fail the
//! pass; docs are not worth blocking storage reconciliation.

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::controller::ReconcileErr;
use crate::controller::convergence::{ChildKind, converge};
use crate::controller::steps::{PassContext, ReconcileStep};
use crate::crd::quickstart::QuickStart;
use crate::crd::storage_cluster::StorageCluster;
use crate::store::{ClusterStore, StoreError};

struct QuickStartKind;

#[async_trait]
impl ChildKind for QuickStartKind {
    type Resource = QuickStart;

    fn kind(&self) -> &'static str {
        "QuickStart"
    }

    fn api_version(&self) -> &'static str {
        "console.shoal.io/v1"
    }

    fn track_related(&self) -> bool {
        false
    }

    fn observed_state(&self, _found: &QuickStart) -> Option<String> {
        None
    }

    fn specs_equal(&self, desired: &QuickStart, found: &QuickStart) -> bool {
        desired.spec == found.spec
    }

    fn copy_spec(&self, desired: &QuickStart, onto: &mut QuickStart) {
        onto.spec = desired.spec.clone();
    }

    async fn get(
        &self,
        store: &dyn ClusterStore,
        namespace: &str,
        name: &str,
    ) -> Result<Option<QuickStart>, StoreError> {
        store.get_quickstart(namespace, name).await
    }

    async fn create(
        &self,
        store: &dyn ClusterStore,
        obj: &QuickStart,
    ) -> Result<QuickStart, StoreError> {
        store.create_quickstart(obj).await
    }

    async fn update(
        &self,
        store: &dyn ClusterStore,
        obj: &QuickStart,
    ) -> Result<QuickStart, StoreError> {
        store.update_quickstart(obj).await
    }
}

/// Read every regular file in `dir` as a YAML QuickStart manifest. Output is
/// sorted by name so convergence order is stable across passes.
pub fn load_quickstarts(dir: &Path) -> Result<Vec<QuickStart>, ReconcileErr> {
    let entries = std::fs::read_dir(dir).map_err(|source| ReconcileErr::QuickstartDir {
        path: dir.display().to_string(),
        source,
    })?;
    let mut docs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ReconcileErr::QuickstartDir {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let raw =
            std::fs::read_to_string(&path).map_err(|source| ReconcileErr::QuickstartDir {
                path: path.display().to_string(),
                source,
            })?;
        let doc: QuickStart =
            serde_yaml::from_str(&raw).map_err(|source| ReconcileErr::QuickstartManifest {
                path: path.display().to_string(),
                source,
            })?;
        docs.push(doc);
    }
    docs.sort_by_key(|d| d.name_any());
    Ok(docs)
}

pub struct QuickStartStep {
    dir: PathBuf,
}

impl QuickStartStep {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        QuickStartStep { dir: dir.into() }
    }
}

#[async_trait]
impl ReconcileStep for QuickStartStep {
    fn name(&self) -> &'static str {
        "quickstarts"
    }

    async fn run(
        &self,
        store: &dyn ClusterStore,
        owner: &mut StorageCluster,
        _pass: &mut PassContext,
    ) -> Result<(), ReconcileErr> {
        let docs = match load_quickstarts(&self.dir) {
            Ok(docs) => docs,
            Err(err) => {
                warn!(error = %err, "skipping quickstart sync");
                return Ok(());
            }
        };
        for mut doc in docs {
            doc.metadata.namespace = owner.meta().namespace.clone();
            doc.metadata
                .labels
                .get_or_insert_with(BTreeMap::new)
                .insert("app".to_string(), owner.name_any());
            doc.metadata.owner_references = owner.controller_owner_ref(&()).map(|r| vec![r]);
            let name = doc.name_any();
            if let Err(err) = converge(&QuickStartKind, store, owner, doc).await {
                warn!(quickstart = %name, error = %err, "failed to sync quickstart");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::storage_cluster::StorageClusterSpec;
    use crate::store::MockClusterStore;
    use std::io::Write as _;

    const GETTING_STARTED: &str = r#"
apiVersion: console.shoal.io/v1
kind: QuickStart
metadata:
  name: getting-started
spec:
  displayName: Getting started with Shoal
  durationMinutes: 5
  description: Create your first storage cluster.
  tasks:
    - title: Create a StorageCluster
      description: Apply a StorageCluster manifest.
"#;

    const OBJECT_BROWSER: &str = r#"
apiVersion: console.shoal.io/v1
kind: QuickStart
metadata:
  name: browse-objects
spec:
  displayName: Browse objects
  durationMinutes: 10
  description: Inspect buckets through the object gateway.
  tasks: []
"#;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_manifests_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "01-start.yaml", GETTING_STARTED);
        write_file(dir.path(), "02-browse.yaml", OBJECT_BROWSER);

        let docs = load_quickstarts(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name_any(), "browse-objects");
        assert_eq!(docs[1].name_any(), "getting-started");
        assert_eq!(docs[1].spec.duration_minutes, Some(5));
    }

    #[test]
    fn undecodable_file_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "ok.yaml", GETTING_STARTED);
        write_file(dir.path(), "broken.yaml", "displayName: [unclosed");

        let err = load_quickstarts(dir.path()).unwrap_err();
        assert!(matches!(err, ReconcileErr::QuickstartManifest { .. }));
    }

    #[test]
    fn missing_directory_fails_the_load() {
        let err = load_quickstarts(Path::new("/nonexistent/quickstarts")).unwrap_err();
        assert!(matches!(err, ReconcileErr::QuickstartDir { .. }));
    }

    #[tokio::test]
    async fn unloadable_directory_does_not_fail_the_step() {
        let mut owner = StorageCluster::new("primary", StorageClusterSpec::default());
        owner.metadata.namespace = Some("storage".into());
        // no expectations: the step must not touch the store when the load fails
        let store = MockClusterStore::new();
        let mut pass = PassContext::default();

        let step = QuickStartStep::new("/nonexistent/quickstarts");
        step.run(&store, &mut owner, &mut pass).await.unwrap();
        assert!(pass.aggregate.is_empty());
    }
}

//! Finalizer add/remove helpers, each applied as a JSON merge-patch on
//! `metadata.finalizers`. Namespaced and cluster-scoped resources get
//! separate functions rather than a generic `Api` builder closure, since the
//! `Api` constructor itself differs by scope.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Resource, ResourceExt};
use kube::core::{NamespaceResourceScope, ClusterResourceScope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

const PATCH_MANAGER: &str = "pdns-operator";

fn patch_params() -> PatchParams {
    PatchParams::apply(PATCH_MANAGER).force()
}

/// Adds `finalizer` to `obj.metadata.finalizers` if absent. Namespaced kinds.
pub async fn ensure_finalizer<T>(client: &Client, obj: &T, finalizer: &str) -> Result<(), kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    if obj.finalizers().iter().any(|f| f == finalizer) {
        return Ok(());
    }
    let mut finalizers = obj.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    let api: Api<T> = Api::namespaced(client.clone(), &obj.namespace().unwrap_or_default());
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&obj.name_any(), &patch_params(), &Patch::Merge(patch)).await?;
    Ok(())
}

pub async fn remove_finalizer<T>(client: &Client, obj: &T, finalizer: &str) -> Result<(), kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    if !obj.finalizers().iter().any(|f| f == finalizer) {
        return Ok(());
    }
    let finalizers: Vec<String> = obj.finalizers().iter().filter(|f| *f != finalizer).cloned().collect();
    let api: Api<T> = Api::namespaced(client.clone(), &obj.namespace().unwrap_or_default());
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&obj.name_any(), &patch_params(), &Patch::Merge(patch)).await?;
    Ok(())
}

/// Cluster-scoped counterparts.
pub async fn ensure_cluster_finalizer<T>(client: &Client, obj: &T, finalizer: &str) -> Result<(), kube::Error>
where
    T: Resource<Scope = ClusterResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    if obj.finalizers().iter().any(|f| f == finalizer) {
        return Ok(());
    }
    let mut finalizers = obj.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    let api: Api<T> = Api::all(client.clone());
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&obj.name_any(), &patch_params(), &Patch::Merge(patch)).await?;
    Ok(())
}

pub async fn remove_cluster_finalizer<T>(client: &Client, obj: &T, finalizer: &str) -> Result<(), kube::Error>
where
    T: Resource<Scope = ClusterResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Serialize + std::fmt::Debug,
{
    if !obj.finalizers().iter().any(|f| f == finalizer) {
        return Ok(());
    }
    let finalizers: Vec<String> = obj.finalizers().iter().filter(|f| *f != finalizer).cloned().collect();
    let api: Api<T> = Api::all(client.clone());
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&obj.name_any(), &patch_params(), &Patch::Merge(patch)).await?;
    Ok(())
}

/// `true` once `meta.deletionTimestamp` has been set by the API server.
pub fn is_deleted(meta: &ObjectMeta) -> bool {
    meta.deletion_timestamp.is_some()
}

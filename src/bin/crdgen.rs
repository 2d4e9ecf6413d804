//! Emits the operator's CRD OpenAPI schemas as YAML, for consumption by
//! packaging steps (Helm, kustomize) that stay outside core scope.
//!
//! Usage:
//!   cargo run --bin crdgen -- --output-dir deploy/crds

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use kube::CustomResourceExt;
use serde_json::Value;

use pdns_operator::crd::{ClusterRRset, ClusterZone, Provider, RRset, Zone};

const GENERATED_HEADER: &str = "# This file is generated from src/crd.rs.\n# Do not edit manually; run `cargo run --bin crdgen` to regenerate.\n";

#[derive(Parser)]
struct Args {
    /// Directory the CRD YAML files are written to.
    #[arg(long, default_value = "deploy/crds")]
    output_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    fs::create_dir_all(&args.output_dir)?;

    generate_crd::<Provider>("providers.crd.yaml", &args.output_dir)?;
    generate_crd::<Zone>("zones.crd.yaml", &args.output_dir)?;
    generate_crd::<ClusterZone>("clusterzones.crd.yaml", &args.output_dir)?;
    generate_crd::<RRset>("rrsets.crd.yaml", &args.output_dir)?;
    generate_crd::<ClusterRRset>("clusterrrsets.crd.yaml", &args.output_dir)?;

    println!("Generated CRD manifests in {}", args.output_dir.display());
    Ok(())
}

/// Writes one CRD's YAML, widening its single generated `served`/`storage`
/// version into the full `v1alpha1`/`v1alpha2`/`v1alpha3` set this operator
/// declares (only `v1alpha2` is ever served or stored; see DESIGN.md).
fn generate_crd<T>(filename: &str, output_dir: &Path) -> Result<(), Box<dyn std::error::Error>>
where
    T: CustomResourceExt,
{
    let crd = T::crd();
    let mut crd_json: Value = serde_json::to_value(&crd)?;

    if let Some(versions) = crd_json["spec"]["versions"].as_array_mut() {
        if let Some(storage_version) = versions.first().cloned() {
            let mut v1alpha1 = storage_version.clone();
            v1alpha1["name"] = Value::String("v1alpha1".to_string());
            v1alpha1["served"] = Value::Bool(false);
            v1alpha1["storage"] = Value::Bool(false);
            v1alpha1["deprecated"] = Value::Bool(true);

            let mut v1alpha3 = storage_version.clone();
            v1alpha3["name"] = Value::String("v1alpha3".to_string());
            v1alpha3["served"] = Value::Bool(false);
            v1alpha3["storage"] = Value::Bool(false);

            versions.insert(0, v1alpha1);
            versions.push(v1alpha3);
        }
    }

    let yaml = serde_yaml::to_string(&crd_json)?;
    let content = format!("{GENERATED_HEADER}{yaml}");

    fs::write(output_dir.join(filename), content)?;
    println!("  wrote {filename}");
    Ok(())
}

#[cfg(test)]
mod crdgen_tests;

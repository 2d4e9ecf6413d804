use super::*;

#[test]
fn generated_crd_declares_three_versions() {
    let dir = tempfile::tempdir().expect("create temp dir");
    generate_crd::<Provider>("providers.crd.yaml", dir.path()).expect("generate crd");

    let written = fs::read_to_string(dir.path().join("providers.crd.yaml")).expect("read generated crd");
    let parsed: Value = serde_yaml::from_str(&written).expect("parse generated yaml");
    let versions = parsed["spec"]["versions"].as_array().expect("versions array");

    assert_eq!(versions.len(), 3);
    let names: Vec<&str> = versions.iter().map(|v| v["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["v1alpha1", "v1alpha2", "v1alpha3"]);

    assert_eq!(versions[0]["served"], Value::Bool(false));
    assert_eq!(versions[0]["deprecated"], Value::Bool(true));
    assert_eq!(versions[1]["served"], Value::Bool(true));
    assert_eq!(versions[1]["storage"], Value::Bool(true));
    assert_eq!(versions[2]["served"], Value::Bool(false));
    assert_eq!(versions[2]["storage"], Value::Bool(false));
}

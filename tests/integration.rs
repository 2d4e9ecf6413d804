//! Integration tests against a real (or kind/minikube) cluster.
//!
//! Every test skips itself via `get_kube_client_or_skip` when no cluster is
//! reachable, so `cargo test` stays green in CI sandboxes with no cluster.
//! Run with `cargo test -- --ignored` against a cluster that has this
//! operator's CRDs installed.

mod common;

use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::ResourceExt;

use pdns_operator::crd::{
    ClusterRRset, ClusterRRsetCrdSpec, ClusterZone, ClusterZoneCrdSpec, DnsKind, ParentKind,
    ParentRef, Provider, ProviderSpec, RRset, RRsetCrdSpec, RRsetSpec, SecretKeyRef, SoaEditApi,
    Zone, ZoneCrdSpec, ZoneSpec,
};

const TEST_NAMESPACE: &str = "pdns-operator-integration";

fn test_provider_spec() -> ProviderSpec {
    ProviderSpec {
        url: "http://pdns.example.internal:8081".into(),
        vhost: "localhost".into(),
        timeout_seconds: 10,
        proxy_url: None,
        tls: Default::default(),
        credentials: SecretKeyRef {
            name: "pdns-api-key".into(),
            namespace: TEST_NAMESPACE.into(),
            key: "apiKey".into(),
        },
        reconcile_interval_seconds: 300,
    }
}

fn test_zone_spec(provider_name: &str) -> ZoneSpec {
    ZoneSpec {
        kind: DnsKind::Native,
        nameservers: vec!["ns1.example.com.".into(), "ns2.example.com.".into()],
        catalog: None,
        soa_edit_api: SoaEditApi::Increase,
        provider_ref: Some(pdns_operator::crd::ProviderRef {
            name: provider_name.into(),
        }),
    }
}

#[tokio::test]
#[ignore]
async fn provider_create_read_delete() {
    let client = match common::get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    common::create_test_namespace(&client, TEST_NAMESPACE)
        .await
        .expect("create test namespace");

    let providers: Api<Provider> = Api::all(client.clone());
    let provider = Provider::new("itest-provider", test_provider_spec());

    let created = match providers.create(&PostParams::default(), &provider).await {
        Ok(p) => p,
        Err(kube::Error::Api(ae)) if ae.code == 409 => providers
            .get("itest-provider")
            .await
            .expect("fetch pre-existing provider"),
        Err(e) => panic!("failed to create provider: {e}"),
    };
    assert_eq!(created.spec.vhost, "localhost");

    let fetched = providers.get("itest-provider").await.expect("get provider");
    assert_eq!(fetched.spec.url, test_provider_spec().url);

    providers
        .delete("itest-provider", &DeleteParams::default())
        .await
        .ok();

    common::delete_test_namespace(&client, TEST_NAMESPACE).await;
}

#[tokio::test]
#[ignore]
async fn zone_create_list_delete() {
    let client = match common::get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    common::create_test_namespace(&client, TEST_NAMESPACE)
        .await
        .expect("create test namespace");

    let zones: Api<Zone> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let zone = Zone::new(
        "itest-zone",
        ZoneCrdSpec {
            common: test_zone_spec("itest-provider"),
        },
    );

    match zones.create(&PostParams::default(), &zone).await {
        Ok(_) => {}
        Err(kube::Error::Api(ae)) if ae.code == 409 => {}
        Err(e) => panic!("failed to create zone: {e}"),
    }

    let listed = zones.list(&ListParams::default()).await.expect("list zones");
    assert!(listed.items.iter().any(|z| z.name_any() == "itest-zone"));

    zones.delete("itest-zone", &DeleteParams::default()).await.ok();
    common::delete_test_namespace(&client, TEST_NAMESPACE).await;
}

#[tokio::test]
#[ignore]
async fn cluster_zone_create_delete() {
    let client = match common::get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let zones: Api<ClusterZone> = Api::all(client.clone());
    let zone = ClusterZone::new(
        "itest-cluster-zone",
        ClusterZoneCrdSpec {
            common: test_zone_spec("itest-provider"),
        },
    );

    match zones.create(&PostParams::default(), &zone).await {
        Ok(_) => {}
        Err(kube::Error::Api(ae)) if ae.code == 409 => {}
        Err(e) => panic!("failed to create cluster zone: {e}"),
    }

    let fetched = zones.get("itest-cluster-zone").await.expect("get cluster zone");
    assert_eq!(fetched.spec.common.nameservers.len(), 2);

    zones
        .delete("itest-cluster-zone", &DeleteParams::default())
        .await
        .ok();
}

#[tokio::test]
#[ignore]
async fn rrset_create_read_delete() {
    let client = match common::get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };
    common::create_test_namespace(&client, TEST_NAMESPACE)
        .await
        .expect("create test namespace");

    let rrsets: Api<RRset> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let rrset = RRset::new(
        "itest-rrset",
        RRsetCrdSpec {
            common: RRsetSpec {
                record_type: "A".into(),
                name: "www".into(),
                ttl: 3600,
                records: vec!["203.0.113.10".into()],
                comment: Some("integration test record".into()),
                parent_ref: ParentRef {
                    name: "itest-zone".into(),
                    namespace: Some(TEST_NAMESPACE.into()),
                    kind: ParentKind::Zone,
                },
            },
        },
    );

    match rrsets.create(&PostParams::default(), &rrset).await {
        Ok(_) => {}
        Err(kube::Error::Api(ae)) if ae.code == 409 => {}
        Err(e) => panic!("failed to create rrset: {e}"),
    }

    let fetched = rrsets.get("itest-rrset").await.expect("get rrset");
    assert_eq!(fetched.spec.common.record_type, "A");

    rrsets.delete("itest-rrset", &DeleteParams::default()).await.ok();
    common::delete_test_namespace(&client, TEST_NAMESPACE).await;
}

#[tokio::test]
#[ignore]
async fn cluster_rrset_create_delete() {
    let client = match common::get_kube_client_or_skip().await {
        Some(c) => c,
        None => return,
    };

    let rrsets: Api<ClusterRRset> = Api::all(client.clone());
    let rrset = ClusterRRset::new(
        "itest-cluster-rrset",
        ClusterRRsetCrdSpec {
            common: RRsetSpec {
                record_type: "TXT".into(),
                name: "_itest".into(),
                ttl: 300,
                records: vec!["\"hello\"".into()],
                comment: None,
                parent_ref: ParentRef {
                    name: "itest-cluster-zone".into(),
                    namespace: None,
                    kind: ParentKind::ClusterZone,
                },
            },
        },
    );

    match rrsets.create(&PostParams::default(), &rrset).await {
        Ok(_) => {}
        Err(kube::Error::Api(ae)) if ae.code == 409 => {}
        Err(e) => panic!("failed to create cluster rrset: {e}"),
    }

    let listed = rrsets.list(&ListParams::default()).await.expect("list cluster rrsets");
    assert!(listed
        .items
        .iter()
        .any(|r| r.name_any() == "itest-cluster-rrset"));

    rrsets
        .delete("itest-cluster-rrset", &DeleteParams::default())
        .await
        .ok();
}

#[test]
fn provider_spec_builder_is_sane() {
    let spec = test_provider_spec();
    assert_eq!(spec.credentials.key, "apiKey");
    assert_eq!(spec.timeout_seconds, 10);
}

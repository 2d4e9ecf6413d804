use crate::crd::{DnsKind, SoaEditApi};
use crate::powerdns::types::ZoneKind;
use crate::reconcilers::zone::{to_wire_kind, to_wire_soa_edit_api};

#[test]
fn wire_kind_mapping_round_trips_all_variants() {
    assert_eq!(to_wire_kind(DnsKind::Native), ZoneKind::Native);
    assert_eq!(to_wire_kind(DnsKind::Slave), ZoneKind::Slave);
}

#[test]
fn soa_edit_api_maps_to_upstream_uppercase_tokens() {
    assert_eq!(to_wire_soa_edit_api(SoaEditApi::Default), "DEFAULT");
    assert_eq!(to_wire_soa_edit_api(SoaEditApi::Increase), "INCREASE");
    assert_eq!(to_wire_soa_edit_api(SoaEditApi::Epoch), "EPOCH");
}

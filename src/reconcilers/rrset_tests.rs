use crate::reconcilers::rrset::compute_dns_entry_name;

#[test]
fn apex_name_resolves_to_zone_fqdn() {
    assert_eq!(compute_dns_entry_name("", "example.com."), "example.com.");
    assert_eq!(compute_dns_entry_name("@", "example.com."), "example.com.");
}

#[test]
fn relative_name_is_prefixed_and_lowercased() {
    assert_eq!(compute_dns_entry_name("WWW", "example.com."), "www.example.com.");
}

//! Change detection
//!
//! Pure comparison of a fresh snapshot against the last published state.

use crate::address::{AddressClass, AddressSnapshot};
use std::net::IpAddr;

/// A class whose resolved address differs from what was last published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressChange {
    pub class: AddressClass,
    pub new_ip: IpAddr,
    pub previous_ip: Option<IpAddr>,
}

/// Report the enabled classes that changed, in [`AddressClass::ALL`] order.
///
/// A class is changed iff the snapshot holds a value for it and that value
/// differs from the published one. Classes outside `enabled` never report.
pub fn detect_changes(
    snapshot: &AddressSnapshot,
    published: &AddressSnapshot,
    enabled: &[AddressClass],
) -> Vec<AddressChange> {
    AddressClass::ALL
        .into_iter()
        .filter(|class| enabled.contains(class))
        .filter_map(|class| {
            let new_ip = snapshot.get(class)?;
            let previous_ip = published.get(class);
            (previous_ip != Some(new_ip)).then_some(AddressChange {
                class,
                new_ip,
                previous_ip,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_equal_snapshot_reports_nothing() {
        let snapshot = AddressSnapshot::default().with(AddressClass::ExternalV4, ip("203.0.113.7"));
        let changes = detect_changes(&snapshot, &snapshot, &AddressClass::ALL);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_empty_value_never_changes() {
        let published = AddressSnapshot::default().with(AddressClass::ExternalV4, ip("203.0.113.7"));
        let changes = detect_changes(&AddressSnapshot::default(), &published, &AddressClass::ALL);
        assert!(changes.is_empty(), "an undiscovered class must not clear state");
    }

    #[test]
    fn test_first_value_is_a_change() {
        let snapshot = AddressSnapshot::default().with(AddressClass::ExternalV4, ip("203.0.113.7"));
        let changes = detect_changes(&snapshot, &AddressSnapshot::default(), &AddressClass::ALL);

        assert_eq!(
            changes,
            vec![AddressChange {
                class: AddressClass::ExternalV4,
                new_ip: ip("203.0.113.7"),
                previous_ip: None,
            }]
        );
    }

    #[test]
    fn test_disabled_class_is_ignored() {
        let snapshot = AddressSnapshot::default()
            .with(AddressClass::ExternalV4, ip("203.0.113.7"))
            .with(AddressClass::InternalV4, ip("192.168.1.20"));

        let changes = detect_changes(
            &snapshot,
            &AddressSnapshot::default(),
            &[AddressClass::InternalV4],
        );

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].class, AddressClass::InternalV4);
    }

    #[test]
    fn test_changes_follow_class_order() {
        let snapshot = AddressSnapshot::default()
            .with(AddressClass::InternalV6, ip("fd00::20"))
            .with(AddressClass::ExternalV6, ip("2001:db8::7"))
            .with(AddressClass::ExternalV4, ip("203.0.113.7"));

        let classes: Vec<_> = detect_changes(
            &snapshot,
            &AddressSnapshot::default(),
            &[AddressClass::InternalV6, AddressClass::ExternalV4, AddressClass::ExternalV6],
        )
        .into_iter()
        .map(|change| change.class)
        .collect();

        assert_eq!(
            classes,
            vec![AddressClass::ExternalV4, AddressClass::ExternalV6, AddressClass::InternalV6]
        );
    }
}

//! Notice construction per trap kind.

use ibsendtrap_mad::consts::{
    NODE_TYPE_CA, TRAP_144_NODE_DESCRIPTION_CHANGE, TRAP_144_OTHER_LOCAL_CHANGES,
    TRAP_LOCAL_CHANGES, TRAP_LOCAL_LINK_INTEGRITY,
};
use ibsendtrap_mad::{LinkIntegrityDetails, NodeDescChangeDetails, Notice, NoticeDetails};

use crate::catalog::TrapKind;
use crate::context::TrapConfig;

/// Build the notice for `kind` as issued by `issuer_lid`.
pub fn build_notice(kind: TrapKind, issuer_lid: u16, config: &TrapConfig) -> Notice {
    match kind {
        TrapKind::NodeDescChange => node_desc_change(issuer_lid),
        TrapKind::LocalLinkIntegrity => local_link_integrity(issuer_lid, config.error_port),
    }
}

/// Trap 144: the issuer's NodeDescription changed.
pub fn node_desc_change(issuer_lid: u16) -> Notice {
    Notice::generic_info(
        NODE_TYPE_CA,
        TRAP_LOCAL_CHANGES,
        issuer_lid,
        NoticeDetails::NodeDescChange(NodeDescChangeDetails {
            lid: issuer_lid,
            local_changes: TRAP_144_OTHER_LOCAL_CHANGES,
            change_flags: TRAP_144_NODE_DESCRIPTION_CHANGE,
            ..NodeDescChangeDetails::default()
        }),
    )
}

/// Trap 129: local link integrity threshold reached on `error_port`.
pub fn local_link_integrity(issuer_lid: u16, error_port: i64) -> Notice {
    Notice::generic_info(
        NODE_TYPE_CA,
        TRAP_LOCAL_LINK_INTEGRITY,
        issuer_lid,
        NoticeDetails::LinkIntegrity(LinkIntegrityDetails {
            pad: 0,
            lid: issuer_lid,
            port_num: port_num_from(error_port),
        }),
    )
}

/// The wire `port_num` for a configured port.
///
/// No range check: values outside 0..=255 wrap to the low byte.
pub fn port_num_from(error_port: i64) -> u8 {
    error_port as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_details(notice: &Notice) -> LinkIntegrityDetails {
        match notice.details {
            NoticeDetails::LinkIntegrity(d) => d,
            ref other => panic!("expected link integrity details, got {other:?}"),
        }
    }

    #[test]
    fn node_desc_change_fields() {
        for lid in [0u16, 3, 0xBFFF, u16::MAX] {
            let notice = node_desc_change(lid);
            assert_eq!(notice.trap_number, 144);
            assert!(notice.is_generic());
            assert_eq!(notice.producer_type, NODE_TYPE_CA);
            assert_eq!(notice.issuer_lid, lid);
            match notice.details {
                NoticeDetails::NodeDescChange(d) => {
                    assert_eq!(d.lid, lid);
                    assert_eq!(d.local_changes, TRAP_144_OTHER_LOCAL_CHANGES);
                    assert_eq!(d.change_flags, TRAP_144_NODE_DESCRIPTION_CHANGE);
                    assert_eq!(d.new_cap_mask, 0);
                }
                ref other => panic!("expected trap 144 details, got {other:?}"),
            }
        }
    }

    #[test]
    fn local_link_integrity_fields() {
        let notice = local_link_integrity(7, 4);
        assert_eq!(notice.trap_number, 129);
        assert_eq!(notice.generic_type & 0x80, 0x80);
        assert_eq!(notice.issuer_lid, 7);

        let details = link_details(&notice);
        assert_eq!(details.pad, 0);
        assert_eq!(details.lid, 7);
        assert_eq!(details.port_num, 4);
    }

    #[test]
    fn default_config_uses_port_one() {
        let notice = build_notice(TrapKind::LocalLinkIntegrity, 1, &TrapConfig::default());
        assert_eq!(link_details(&notice).port_num, 1);
    }

    #[test]
    fn out_of_range_ports_wrap_to_low_byte() {
        assert_eq!(port_num_from(0), 0);
        assert_eq!(port_num_from(255), 255);
        assert_eq!(port_num_from(256), 0);
        assert_eq!(port_num_from(257), 1);
        assert_eq!(port_num_from(-1), 255);
        assert_eq!(port_num_from(-256), 0);

        let notice = local_link_integrity(2, 300);
        assert_eq!(link_details(&notice).port_num, 44);
    }

    #[test]
    fn build_notice_follows_kind() {
        let config = TrapConfig::default();
        for kind in crate::catalog::TRAPS {
            let notice = build_notice(kind, 5, &config);
            assert_eq!(notice.trap_number, kind.trap_number());
            assert_eq!(notice.issuer_lid, 5);
        }
    }
}

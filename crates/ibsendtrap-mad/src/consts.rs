//! Wire constants from the InfiniBand management model.
//!
//! Only the values a trap sender touches are defined here.

/// MAD base version.
pub const MAD_BASE_VERSION: u8 = 1;

/// Class version for both SMI management classes.
pub const SMI_CLASS_VERSION: u8 = 1;

/// Subnet management, LID routed.
pub const IB_SMI_CLASS: u8 = 0x01;

/// Subnet management, directed route.
pub const IB_SMI_DIRECT_CLASS: u8 = 0x81;

/// Unsolicited notification to the manager.
pub const METHOD_TRAP: u8 = 0x05;

/// Notice attribute ID.
pub const ATTR_NOTICE: u16 = 0x0002;

/// Offset of the SMP data area within the MAD.
pub const SMP_DATA_OFFSET: usize = 64;

/// Size of the SMP data area.
pub const SMP_DATA_SIZE: usize = 64;

/// IsGeneric bit of the notice `generic_type` byte.
pub const NOTICE_GENERIC: u8 = 0x80;

/// Notice type: informational.
pub const NOTICE_TYPE_INFO: u8 = 0x04;

/// Producer (node) type: channel adapter.
pub const NODE_TYPE_CA: u32 = 1;

/// Trap 129: local link integrity threshold reached.
pub const TRAP_LOCAL_LINK_INTEGRITY: u16 = 129;

/// Trap 130: excessive buffer overrun threshold reached.
pub const TRAP_BUFFER_OVERRUN: u16 = 130;

/// Trap 131: flow control update watchdog timer expired.
pub const TRAP_FLOW_CONTROL_WATCHDOG: u16 = 131;

/// Trap 144: local capability mask or other local attribute changed.
pub const TRAP_LOCAL_CHANGES: u16 = 144;

/// Trap 144 `local_changes`: a change other than the capability mask.
pub const TRAP_144_OTHER_LOCAL_CHANGES: u8 = 0x01;

/// Trap 144 `change_flags`: LinkWidthEnabled changed.
pub const TRAP_144_LINK_WIDTH_ENABLE_CHANGE: u16 = 0x0001;

/// Trap 144 `change_flags`: LinkSpeedEnabled changed.
pub const TRAP_144_LINK_SPEED_ENABLE_CHANGE: u16 = 0x0002;

/// Trap 144 `change_flags`: NodeDescription changed.
pub const TRAP_144_NODE_DESCRIPTION_CHANGE: u16 = 0x0004;

/// Trap 144 `change_flags`: SystemImageGUID changed.
pub const TRAP_144_SYSTEM_IMAGE_GUID_CHANGE: u16 = 0x0008;

/// Returns a human-readable name for a generic trap number.
pub fn trap_name(trap_number: u16) -> &'static str {
    match trap_number {
        TRAP_LOCAL_LINK_INTEGRITY => "LOCAL_LINK_INTEGRITY",
        TRAP_BUFFER_OVERRUN => "BUFFER_OVERRUN",
        TRAP_FLOW_CONTROL_WATCHDOG => "FLOW_CONTROL_WATCHDOG",
        TRAP_LOCAL_CHANGES => "LOCAL_CHANGES",
        _ => "OTHER",
    }
}

/// Returns true if the trap number uses the 129/130/131 data layout.
pub fn is_port_error_trap(trap_number: u16) -> bool {
    (TRAP_LOCAL_LINK_INTEGRITY..=TRAP_FLOW_CONTROL_WATCHDOG).contains(&trap_number)
}

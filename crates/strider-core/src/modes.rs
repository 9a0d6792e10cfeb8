//! Contact-mode encoding.
//!
//! A mode number is a bitmask over the four contact points, most significant
//! bit first:
//!
//! ```text
//! bit 3: LF   bit 2: RF   bit 1: LH   bit 0: RH
//! ```
//!
//! A set bit means the leg is in stance. `STANCE` (15) is full contact and
//! `FLY` (0) has every leg in the air.

use crate::types::NUM_CONTACT_POINTS;

/// Opaque mode tag encoding which legs are in contact.
pub type ModeNumber = usize;

/// Per-leg stance flags in leg order (LF, RF, LH, RH).
pub type ContactFlags = [bool; NUM_CONTACT_POINTS];

pub const FLY: ModeNumber = 0b0000;
pub const RH: ModeNumber = 0b0001;
pub const LH: ModeNumber = 0b0010;
pub const LH_RH: ModeNumber = 0b0011;
pub const RF: ModeNumber = 0b0100;
pub const RF_RH: ModeNumber = 0b0101;
pub const RF_LH: ModeNumber = 0b0110;
pub const RF_LH_RH: ModeNumber = 0b0111;
pub const LF: ModeNumber = 0b1000;
pub const LF_RH: ModeNumber = 0b1001;
pub const LF_LH: ModeNumber = 0b1010;
pub const LF_LH_RH: ModeNumber = 0b1011;
pub const LF_RF: ModeNumber = 0b1100;
pub const LF_RF_RH: ModeNumber = 0b1101;
pub const LF_RF_LH: ModeNumber = 0b1110;
pub const STANCE: ModeNumber = 0b1111;

/// Mode used wherever no gait has been scheduled.
pub const DEFAULT_MODE: ModeNumber = STANCE;

const fn leg_bit(leg: usize) -> ModeNumber {
    1 << (NUM_CONTACT_POINTS - 1 - leg)
}

/// Decode a mode number into per-leg stance flags.
pub const fn mode_number_to_contact_flags(mode: ModeNumber) -> ContactFlags {
    let mut flags = [false; NUM_CONTACT_POINTS];
    let mut leg = 0;
    while leg < NUM_CONTACT_POINTS {
        flags[leg] = mode & leg_bit(leg) != 0;
        leg += 1;
    }
    flags
}

/// Encode per-leg stance flags into a mode number.
pub const fn contact_flags_to_mode_number(flags: &ContactFlags) -> ModeNumber {
    let mut mode = 0;
    let mut leg = 0;
    while leg < NUM_CONTACT_POINTS {
        if flags[leg] {
            mode |= leg_bit(leg);
        }
        leg += 1;
    }
    mode
}

/// Number of legs in stance.
pub fn stance_leg_count(flags: &ContactFlags) -> usize {
    flags.iter().filter(|&&c| c).count()
}

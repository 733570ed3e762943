// SPDX-License-Identifier: MPL-2.0

//! Named constants that would otherwise be magic integers, per spec §4.5
//! and §9's directive to surface these "as explicit variants rather than
//! magic integers."

/// The legacy Windows offset heuristic (spec §4.5): a failing lock whose
/// `start` falls at or above this threshold, with bit 63 clear, is
/// remapped from `LOCK_NOT_GRANTED` to `FILE_LOCK_CONFLICT` regardless of
/// the requested timeout. This mirrors a long-standing Windows client
/// expectation around the top of the 32-bit-visible address space.
pub const LEGACY_WINDOWS_OFFSET_THRESHOLD: u64 = 0xEF00_0000;

/// Bit 63 of `start`; part of the same heuristic.
pub const SIGN_BIT: u64 = 1 << 63;

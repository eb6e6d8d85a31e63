use std::fmt::Debug;

pub mod adler32;
pub mod crc32;

/// Whole-block checksum algorithm plugged into signature generation.
///
/// Must be a pure function of the block's bytes: same input, same
/// checksum, no side effects. Any fixed-width digest works as long as its
/// value type satisfies the bounds the signature writer asks for.
pub trait BlockChecksum {
    type ChecksumType: PartialEq + Debug + Copy;

    fn checksum(data: &[u8]) -> Self::ChecksumType;
}

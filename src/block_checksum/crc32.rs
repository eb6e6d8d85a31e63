use crate::block_checksum::BlockChecksum;

/// CRC-32 (IEEE) over the whole block. The default signature checksum.
pub struct Crc32 {}

impl BlockChecksum for Crc32 {
    type ChecksumType = u32;

    fn checksum(data: &[u8]) -> Self::ChecksumType {
        crc32fast::hash(data)
    }
}

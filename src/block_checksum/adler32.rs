use crate::block_checksum::BlockChecksum;

pub struct Adler32 {}

impl BlockChecksum for Adler32 {
    type ChecksumType = u32;

    fn checksum(data: &[u8]) -> Self::ChecksumType {
        adler32::RollingAdler32::from_buffer(data).hash()
    }
}

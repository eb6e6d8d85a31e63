pub mod signature_generation;

pub mod block_checksum;
pub mod blocking_queue;
pub mod task_future;
pub mod worker_pool;

/// Default bound on a `Connecting` connection before it is failed.
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;
/// Default wake-up interval for reader and establishment threads.
pub const DEFAULT_READER_POLL_MS: u64 = 50;
/// Default capacity of the logger queue.
pub const DEFAULT_LOG_QUEUE_CAPACITY: usize = 4_096;
/// Length of generated participant ids.
pub const PARTICIPANT_ID_LEN: usize = 21;
/// Closed connections kept for state queries before being forgotten.
pub const MAX_CLOSED_CONNECTIONS: usize = 16;

/// Quiet period after the last keystroke before `stop-typing` is emitted.
pub const TYPING_QUIET_PERIOD_MS: u64 = 1500;

/// Capacity of the store command queue.
pub const COMMAND_BUFFER: usize = 256;

/// Capacity of the store-to-UI notification queue.
pub const NOTIFICATION_BUFFER: usize = 256;

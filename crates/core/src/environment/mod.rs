//! Battery event sources feeding the session's input channel.

pub mod stdin;
pub mod sysfs;

mod session;
mod shutdown;

pub use session::{MonitorSession, Processed, SessionEnd, SessionHandle};
pub use shutdown::ShutdownGuard;

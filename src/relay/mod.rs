// Message relay: room fan-out, private notifications and connection lifecycle

pub use engine::{NotifyOutcome, RelayEngine, SendReceipt};

mod engine;

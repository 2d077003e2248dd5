//! dirchain node: the consensus state machine around the process lists.
//!
//! The node owns a single [`ValidatorLoop`] that:
//! - Journals every inbound message in arrival order
//! - Authenticates block-sealing messages against the federated servers
//! - Appends messages to the process list of the current height
//! - Turns minute ticks into signed end-of-minute messages ([`Timer`])
//! - Seals each height into sub-blocks and a directory block and persists
//!   them through the database overlay

pub mod config;
pub mod error;
pub mod journal;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod queues;
pub mod shutdown;
pub mod state;
pub mod timer;
pub mod validator;

pub use config::NodeConfig;
pub use error::NodeError;
pub use journal::{read_journal, Journal, JournalRecord};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::Node;
pub use queues::QueueHandles;
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use state::{ChainTip, OverlayTips, State};
pub use timer::{spawn_minute_ticker, Timer};
pub use validator::{StepOutcome, ValidatorLoop};

#![crate_name = "lnchan"]

//! Channel bookkeeping for a Lightning wallet client.
//!
//! Two independent halves:
//! - opening a channel from free-form operator input, see
//!   [`coordinator::ChannelOpenCoordinator`]
//! - keeping a displayable view of channel state in sync with the
//!   channel backend, see [`updater::RegistryUpdater`]

#![forbid(unsafe_code)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(missing_docs)]

pub use bitcoin;
pub use lightning_invoice;

/// Channel backend interface
pub mod backend;
/// Channel-open orchestration
pub mod coordinator;
/// Peer and gossip directories
pub mod directory;
/// Errors
pub mod error;
/// Invoice decoding
pub mod invoice;
/// Identifiers and channel entities
pub mod model;
/// Displayable channel view
pub mod registry;
/// Operator input parsing
pub mod resolver;
/// Channel event queue and its consumer
pub mod updater;
/// Various utilities
pub mod util;

pub use backend::ChannelBackend;
pub use coordinator::ChannelOpenCoordinator;
pub use directory::{NodeDirectory, PeerDirectory, StaticDirectory, StatusSummary};
pub use error::{ChannelOpenError, ForceCloseError, ResolutionError};
pub use model::{Channel, ChannelId, ChannelState, NodeId};
pub use registry::ChannelRegistry;
pub use resolver::ConnectionResolver;
pub use updater::{ChannelEvent, EventSender, RegistryUpdater};

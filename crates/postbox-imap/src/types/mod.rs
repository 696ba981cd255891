//! Core IMAP types.

mod capability;
mod flags;
mod identifiers;
mod namespace;
mod response_code;

pub use capability::{Capabilities, Capability, ProtocolLevel, Status};
pub use flags::{FlagsDiff, MessageFlags, diff, merge, merge_flags};
pub use identifiers::{CommandId, SeqNum, Tag, Uid, UidValidity};
pub use namespace::{Namespace, Namespaces};
pub use response_code::ResponseCode;

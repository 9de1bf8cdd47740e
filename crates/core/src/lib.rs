pub mod catalog;
pub mod decoders;
pub mod error;
pub mod models;
pub mod notifications;
pub mod parsing;

pub use decoders::{decode_transaction, Decode};
pub use error::DecodeError;
pub use notifications::{decode_notification, Notification, NotificationDispatcher, NotificationKind};

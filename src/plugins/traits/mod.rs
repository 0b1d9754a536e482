pub mod notifier;
pub mod source;

pub use notifier::{Notification, NotificationResult, NotifierPlugin};
pub use source::SourceAdapter;

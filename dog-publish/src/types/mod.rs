pub mod ids;
pub mod content;
pub mod destination;
pub mod subscriber;
pub mod record;
pub mod events;

pub use ids::{QueueId, SubscriberId};
pub use content::{ContentItem, PublishingAction};
pub use destination::{
    Destination, DestinationConfig, EmailConfig, FileConfig, FtpConfig, HttpPushConfig,
    OdbcConfig, PullConfig, TransportKind,
};
pub use subscriber::{ContentFilterBinding, FilterType, Subscriber, SubscriberType};
pub use record::{BulkActions, FormattedItem, QueueItem, QueueState, Transition};
pub use events::{QueueEvent, TransportEvent};

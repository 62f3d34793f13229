pub mod delivery;
pub mod discord;
pub mod traits;

pub use delivery::{DeliveryOutcome, TypedDelivery};
pub use discord::DiscordChannel;
pub use traits::{Channel, ChannelInfo, ChannelMessage, HistoryMessage};

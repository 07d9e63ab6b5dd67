mod models;
mod platform;

pub use models::{
    extract_hashtags, Client, ConnectionStatus, PostStatus, ScheduledPost, SocialToken, TokenGrant,
};
pub use platform::{Platform, UnknownPlatform};

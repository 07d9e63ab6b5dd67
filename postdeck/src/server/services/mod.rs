pub mod oauth_manager;
pub mod platforms;
pub mod rewriter;
pub mod scheduler;
pub mod state_store;
pub mod state_token;
pub mod text_generator;

pub use oauth_manager::{Authorization, ConnectionSummary, OAuthManager};
pub use platforms::{PlatformExchanger, PlatformRegistry};
pub use rewriter::{CaptionRewriter, RewriteBatch, RewriteOutcome};
pub use scheduler::{GenerateSchedule, GeneratedSchedule, ScheduleGenerator};
pub use state_store::StateStore;
pub use text_generator::{ChatCompletionGenerator, TextGenerator};

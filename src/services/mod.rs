//! Resolution pipeline services

pub mod dispatcher;
pub mod image_cacher;
pub mod orchestrator;
pub mod recall_checker;

pub use dispatcher::{ProviderLimits, RateLimitedDispatcher};
pub use image_cacher::ImageCacher;
pub use orchestrator::{Tier, TierPolicy, TieredOrchestrator};
pub use recall_checker::{FoodRecallClient, RecallChecker, RecallSource};

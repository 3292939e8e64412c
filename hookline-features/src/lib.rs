pub mod error;
pub mod config;
pub mod host;
pub mod nonce;
pub mod feature;
pub mod sticker;
pub mod animate;

pub use animate::AnimatedMediaFeature;
pub use config::{AnimateConfig, FeaturesConfig, StickerConfig};
pub use error::{FeatureError, FeatureResult};
pub use feature::{Feature, FeatureManager};
pub use sticker::StickerSendFeature;

pub mod error;
pub mod config;
pub mod canonical;
pub mod pipeline;
#[cfg(feature = "http")]
pub mod http;

pub use canonical::{canonicalize, UrlCanonicalizer};
pub use config::{MediaConfig, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{AnimatedImage, AnimationDecoder, FetchTask, ImageTarget, StreamFetcher};
pub use pipeline::loader::{ImagePipeline, PipelineParts};

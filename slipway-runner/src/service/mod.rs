//! Service layer
//!
//! Services do the work of one matrix entry: build and publish an image,
//! extract an asset, upload an asset. The pipeline only sees the traits,
//! so stage ordering can be tested without an engine or a network.

mod assets;
mod images;
mod publish;

// Re-export traits
pub use assets::AssetService;
pub use images::ImageService;

// Re-export implementations
pub use assets::EngineAssetService;
pub use images::EngineImageService;
pub use publish::ReleasePublisher;

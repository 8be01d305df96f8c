pub mod artifact;
pub mod provider;
pub mod utils;

pub use artifact::{Artifact, ArtifactStore};
pub use provider::{HttpBackend, ProviderBackend, ProviderManager};

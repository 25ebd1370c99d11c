// tapkit-common/src/model/mod.rs
pub mod artifact;
pub mod formula;

// Re-export
pub use artifact::InstalledArtifact;
pub use formula::{Formula, InstallStep, Sha256Field, SmokeTest};

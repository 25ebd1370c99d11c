pub mod dependencies;

pub use dependencies::{check_dependencies, DependencyEntry, DependencyReport, DependencyStatus};

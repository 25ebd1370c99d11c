// tapkit-core/src/lib.rs
pub mod check;
pub mod install;
pub mod smoke;
pub mod uninstall;

pub use check::dependencies::{check_dependencies, DependencyReport};
pub use install::receipt::InstallReceipt;
pub use install::{install_formula, InstallOptions, InstallOutcome};
pub use smoke::{run_smoke_test, SmokeTestReport};
pub use uninstall::{uninstall_formula, UninstallReport};

#[cfg(test)]
pub(crate) mod test_support;

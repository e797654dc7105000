//! Terraform state migration for a module rename.
//!
//! # Data Flow
//! ```text
//! terraform plan -no-color (or a saved plan text)
//!     → plan.rs: keep "# <address> will ..." lines under module.<name>
//!     → StateMove { from: address without module.<name>., to: address }
//!     → `terraform state mv [-dry-run] '<from>' '<to>'` lines on stdout
//! ```

pub mod plan;

pub use plan::{
    configured_plan, render_command, scan_plan, terraform_plan, StateMove, UpgradeError,
    DRY_RUN_BANNER,
};

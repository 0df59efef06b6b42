//! Install method detection and executable discovery.
//!
//! - `detect_install_method`: pick an unprivileged install strategy
//! - `find_executable`: PATH lookup through the [`Environment`](crate::env::Environment)
//! - `parse_version`: semver extraction from `--version` output

mod method;
mod parser;
mod path_finder;

pub use method::{classify_prefix, detect_install_method, probe_write_access};
pub use parser::parse_version;
pub(crate) use path_finder::find_executable;

//! skillmap core library: skill corpus loading, intake routing, and link integrity checks
//! used by the CLI.

pub mod config;
pub mod init;
pub mod integrity;
pub mod routing;
pub mod skills;

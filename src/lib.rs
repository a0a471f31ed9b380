//! Editors for the ISC DHCP server's host reservations and interface lists.
//!
//! [`HostStore`] edits `host <name> { ... }` blocks in `dhcpd.conf`;
//! [`InterfaceStore`] edits the `INTERFACESv4` / `INTERFACESv6` lines of the
//! server defaults file. Both keep all other file content untouched.

pub mod config;
pub mod error;
pub mod fsio;
pub mod hosts;
pub mod interfaces;
pub mod watch;

pub use config::Config;
pub use error::{Error, Result};
pub use hosts::{HostPatch, HostRecord, HostStore};
pub use interfaces::{Family, InterfaceSet, InterfaceStore, Interfaces};

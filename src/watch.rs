//! Polls the two backing files and logs a summary whenever either changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use log::{info, warn};
use tokio::time::{sleep, Duration};

use crate::hosts::HostStore;
use crate::interfaces::InterfaceStore;

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Last seen modification time of a file. A missing file is `None`.
#[derive(Debug)]
pub struct FileStamp {
    path: PathBuf,
    last: Option<SystemTime>,
}

impl FileStamp {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last = mtime(&path);
        Self { path, last }
    }

    /// True when the mtime differs from the previous call (or from creation).
    pub fn changed(&mut self) -> bool {
        let current = mtime(&self.path);
        if current != self.last {
            self.last = current;
            return true;
        }
        false
    }
}

pub fn summarize(hosts: &HostStore, interfaces: &InterfaceStore) -> String {
    let host_count = match hosts.try_list() {
        Ok(list) => list.len().to_string(),
        Err(e) => {
            warn!("Failed to read hosts: {}", e);
            "?".to_string()
        }
    };
    let ifaces = match interfaces.read() {
        Ok(ifaces) => format!(
            "v4=[{}] v6=[{}]",
            ifaces.v4.members.join(" "),
            ifaces.v6.members.join(" ")
        ),
        Err(e) => {
            warn!("Failed to read interfaces: {}", e);
            "unreadable".to_string()
        }
    };
    format!("{} hosts, interfaces {}", host_count, ifaces)
}

async fn summarize_blocking(
    hosts: &Arc<HostStore>,
    interfaces: &Arc<InterfaceStore>,
) -> Option<String> {
    let hosts = hosts.clone();
    let interfaces = interfaces.clone();
    match tokio::task::spawn_blocking(move || summarize(&hosts, &interfaces)).await {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!("Failed to summarize config: {}", e);
            None
        }
    }
}

/// Poll forever at `interval`.
pub async fn run(hosts: Arc<HostStore>, interfaces: Arc<InterfaceStore>, interval: Duration) {
    let mut hosts_stamp = FileStamp::new(hosts.path());
    let mut ifaces_stamp = FileStamp::new(interfaces.path());

    info!("Watching {:?} and {:?}", hosts.path(), interfaces.path());
    if let Some(summary) = summarize_blocking(&hosts, &interfaces).await {
        info!("Current config: {}", summary);
    }

    loop {
        sleep(interval).await;

        let mut reload_needed = false;

        if hosts_stamp.changed() {
            info!("DHCP config {:?} changed", hosts.path());
            reload_needed = true;
        }

        if ifaces_stamp.changed() {
            info!("Interfaces config {:?} changed", interfaces.path());
            reload_needed = true;
        }

        if reload_needed {
            if let Some(summary) = summarize_blocking(&hosts, &interfaces).await {
                info!("Now serving {}", summary);
            }
        }
    }
}

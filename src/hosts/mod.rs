//! Host reservation store backed by an ISC-DHCP style configuration file.
//!
//! Every operation re-reads the file, edits the one affected `host` block and
//! writes the whole file back. Text outside that block is preserved as is.

pub mod parser;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fsio;
use parser::Field;

/// One reserved host. Fields missing from the file are empty strings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRecord {
    pub name: String,
    #[serde(default)]
    pub hardware_ethernet: String,
    #[serde(default)]
    pub option_routers: String,
    #[serde(default)]
    pub option_subnet_mask: String,
    #[serde(default)]
    pub fixed_address: String,
    #[serde(default)]
    pub option_domain_name_servers: String,
}

impl HostRecord {
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::HardwareEthernet => &self.hardware_ethernet,
            Field::OptionRouters => &self.option_routers,
            Field::OptionSubnetMask => &self.option_subnet_mask,
            Field::FixedAddress => &self.fixed_address,
            Field::OptionDomainNameServers => &self.option_domain_name_servers,
        }
    }

    pub fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::HardwareEthernet => &mut self.hardware_ethernet,
            Field::OptionRouters => &mut self.option_routers,
            Field::OptionSubnetMask => &mut self.option_subnet_mask,
            Field::FixedAddress => &mut self.fixed_address,
            Field::OptionDomainNameServers => &mut self.option_domain_name_servers,
        }
    }
}

/// Partial update. `None` leaves a field alone; `Some("")` sets it empty.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HostPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_ethernet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_routers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_subnet_mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_domain_name_servers: Option<String>,
}

impl HostPatch {
    fn value(&self, field: Field) -> Option<&String> {
        match field {
            Field::HardwareEthernet => self.hardware_ethernet.as_ref(),
            Field::OptionRouters => self.option_routers.as_ref(),
            Field::OptionSubnetMask => self.option_subnet_mask.as_ref(),
            Field::FixedAddress => self.fixed_address.as_ref(),
            Field::OptionDomainNameServers => self.option_domain_name_servers.as_ref(),
        }
    }

    /// New name, if the patch renames. An empty name keeps the current one.
    pub fn rename(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Overlay every present field onto `record`, including a rename.
    pub fn apply(&self, record: &mut HostRecord) {
        if let Some(name) = self.rename() {
            record.name = name.to_string();
        }
        for field in Field::ALL {
            if let Some(value) = self.value(field) {
                *record.field_mut(field) = value.clone();
            }
        }
    }
}

/// Host names are a single token: no whitespace and none of `{`, `}`, `;`.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = |c: char| c.is_whitespace() || matches!(c, '{' | '}' | ';');
    if name.is_empty() || name.contains(bad) {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

/// All host records in `content`, in file order.
pub fn parse(content: &str) -> Vec<HostRecord> {
    parser::blocks(content).map(|block| block.record()).collect()
}

pub struct HostStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl HostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // A missing file holds no hosts.
    fn load(&self) -> Result<String> {
        Ok(fsio::read_optional(&self.path)?.unwrap_or_default())
    }

    /// List hosts, returning an empty list when the file cannot be read.
    pub fn list(&self) -> Vec<HostRecord> {
        match self.try_list() {
            Ok(hosts) => hosts,
            Err(e) => {
                warn!("Failed to read DHCP config, reporting no hosts: {}", e);
                Vec::new()
            }
        }
    }

    /// List hosts, surfacing read failures.
    pub fn try_list(&self) -> Result<Vec<HostRecord>> {
        let _guard = self.guard();
        let content = self.load()?;
        let hosts = parse(&content);
        debug!("Parsed {} hosts from {:?}", hosts.len(), self.path);
        Ok(hosts)
    }

    pub fn get(&self, name: &str) -> Result<HostRecord> {
        let _guard = self.guard();
        let content = self.load()?;
        parser::find_block(&content, name)
            .map(|block| block.record())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Append a new block at the end of the file.
    pub fn insert(&self, record: &HostRecord) -> Result<()> {
        validate_name(&record.name)?;

        let _guard = self.guard();
        let content = self.load()?;
        if parser::find_block(&content, &record.name).is_some() {
            warn!("Host {} already present, refusing to add", record.name);
            return Err(Error::AlreadyExists(record.name.clone()));
        }

        let updated = parser::append_block(&content, &parser::render_block(record));
        fsio::write_atomic(&self.path, &updated)?;
        info!("Added host {}", record.name);
        Ok(())
    }

    /// Merge `patch` into the first block named `name` and re-render it.
    /// Returns the record as written.
    pub fn update(&self, name: &str, patch: &HostPatch) -> Result<HostRecord> {
        let _guard = self.guard();
        let content = self.load()?;

        let Some(block) = parser::find_block(&content, name) else {
            warn!("Host {} not found for update", name);
            return Err(Error::NotFound(name.to_string()));
        };

        if let Some(new_name) = patch.rename().filter(|n| *n != name) {
            validate_name(new_name)?;
            if parser::find_block(&content, new_name).is_some() {
                return Err(Error::AlreadyExists(new_name.to_string()));
            }
        }

        let mut record = block.record();
        patch.apply(&mut record);

        let updated = parser::splice(&content, block.span, &parser::render_block(&record));
        fsio::write_atomic(&self.path, &updated)?;
        info!("Updated host {}", name);
        Ok(record)
    }

    /// Remove the first block named `name` along with its separating whitespace.
    pub fn delete(&self, name: &str) -> Result<()> {
        let _guard = self.guard();
        let content = self.load()?;

        let Some(block) = parser::find_block(&content, name) else {
            warn!("Host {} not found for deletion", name);
            return Err(Error::NotFound(name.to_string()));
        };

        let range = parser::removal_span(&content, block.span);
        let updated = parser::splice(&content, range, "");
        fsio::write_atomic(&self.path, &updated)?;
        info!("Deleted host {}", name);
        Ok(())
    }
}

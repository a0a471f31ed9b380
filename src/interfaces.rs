//! Interface list store for the `INTERFACESv4` / `INTERFACESv6` assignments
//! of the DHCP server defaults file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fsio;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::V4, Family::V6];

    pub fn as_str(self) -> &'static str {
        match self {
            Family::V4 => "v4",
            Family::V6 => "v6",
        }
    }

    /// Shell variable holding this family's list.
    pub fn variable(self) -> &'static str {
        match self {
            Family::V4 => "INTERFACESv4",
            Family::V6 => "INTERFACESv6",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "v4" => Ok(Family::V4),
            "v6" => Ok(Family::V6),
            _ => Err(Error::InvalidFamily(s.to_string())),
        }
    }
}

/// Ordered interface names for one family, without duplicates.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSet {
    pub family: Family,
    pub members: Vec<String>,
}

impl InterfaceSet {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            members: Vec::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    /// Append `name` unless present. Returns whether the set changed.
    pub fn insert(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.members.push(name.to_string());
        true
    }

    /// Drop the first occurrence of `name`. Returns whether the set changed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.members.iter().position(|m| m == name) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }

    /// The assignment line, without a line terminator.
    pub fn render(&self) -> String {
        format!("{}=\"{}\"", self.family.variable(), self.members.join(" "))
    }
}

/// Both families as read from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interfaces {
    pub v4: InterfaceSet,
    pub v6: InterfaceSet,
}

impl Default for Interfaces {
    fn default() -> Self {
        Self {
            v4: InterfaceSet::new(Family::V4),
            v6: InterfaceSet::new(Family::V6),
        }
    }
}

impl Interfaces {
    pub fn get(&self, family: Family) -> &InterfaceSet {
        match family {
            Family::V4 => &self.v4,
            Family::V6 => &self.v6,
        }
    }

    pub fn get_mut(&mut self, family: Family) -> &mut InterfaceSet {
        match family {
            Family::V4 => &mut self.v4,
            Family::V6 => &mut self.v6,
        }
    }
}

// Value of `INTERFACESvN=...` when `line` is that family's assignment.
fn assignment(line: &str, family: Family) -> Option<&str> {
    line.strip_prefix(family.variable())?.strip_prefix('=')
}

// `"eth0 eth1"  # lan` -> `eth0 eth1`; unquoted values are taken whole.
fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.strip_prefix('"') {
        Some(rest) => rest.find('"').map_or(rest, |end| &rest[..end]),
        None => raw,
    }
}

/// Read both families. The first assignment line of a family wins; a
/// family without one is empty.
pub fn parse(content: &str) -> Interfaces {
    let mut interfaces = Interfaces::default();
    for family in Family::ALL {
        let value = content
            .lines()
            .find_map(|line| assignment(line, family))
            .map(unquote)
            .unwrap_or_default();

        let set = interfaces.get_mut(family);
        for name in value.split_whitespace() {
            set.insert(name);
        }
    }
    interfaces
}

fn split_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Replace the assignment line(s) of `set.family`, keeping every other line
/// and every line terminator as is. Appends the line when the file has none.
pub fn rewrite(content: &str, set: &InterfaceSet) -> String {
    let rendered = set.render();
    let mut out = String::with_capacity(content.len() + rendered.len() + 1);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        let (body, ending) = split_ending(line);
        if assignment(body, set.family).is_some() {
            out.push_str(&rendered);
            out.push_str(ending);
            replaced = true;
        } else {
            out.push_str(line);
        }
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&rendered);
        out.push('\n');
    }
    out
}

fn validate_interface(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '"') {
        return Err(Error::InvalidInterface(name.to_string()));
    }
    Ok(())
}

pub struct InterfaceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl InterfaceStore {
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

    /// Current lists. A missing file reads as two empty lists.
    pub fn read(&self) -> Result<Interfaces> {
        let _guard = self.guard();
        match fsio::read_optional(&self.path)? {
            Some(content) => Ok(parse(&content)),
            None => {
                debug!("Interfaces config {:?} not found, returning empty config", self.path);
                Ok(Interfaces::default())
            }
        }
    }

    /// Add `name` to `family`. Returns whether the file changed.
    pub fn add(&self, family: Family, name: &str) -> Result<bool> {
        validate_interface(name)?;
        self.modify(family, name, |set| set.insert(name))
    }

    /// Remove `name` from `family`. Returns whether the file changed.
    pub fn remove(&self, family: Family, name: &str) -> Result<bool> {
        self.modify(family, name, |set| set.remove(name))
    }

    fn modify(
        &self,
        family: Family,
        name: &str,
        change: impl FnOnce(&mut InterfaceSet) -> bool,
    ) -> Result<bool> {
        let _guard = self.guard();
        let content = fsio::read(&self.path)?;

        let mut set = parse(&content).get(family).clone();
        if !change(&mut set) {
            debug!("INTERFACES{} already up to date for {}", family, name);
            return Ok(false);
        }

        fsio::write_atomic(&self.path, &rewrite(&content, &set))?;
        info!("INTERFACES{} is now \"{}\"", family, set.members.join(" "));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const DEFAULTS: &str = "\
# Defaults for isc-dhcp-server (sourced by /etc/init.d/isc-dhcp-server)

#DHCPDv4_CONF=/etc/dhcp/dhcpd.conf
INTERFACESv4=\"eth0\"
INTERFACESv6=\"\"
";

    fn store_with(content: &str) -> (TempDir, InterfaceStore) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("isc-dhcp-server");
        fs::write(&path, content).unwrap();
        (dir, InterfaceStore::new(path))
    }

    fn names(set: &InterfaceSet) -> Vec<&str> {
        set.members.iter().map(String::as_str).collect()
    }

    #[test]
    fn family_from_str() {
        assert_eq!("v4".parse::<Family>().unwrap(), Family::V4);
        assert_eq!("V6".parse::<Family>().unwrap(), Family::V6);
        assert!(matches!("v5".parse::<Family>(), Err(Error::InvalidFamily(_))));
    }

    #[test]
    fn empty_value_is_empty_list() {
        let parsed = parse(DEFAULTS);
        assert_eq!(names(&parsed.v4), vec!["eth0"]);
        assert!(parsed.v6.members.is_empty());
    }

    #[test]
    fn missing_line_is_empty_list() {
        let parsed = parse("# nothing here\nOPTIONS=\"\"\n");
        assert!(parsed.v4.members.is_empty());
        assert!(parsed.v6.members.is_empty());
    }

    #[test]
    fn parse_keeps_order_and_drops_duplicates() {
        let parsed = parse("INTERFACESv4=\"eth2  eth0 eth2\teth1\"  # lan\r\n");
        assert_eq!(names(&parsed.v4), vec!["eth2", "eth0", "eth1"]);
    }

    #[test]
    fn commented_assignment_is_ignored() {
        let parsed = parse("#INTERFACESv4=\"old0\"\nINTERFACESv4=eth3\n");
        assert_eq!(names(&parsed.v4), vec!["eth3"]);
    }

    #[test]
    fn add_appends_and_is_idempotent() {
        let (_dir, store) = store_with(DEFAULTS);

        assert!(store.add(Family::V4, "eth1").unwrap());
        let once = fs::read_to_string(store.path()).unwrap();
        assert_eq!(once, DEFAULTS.replace("INTERFACESv4=\"eth0\"", "INTERFACESv4=\"eth0 eth1\""));

        assert!(!store.add(Family::V4, "eth0").unwrap());
        assert!(!store.add(Family::V4, "eth1").unwrap());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), once);
    }

    #[test]
    fn remove_is_idempotent() {
        let (_dir, store) = store_with("INTERFACESv4=\"eth0 eth1\"\nINTERFACESv6=\"eth0\"\n");

        assert!(store.remove(Family::V4, "eth0").unwrap());
        assert!(!store.remove(Family::V4, "eth0").unwrap());

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "INTERFACESv4=\"eth1\"\nINTERFACESv6=\"eth0\"\n"
        );
    }

    #[test]
    fn only_target_family_line_changes() {
        let content = "INTERFACESv4=\"eth0\"\r\nINTERFACESv6=\"  eth0 \" # keep me\r\nOTHER=1";
        let (_dir, store) = store_with(content);

        store.add(Family::V4, "br0").unwrap();

        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "INTERFACESv4=\"eth0 br0\"\r\nINTERFACESv6=\"  eth0 \" # keep me\r\nOTHER=1"
        );
    }

    #[test]
    fn add_appends_missing_assignment() {
        let (_dir, store) = store_with("INTERFACESv4=\"eth0\"");
        store.add(Family::V6, "eth0").unwrap();
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "INTERFACESv4=\"eth0\"\nINTERFACESv6=\"eth0\"\n"
        );
    }

    #[test]
    fn missing_file() {
        let dir = tempdir().unwrap();
        let store = InterfaceStore::new(dir.path().join("absent"));

        assert_eq!(store.read().unwrap(), Interfaces::default());
        assert!(store.add(Family::V4, "eth0").unwrap_err().is_io());
        assert!(store.remove(Family::V4, "eth0").unwrap_err().is_io());
    }

    #[test]
    fn add_rejects_bad_names() {
        let (_dir, store) = store_with(DEFAULTS);
        for name in ["", "eth0 eth1", "eth\"0"] {
            assert!(matches!(
                store.add(Family::V4, name),
                Err(Error::InvalidInterface(_))
            ));
        }
        assert_eq!(fs::read_to_string(store.path()).unwrap(), DEFAULTS);
    }
}

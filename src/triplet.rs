//! GNU target triplets and their Conan `arch`/`os` counterparts
//!
//! A GNU triplet is `machine(-vendor)?(-os)?(-abi)?`, e.g. `x86_64-pc-linux-gnu`
//! or `arm-none-eabi`. [`ArchOs`] is the Conan settings view of the same
//! platform. Conversion goes both ways; parsing a triplet produced from an
//! `ArchOs` gives back the same triplet.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Key in [`ArchOs::extra`] holding the Android API level
pub const ANDROID_API_LEVEL: &str = "os.api_level";

/// Substrings that identify the last triplet component as an ABI
const KNOWN_GNU_ABIS: [&str; 4] = ["android", "gnu", "eabi", "elf"];

/// Operating-system components that stand for "no OS"
const UNKNOWN_OS_ALIASES: [&str; 2] = ["unknown", "none"];

/// Operating-system components produced by [`GnuTriplet::from_arch_os`]
const GNU_OSES: [&str; 5] = ["none", "linux", "freebsd", "darwin", "mingw32"];

static TRAILING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)$").expect("valid regex"));

/// A Conan architecture/OS pair, plus sub-settings such as the API level
///
/// Equality compares the values in `extra` as well as the keys, so
/// `arch=armv8 os=Android os.api_level=29` differs from the same pair at
/// level 25.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchOs {
    /// Conan `arch` setting (e.g. `x86_64`, `armv7hf`)
    pub arch: String,
    /// Conan `os` setting (e.g. `Linux`, `baremetal`)
    pub os: String,
    /// Sub-settings keyed by their dotted name
    pub extra: BTreeMap<String, String>,
}

impl ArchOs {
    /// Pair without sub-settings
    pub fn new(arch: impl Into<String>, os: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            os: os.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Add a sub-setting
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Conan architectures a triplet's machine may stand for, most likely first
    pub fn calculate_archs(triplet: &GnuTriplet) -> Result<Vec<String>> {
        let archs: &[&str] = match triplet.machine.as_str() {
            "arm" => {
                let hf = triplet.abi.as_deref().is_some_and(|abi| abi.contains("hf"));
                return Ok(vec![if hf { "armv7hf" } else { "armv7" }.to_string()]);
            }
            "aarch64" => &["armv8", "armv9"],
            "i386" | "i486" | "i586" | "i686" => &["x86"],
            "x86_64" => &["x86_64"],
            "riscv32" => &["riscv32"],
            "riscv64" => &["riscv64"],
            other => {
                return Err(Error::Triplet(format!("unsupported GNU machine '{other}'")));
            }
        };
        Ok(archs.iter().map(|a| (*a).to_string()).collect())
    }

    /// Conan OS for a triplet
    pub fn calculate_os(triplet: &GnuTriplet) -> Result<String> {
        if triplet.abi.as_deref().is_some_and(|abi| abi.contains("android")) {
            return Ok("Android".to_string());
        }
        let os = match triplet.os.as_deref() {
            None | Some("none" | "unknown") => "baremetal",
            Some("android") => "Android",
            Some("mingw32") => "Windows",
            Some("linux") => "Linux",
            Some("freebsd") => "FreeBSD",
            Some("darwin") => "Macos",
            Some(other) => {
                return Err(Error::Triplet(format!("unsupported GNU os '{other}'")));
            }
        };
        Ok(os.to_string())
    }

    /// Conan view of a triplet; picks the first candidate architecture
    pub fn from_triplet(triplet: &GnuTriplet) -> Result<Self> {
        let archs = Self::calculate_archs(triplet)?;
        let os = Self::calculate_os(triplet)?;
        let mut archos = Self::new(archs[0].clone(), os);

        if archos.os == "Android" {
            if let Some(level) = triplet
                .abi
                .as_deref()
                .and_then(|abi| TRAILING_DIGITS.captures(abi))
            {
                archos
                    .extra
                    .insert(ANDROID_API_LEVEL.to_string(), level[1].to_string());
            }
        }
        Ok(archos)
    }

    /// Whether a triplet describes this platform
    pub fn is_compatible(&self, triplet: &GnuTriplet) -> bool {
        let arch_ok = Self::calculate_archs(triplet).is_ok_and(|archs| archs.contains(&self.arch));
        arch_ok && Self::calculate_os(triplet).is_ok_and(|os| os == self.os)
    }
}

impl fmt::Display for ArchOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arch={} os={}", self.arch, self.os)?;
        for (key, value) in &self.extra {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// A GNU triplet split into its components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnuTriplet {
    /// CPU (e.g. `x86_64`, `arm`)
    pub machine: String,
    /// Vendor (e.g. `pc`, `w64`, `apple`)
    pub vendor: Option<String>,
    /// Operating system (e.g. `linux`, `mingw32`)
    pub os: Option<String>,
    /// ABI / environment (e.g. `gnu`, `eabihf`, `android21`)
    pub abi: Option<String>,
}

impl GnuTriplet {
    /// Build from components
    pub fn new(
        machine: impl Into<String>,
        vendor: Option<&str>,
        os: Option<&str>,
        abi: Option<&str>,
    ) -> Self {
        Self {
            machine: machine.into(),
            vendor: vendor.map(String::from),
            os: os.map(String::from),
            abi: abi.map(String::from),
        }
    }

    /// Dash-joined triplet text, omitting absent components
    pub fn triplet(&self) -> String {
        std::iter::once(Some(self.machine.as_str()))
            .chain([self.vendor.as_deref(), self.os.as_deref(), self.abi.as_deref()])
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Triplet for a Conan architecture/OS pair
    pub fn from_arch_os(archos: &ArchOs) -> Result<Self> {
        Ok(Self {
            machine: Self::calculate_gnu_machine(archos)?.to_string(),
            vendor: Self::calculate_gnu_vendor(archos).map(String::from),
            os: Self::calculate_gnu_os(archos)?.map(String::from),
            abi: Self::calculate_gnu_abi(archos),
        })
    }

    fn calculate_gnu_machine(archos: &ArchOs) -> Result<&'static str> {
        Ok(match archos.arch.as_str() {
            "x86" => "i686",
            "x86_64" => "x86_64",
            "armv7" | "armv7hf" => "arm",
            "armv8" => "aarch64",
            "riscv32" => "riscv32",
            "riscv64" => "riscv64",
            other => {
                return Err(Error::Triplet(format!("unsupported arch '{other}'")));
            }
        })
    }

    fn calculate_gnu_vendor(archos: &ArchOs) -> Option<&'static str> {
        match archos.os.as_str() {
            "baremetal" | "Android" => None,
            "Macos" | "iOS" | "tvOS" | "watchOS" => Some("apple"),
            "Windows" => Some("w64"),
            _ => Some("pc"),
        }
    }

    fn calculate_gnu_os(archos: &ArchOs) -> Result<Option<&'static str>> {
        if archos.os == "baremetal" {
            match archos.arch.as_str() {
                "x86" | "x86_64" => return Ok(None),
                "riscv32" | "riscv64" => return Ok(Some("unknown")),
                _ => {}
            }
        }
        Ok(Some(match archos.os.as_str() {
            "baremetal" => "none",
            "Android" | "Linux" => "linux",
            "FreeBSD" => "freebsd",
            "Macos" => "darwin",
            "Windows" => "mingw32",
            other => {
                return Err(Error::Triplet(format!("unsupported os '{other}'")));
            }
        }))
    }

    fn calculate_gnu_abi(archos: &ArchOs) -> Option<String> {
        let start = match archos.os.as_str() {
            "baremetal" => {
                let abi = if archos.arch == "armv7" { "eabi" } else { "elf" };
                return Some(abi.to_string());
            }
            "Linux" => "gnu",
            "Android" => "android",
            _ => return None,
        };
        let mut abi = String::from(start);
        match archos.arch.as_str() {
            "armv7" => abi.push_str("eabi"),
            "armv7hf" => abi.push_str("eabihf"),
            _ => {}
        }
        if archos.os == "Android" {
            if let Some(level) = archos.extra.get(ANDROID_API_LEVEL) {
                abi.push_str(level);
            }
        }
        Some(abi)
    }
}

impl FromStr for GnuTriplet {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('-').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(Error::Triplet(format!(
                "wrong number of GNU triplet components in '{text}': count must lie in \
                 range [2, 4], format is $machine(-$vendor)?(-$os)?(-$abi)?"
            )));
        }

        let machine = parts[0];
        let mut rest = &parts[1..];
        let mut abi = None;
        if let Some(last) = rest.last() {
            if KNOWN_GNU_ABIS.iter().any(|known| last.contains(known)) {
                abi = Some(*last);
                rest = &rest[..rest.len() - 1];
            }
        }

        let (vendor, os) = match rest {
            [] => (None, None),
            [single] if UNKNOWN_OS_ALIASES.contains(single) || GNU_OSES.contains(single) => {
                (None, Some(*single))
            }
            [single] => (Some(*single), None),
            [vendor, os] => (Some(*vendor), Some(*os)),
            _ => {
                return Err(Error::Triplet(format!(
                    "unrecognized ABI '{}' in '{text}'",
                    parts[parts.len() - 1]
                )));
            }
        };

        Ok(Self::new(machine, vendor, os, abi))
    }
}

impl fmt::Display for GnuTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triplet())
    }
}

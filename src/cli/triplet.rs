//! triplet sub-commands

use crate::cli::style::{Stylize, check, cross};
use anstream::println;
use cci_tasks::error::Result;
use cci_tasks::triplet::{ANDROID_API_LEVEL, ArchOs, GnuTriplet};

/// Show the components of a triplet and its Conan settings
pub fn run_parse(text: &str) -> Result<()> {
    let triplet: GnuTriplet = text.parse()?;
    let none = || "-".to_string();

    println!("{}", triplet.to_string().emphasis());
    println!("  machine: {}", triplet.machine.accent());
    println!("  vendor:  {}", triplet.vendor.clone().unwrap_or_else(none));
    println!("  os:      {}", triplet.os.clone().unwrap_or_else(none));
    println!("  abi:     {}", triplet.abi.clone().unwrap_or_else(none));

    let archos = ArchOs::from_triplet(&triplet)?;
    let archs = ArchOs::calculate_archs(&triplet)?;
    println!("{}", "Conan settings".emphasis());
    println!("  arch: {} (candidates: {})", archos.arch.accent(), archs.join(", "));
    println!("  os:   {}", archos.os.accent());
    for (key, value) in &archos.extra {
        println!("  {key}: {value}");
    }
    Ok(())
}

/// Print the triplet for Conan settings
pub fn run_from_settings(arch: &str, os: &str, api_level: Option<u32>) -> Result<()> {
    let archos = settings(arch, os, api_level);
    let triplet = GnuTriplet::from_arch_os(&archos)?;
    println!("{triplet}");
    Ok(())
}

/// Check a triplet against Conan settings; returns whether they match
pub fn run_check(arch: &str, os: &str, text: &str) -> Result<bool> {
    let archos = settings(arch, os, None);
    let triplet: GnuTriplet = text.parse()?;
    let compatible = archos.is_compatible(&triplet);
    if compatible {
        println!("{} {} is compatible with {archos}", check(), triplet.to_string().accent());
    } else {
        println!(
            "{} {} is not compatible with {archos}",
            cross(),
            triplet.to_string().warn()
        );
    }
    Ok(compatible)
}

fn settings(arch: &str, os: &str, api_level: Option<u32>) -> ArchOs {
    let archos = ArchOs::new(arch, os);
    match api_level {
        Some(level) => archos.with_extra(ANDROID_API_LEVEL, level.to_string()),
        None => archos,
    }
}

//! List hosts and their product versions.
//!
//! Run with: cargo run --example list_hosts -- <host> <user> <password> [esxi_name]
//!
//! Requires: a reachable vCenter or ESXi SDK endpoint

use std::env;
use vsphere::{ConnectionConfig, Credentials, Result, VSphere};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 4 {
        print_usage();
        return Ok(());
    }

    let config = ConnectionConfig::new(&args[1]);
    let credentials = Credentials::new(&args[2], &args[3]);

    println!("Connecting to {}...", args[1]);
    let vsphere = VSphere::connect(config, &credentials)?;
    println!(
        "Connected to {}",
        vsphere.api().service_content().about.full_name
    );

    match args.get(4) {
        Some(name) => {
            let host = vsphere.find_host(name)?;
            println!("{}: {}", host.name, vsphere.host_version(&host)?);
        }
        None => {
            let hosts = vsphere.hosts()?;
            println!("Found {} host(s):", hosts.len());
            for host in &hosts {
                println!("  {} ({}): {}", host.name, host.moref, vsphere.host_version(host)?);
            }
        }
    }

    Ok(())
}

fn print_usage() {
    println!("Usage: list_hosts <host> <user> <password> [esxi_name]");
}

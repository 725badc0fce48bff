// SPDX-License-Identifier: MPL-2.0

//! Demo program: log in and list every device of the account.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example list_devices -- <username> <password>
//! ```

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <username> <password>", args[0]);
        std::process::exit(1);
    }

    println!("Logging in as {}...", args[1]);
    let client = myq_lib::login(&args[1], &args[2]).await?;
    println!("Account: {}", client.account_id()?);

    let covers = client.covers();
    for (serial, device) in client.devices() {
        let kind = if covers.contains_key(&serial) {
            "cover"
        } else {
            "hub"
        };
        println!(
            "{serial} [{kind}] {} family={} state={:?} online={}",
            device.name().unwrap_or_default(),
            device.device_family().unwrap_or_default(),
            device.door_state(),
            device.online()
        );
    }

    Ok(())
}

//! Persisted greeting: the name survives restarts when file storage is used.
//!
//! ```text
//! STOWAGE_STORAGE=file cargo run --example greeting -- Kent
//! STOWAGE_STORAGE=file cargo run --example greeting
//! ```

use stowage::codec::RawStringCodec;
use stowage::{PersistedState, StorageConfig};
use tracing_subscriber::EnvFilter;

fn greeting(name: &str) -> String {
    if name.is_empty() {
        "Please type your name".to_string()
    } else {
        format!("Hello {name}")
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let storage = StorageConfig::from_env()?.open()?;

    // Stored verbatim, the way a browser would keep a plain string.
    let name = PersistedState::<String>::with_codec("name", RawStringCodec)
        .default_value("Andy".to_string())
        .build(storage)?;
    println!("{}", greeting(&name.get()));

    if let Some(typed) = std::env::args().nth(1) {
        name.set(typed);
        if let Some(err) = name.take_error() {
            return Err(err.into());
        }
        println!("{}", greeting(&name.get()));
    }

    Ok(())
}

//! Resource loading with an error boundary.
//!
//! Each argument is submitted in turn; an unknown name shows the fallback and
//! resets the boundary.
//!
//! ```text
//! cargo run --example resource_info -- pikachu mew charizard
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stowage::resource::{ErrorBoundary, ResourceLoader, StaticFetcher, View};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Pokemon {
    name: String,
    number: u32,
    kind: String,
}

fn pokemon(name: &str, number: u32, kind: &str) -> Pokemon {
    Pokemon {
        name: name.to_string(),
        number,
        kind: kind.to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let fetcher = StaticFetcher::new()
        .with_entry("pikachu", pokemon("pikachu", 25, "electric"))
        .with_entry("charizard", pokemon("charizard", 6, "fire"))
        .with_entry("bulbasaur", pokemon("bulbasaur", 1, "grass"))
        .with_latency(Duration::from_millis(300));

    let loader = ResourceLoader::new(fetcher);
    let boundary = ErrorBoundary::new(loader.clone()).on_reset({
        let loader = loader.clone();
        move || {
            loader.submit("");
        }
    });

    let render = |boundary: &ErrorBoundary<StaticFetcher<Pokemon>>| {
        boundary.render(
            |view| match view {
                View::NoIdentifier => "Submit a pokemon".to_string(),
                View::Loading { identifier } => format!("Loading {identifier}..."),
                View::Ready { data, .. } => serde_json::to_string_pretty(data).unwrap_or_default(),
            },
            |error| format!("There was an error: {error}\n[Try again]"),
        )
    };

    println!("{}", render(&boundary)?);
    for name in std::env::args().skip(1) {
        let handle = loader.submit(name);
        println!("{}", render(&boundary)?);
        if let Some(handle) = handle {
            handle.await?;
        }
        println!("{}", render(&boundary)?);

        if boundary.has_error() {
            boundary.reset();
            println!("{}", render(&boundary)?);
        }
    }

    Ok(())
}

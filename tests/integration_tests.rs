//! Integration tests for Stowage

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use stowage::codec::{FnCodec, RawStringCodec};
use stowage::persisted::{create_persisted_state, DefaultValue, PersistedState};
use stowage::resource::{ErrorBoundary, ResourceFetcher, ResourceLoader, ResourceState, StaticFetcher, Status};
use stowage::runtime::ReactiveRuntime;
use stowage::storage::{JsonFileStorage, KeyValueStore, MemoryStorage};
use stowage::{CodecError, FetchError, PersistError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Pokemon {
    name: String,
    number: u32,
}

fn pokemon(name: &str, number: u32) -> Pokemon {
    Pokemon {
        name: name.to_string(),
        number,
    }
}

#[test]
fn values_round_trip_through_storage() {
    ReactiveRuntime::scope(|| {
        let storage = MemoryStorage::new();

        let profile = create_persisted_state(storage.clone(), "profile", pokemon("pikachu", 25)).unwrap();
        profile.set(pokemon("charizard", 6));
        drop(profile);
        let restored = create_persisted_state(storage.clone(), "profile", pokemon("x", 0)).unwrap();
        assert_eq!(restored.get(), pokemon("charizard", 6));

        let name = PersistedState::<String>::with_codec("name", RawStringCodec)
            .build(storage.clone())
            .unwrap();
        name.set("Andy".into());
        assert_eq!(storage.get("name").unwrap().as_deref(), Some("Andy"));
        drop(name);
        let restored = PersistedState::<String>::with_codec("name", RawStringCodec)
            .build(storage.clone())
            .unwrap();
        assert_eq!(restored.get(), "Andy");

        let hex = || {
            FnCodec::new(
                |n: &u64| Ok(format!("{n:x}")),
                |raw: &str| u64::from_str_radix(raw, 16).map_err(|e| CodecError::Deserialize(e.to_string())),
            )
        };
        let counter = PersistedState::<u64>::with_codec("counter", hex()).build(storage.clone()).unwrap();
        counter.set(255);
        assert_eq!(storage.get("counter").unwrap().as_deref(), Some("ff"));
        drop(counter);
        let restored = PersistedState::<u64>::with_codec("counter", hex()).build(storage).unwrap();
        assert_eq!(restored.get(), 255);
    });
}

#[test]
fn renaming_key_migrates_entry() {
    ReactiveRuntime::scope(|| {
        let storage = MemoryStorage::new();
        let name = create_persisted_state(storage.clone(), "name", "Andy".to_string()).unwrap();
        name.set("Kent".into());
        assert!(storage.contains_key("name"));

        name.set_key("username").unwrap();

        assert_eq!(storage.get("name").unwrap(), None);
        assert_eq!(storage.get("username").unwrap().as_deref(), Some("\"Kent\""));
        assert_eq!(storage.keys(), vec!["username".to_string()]);
        assert_eq!(name.key(), "username");
        assert_eq!(name.get(), "Kent");

        // Renaming again keeps following the value.
        name.set_key("user").unwrap();
        assert_eq!(storage.keys(), vec!["user".to_string()]);
    });
}

#[test]
fn renaming_before_any_write_leaves_no_old_entry() {
    ReactiveRuntime::scope(|| {
        let storage = MemoryStorage::new();
        storage.set("old", "\"stored\"").unwrap();
        let state = create_persisted_state(storage.clone(), "old", String::new()).unwrap();

        state.set_key("new").unwrap();
        assert!(!storage.contains_key("old"));
        assert_eq!(storage.get("new").unwrap().as_deref(), Some("\"stored\""));
    });
}

#[test]
fn lazy_default_runs_at_most_once() {
    ReactiveRuntime::scope(|| {
        let calls = Arc::new(AtomicUsize::new(0));
        let state = PersistedState::<String>::builder("name")
            .default_with({
                let calls = calls.clone();
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    "expensive".to_string()
                }
            })
            .build(MemoryStorage::new())
            .unwrap();

        for _ in 0..5 {
            assert_eq!(state.get(), "expensive");
        }
        let (value, _set_value) = state.split();
        assert_eq!(value.get(), "expensive");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn lazy_default_is_skipped_when_entry_exists() {
    ReactiveRuntime::scope(|| {
        let storage = MemoryStorage::new();
        storage.set("name", "\"stored\"").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let state = PersistedState::<String>::builder("name")
            .default_value(DefaultValue::lazy({
                let calls = calls.clone();
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    String::new()
                }
            }))
            .build(storage)
            .unwrap();

        assert_eq!(state.get(), "stored");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    });
}

#[test]
fn static_default_is_used_verbatim() {
    ReactiveRuntime::scope(|| {
        let storage = MemoryStorage::new();
        let state = create_persisted_state(storage.clone(), "pokemon", pokemon("bulbasaur", 1)).unwrap();
        assert_eq!(state.get(), pokemon("bulbasaur", 1));
        assert!(storage.is_empty());
    });
}

#[test]
fn corrupt_entry_is_an_error_not_a_default() {
    ReactiveRuntime::scope(|| {
        let storage = MemoryStorage::new();
        storage.set("pokemon", "{broken").unwrap();

        let err = create_persisted_state(storage.clone(), "pokemon", pokemon("bulbasaur", 1)).unwrap_err();
        match err {
            PersistError::Decode { key, .. } => assert_eq!(key, "pokemon"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(storage.get("pokemon").unwrap().as_deref(), Some("{broken"));
    });
}

#[test]
fn setter_half_writes_through() {
    ReactiveRuntime::scope(|| {
        let storage = MemoryStorage::new();
        let state = create_persisted_state(storage.clone(), "count", 0_u32).unwrap();
        let (count, set_count) = state.split();

        set_count.update(|n| *n += 3);
        assert_eq!(count.get(), 3);
        assert_eq!(storage.get("count").unwrap().as_deref(), Some("3"));
    });
}

#[test]
fn values_survive_a_new_session() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");

    ReactiveRuntime::scope(|| -> Result<(), anyhow::Error> {
        let storage = JsonFileStorage::open(&path)?;
        let name = create_persisted_state(storage, "name", String::new())?;
        name.set("Andy".into());
        Ok(())
    })?;

    ReactiveRuntime::scope(|| -> Result<(), anyhow::Error> {
        let storage = JsonFileStorage::open(&path)?;
        let name = create_persisted_state(storage, "name", String::from("default"))?;
        assert_eq!(name.get(), "Andy");
        Ok(())
    })
}

fn pokedex() -> StaticFetcher<Pokemon> {
    StaticFetcher::new()
        .with_entry("pikachu", pokemon("pikachu", 25))
        .with_entry("charizard", pokemon("charizard", 6))
        .with_latency(Duration::from_millis(200))
}

#[tokio::test(start_paused = true)]
async fn loader_resolves_submitted_identifier() {
    let loader = ResourceLoader::new(pokedex());
    assert_eq!(loader.state(), ResourceState::Idle);

    let handle = loader.submit("pikachu").unwrap();
    assert_eq!(
        loader.state(),
        ResourceState::Pending {
            identifier: "pikachu".into()
        }
    );
    handle.await.unwrap();
    assert_eq!(loader.state().data(), Some(&pokemon("pikachu", 25)));

    assert!(loader.submit("").is_none());
    assert_eq!(loader.state().status(), Status::Idle);
    assert_eq!(loader.state().to_string(), "no identifier");
}

#[tokio::test(start_paused = true)]
async fn slow_stale_response_is_discarded() {
    let fetcher = pokedex().with_latency_for("pikachu", Duration::from_secs(5));
    let loader = ResourceLoader::new(fetcher);

    let first = loader.submit("pikachu").unwrap();
    let second = loader.submit("charizard").unwrap();
    second.await.unwrap();
    assert_eq!(loader.state().data(), Some(&pokemon("charizard", 6)));

    first.await.unwrap();
    assert_eq!(loader.state().data(), Some(&pokemon("charizard", 6)));
    assert_eq!(loader.state().identifier(), Some("charizard"));
}

#[tokio::test(start_paused = true)]
async fn fast_stale_response_does_not_resolve_newer_request() {
    let fetcher = pokedex().with_latency_for("charizard", Duration::from_secs(5));
    let loader = ResourceLoader::new(fetcher);

    let first = loader.submit("pikachu").unwrap();
    let second = loader.submit("charizard").unwrap();
    first.await.unwrap();
    assert_eq!(
        loader.state(),
        ResourceState::Pending {
            identifier: "charizard".into()
        }
    );

    second.await.unwrap();
    assert_eq!(loader.state().data(), Some(&pokemon("charizard", 6)));
}

struct MissingFetcher;

#[async_trait]
impl ResourceFetcher for MissingFetcher {
    type Data = Pokemon;

    async fn fetch(&self, _identifier: &str) -> Result<Pokemon, FetchError> {
        Err(FetchError::new("not found"))
    }
}

#[tokio::test]
async fn rejection_reaches_boundary_and_reset_goes_idle() {
    let loader = ResourceLoader::new(MissingFetcher);
    let boundary = ErrorBoundary::new(loader.clone()).on_reset({
        let loader = loader.clone();
        move || {
            loader.submit("");
        }
    });

    loader.submit("missingno").unwrap().await.unwrap();
    assert_eq!(loader.state().status(), Status::Rejected);
    assert_eq!(boundary.error().map(|e| e.message), Some("not found".to_string()));

    let fallback = boundary
        .render(|_| String::from("content"), |error| error.to_string())
        .unwrap();
    assert_eq!(fallback, "not found");

    assert!(boundary.reset().is_none());
    assert_eq!(loader.state(), ResourceState::Idle);
    assert!(boundary.error().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_rejection_notice_does_not_outlive_newer_result() {
    let fetcher = StaticFetcher::new()
        .with_entry("charizard", pokemon("charizard", 6))
        .with_latency_for("charizard", Duration::from_millis(50));
    let loader = ResourceLoader::new(fetcher);

    // A slow listener registered ahead of the boundary holds up delivery of
    // the rejection while a newer request runs to completion.
    let rejecting = Arc::new(AtomicBool::new(false));
    loader.subscribe({
        let rejecting = rejecting.clone();
        move |state: &ResourceState<Pokemon>| {
            if state.status() == Status::Rejected {
                rejecting.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(300));
            }
        }
    });
    let boundary = ErrorBoundary::new(loader.clone());

    let first = loader.submit("pikachu").unwrap();
    while !rejecting.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let second = loader.submit("charizard").unwrap();
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(loader.state().data(), Some(&pokemon("charizard", 6)));
    assert!(boundary.error().is_none());
    let rendered = boundary
        .render(
            |view| format!("{view:?}"),
            |error| format!("fallback: {error}"),
        )
        .unwrap();
    assert!(rendered.starts_with("Ready"));
}

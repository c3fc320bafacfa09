use crate::srs::CardState;
use crate::store::{decode_count, keys, operations::cards::Card};
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_card_schedule_indexes", m002_card_schedule_indexes),
    ]
}

/// Applies every pending migration in order.
///
/// Migrations must be idempotent: the process can stop after a migration ran
/// but before its version was recorded, and it will run again on restart.
/// The version is persisted after each step and never moves backwards.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    let all = migrations();

    for (index, (name, func)) in all.iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    Ok(store
        .config_versions
        .get(VERSION_KEY.as_bytes())?
        .map(|raw| decode_count(&raw))
        .unwrap_or(0))
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .config_versions
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// Rebuilds the scheduling indexes from the card rows. Safe to re-run: every
/// key is derived from the card itself.
fn m002_card_schedule_indexes(store: &Store) -> Result<(), StoreError> {
    for item in store.cards.iter() {
        let (_, value) = item?;
        let card: Card = Store::deserialize(&value)?;

        store
            .cards_by_topic
            .insert(keys::cards_by_topic_key(&card.topic_id, &card.id).as_bytes(), &[])?;
        let (tree, ts) = match card.state {
            CardState::New => (&store.new_card_index, card.created_at),
            CardState::Learning | CardState::Review => (&store.card_due_index, card.next_review),
        };
        let index_key = keys::card_time_index_key(&card.subject_id, ts.timestamp_millis(), &card.id);
        tree.insert(index_key.as_bytes(), &[])?;
    }

    Ok(())
}

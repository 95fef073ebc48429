// SPDX-License-Identifier: GPL-3.0-or-later

//! Application services: scoring, search key derivation, tag extraction, and
//! the reconciliation passes that tie providers and persistence together.

pub mod embedded_tags;
pub mod events;
pub mod reconcile;
pub mod scoring;
pub mod search_keys;

pub use embedded_tags::{extract_tags, ExtractedTags, TagError};
pub use events::{EventPublisher, InMemoryEventBus};
pub use reconcile::{PassOutcome, ProviderPolicy, ReconciliationService};
pub use search_keys::SearchKeyExtractor;

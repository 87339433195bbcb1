//! Test support for intraflow pipelines.
//!
//! This module provides:
//! - Price bar, record and request fixtures
//! - Mock capability handlers
//! - Assertions over records and contexts

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_entry_failure, assert_entry_success, assert_record_keys, assert_slots_written,
};
pub use fixtures::{
    aapl_surge_request, bar_at, economic_request, faulty_registry, flat_bars, news_entry,
    news_request, price_series_entry, prices_request,
};
pub use mocks::{ErrorShapedHandler, FailingHandler, PanickingHandler, RecordingHandler};

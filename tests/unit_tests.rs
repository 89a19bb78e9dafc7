//! Component-level tests for public modules.

mod unit;

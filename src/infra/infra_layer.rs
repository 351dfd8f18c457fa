// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "leveling/mod.rs"]
pub mod leveling;

#[path = "weather/mod.rs"]
pub mod weather;

#[path = "imagegen/mod.rs"]
pub mod imagegen;

// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "leveling/mod.rs"]
pub mod leveling;

#[path = "pagination/mod.rs"]
pub mod pagination;

#[path = "weather/mod.rs"]
pub mod weather;

#[path = "imagegen/mod.rs"]
pub mod imagegen;

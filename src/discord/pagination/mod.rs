pub mod menu;

pub use menu::{paginate, MENU_TIMEOUT};

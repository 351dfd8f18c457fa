// Page bookkeeping shared by every multi-page menu.

pub mod page_navigator;

pub use page_navigator::{select_window, PageNavigator, SELECT_MENU_LIMIT};

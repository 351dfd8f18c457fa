use std::ops::Range;

/// Most options a single select menu may carry.
pub const SELECT_MENU_LIMIT: usize = 25;

/// Page bookkeeping for button-driven menus.
///
/// Moving past either end wraps around. When the page count is unknown the
/// requested page is taken as-is and it is up to the page source to reject it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNavigator {
    current: usize,
    max_pages: Option<usize>,
}

impl PageNavigator {
    pub fn new(max_pages: Option<usize>, start: usize) -> Self {
        let mut navigator = Self {
            current: 0,
            max_pages,
        };
        navigator.jump(start as isize);
        navigator
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn max_pages(&self) -> Option<usize> {
        self.max_pages
    }

    /// Single-page (or empty) sources get their navigation buttons disabled.
    pub fn navigation_enabled(&self) -> bool {
        self.max_pages.map_or(true, |max| max > 1)
    }

    pub fn forward(&mut self) -> usize {
        self.jump(self.current as isize + 1)
    }

    pub fn back(&mut self) -> usize {
        self.jump(self.current as isize - 1)
    }

    pub fn first(&mut self) -> usize {
        self.current = 0;
        self.current
    }

    pub fn last(&mut self) -> usize {
        if let Some(max) = self.max_pages {
            self.current = max.saturating_sub(1);
        }
        self.current
    }

    /// Go to `target`, wrapping to the first page past the end and to the
    /// last page below zero.
    pub fn jump(&mut self, target: isize) -> usize {
        self.current = match self.max_pages {
            None => target.max(0) as usize,
            Some(0) => 0,
            Some(max) if target >= max as isize => 0,
            Some(max) if target < 0 => max - 1,
            Some(_) => target as usize,
        };
        self.current
    }

    /// Slice of page options shown in the select menu.
    ///
    /// With more than 25 pages the menu follows the current page: the 12 pages
    /// before it and the 13 from it onward, or the last 25 near the end.
    pub fn select_window(&self, option_count: usize) -> Range<usize> {
        select_window(option_count, self.current)
    }
}

pub fn select_window(option_count: usize, current: usize) -> Range<usize> {
    if option_count <= SELECT_MENU_LIMIT {
        return 0..option_count;
    }

    let tail_start = option_count - SELECT_MENU_LIMIT;
    if current >= tail_start {
        tail_start..option_count
    } else if current > 12 {
        current - 12..current + 13
    } else {
        0..SELECT_MENU_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_wraps_at_both_ends() {
        let mut nav = PageNavigator::new(Some(3), 0);

        assert_eq!(nav.back(), 2);
        assert_eq!(nav.forward(), 0);
        assert_eq!(nav.forward(), 1);
        assert_eq!(nav.last(), 2);
        assert_eq!(nav.forward(), 0);
        assert_eq!(nav.first(), 0);
    }

    #[test]
    fn unknown_page_count_passes_through() {
        let mut nav = PageNavigator::new(None, 4);

        assert_eq!(nav.current(), 4);
        assert_eq!(nav.forward(), 5);
        assert_eq!(nav.last(), 5);
        assert!(nav.navigation_enabled());
    }

    #[test]
    fn single_page_disables_navigation() {
        assert!(!PageNavigator::new(Some(1), 0).navigation_enabled());
        assert!(PageNavigator::new(Some(8), 0).navigation_enabled());
    }

    #[test]
    fn select_window_follows_current_page() {
        assert_eq!(select_window(8, 3), 0..8);
        assert_eq!(select_window(40, 0), 0..25);
        assert_eq!(select_window(40, 12), 0..25);
        assert_eq!(select_window(40, 13), 1..26);
        assert_eq!(select_window(40, 14), 2..27);
        assert_eq!(select_window(40, 15), 15..40);
        assert_eq!(select_window(40, 39), 15..40);
    }
}

use std::fmt;
use std::time::Duration;

use crate::models::BookId;

/// The application's route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Home,
    /// `/addbook`
    AddBook,
    /// `/book/{id}`
    Book(BookId),
    /// `/editbook/{id}`
    EditBook(BookId),
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        match path {
            "/" | "" => return Some(Route::Home),
            "/addbook" => return Some(Route::AddBook),
            _ => {}
        }

        let (prefix, id) = path.trim_start_matches('/').split_once('/')?;
        if id.is_empty() || id.contains('/') {
            return None;
        }
        let id = urlencoding::decode(id).ok()?.into_owned();
        match prefix {
            "book" => Some(Route::Book(BookId::new(id))),
            "editbook" => Some(Route::EditBook(BookId::new(id))),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::AddBook => "/addbook".to_string(),
            Route::Book(id) => format!("/book/{}", urlencoding::encode(id.as_str())),
            Route::EditBook(id) => format!("/editbook/{}", urlencoding::encode(id.as_str())),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// A navigation that should happen once, after `after` has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredNavigation {
    pub to: Route,
    pub after: Duration,
}

impl DeferredNavigation {
    pub fn new(to: Route, after: Duration) -> Self {
        DeferredNavigation { to, after }
    }
}

/// Stand-in for a signed-in user; there is no session model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderUser {
    pub name: &'static str,
    pub email: &'static str,
}

pub const PLACEHOLDER_USER: PlaceholderUser = PlaceholderUser {
    name: "Ram Kumar",
    email: "ram@example.com",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    /// Follow `prefers-color-scheme`.
    System,
    Light,
    Dark,
}

impl Theme {
    pub fn parse(value: &str) -> Option<Theme> {
        match value {
            "system" => Some(Theme::System),
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::System => "system",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// Header state. Purely presentational and owned by the shell instance
/// that renders it; nothing here survives a reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellState {
    pub theme: Theme,
    pub mobile_menu_open: bool,
    pub profile_open: bool,
}

impl Default for ShellState {
    fn default() -> Self {
        ShellState {
            theme: Theme::System,
            mobile_menu_open: false,
            profile_open: false,
        }
    }
}

impl ShellState {
    /// Flip between light and dark. From `System` the toggle resolves
    /// against the detected system preference.
    pub fn toggle_theme(&mut self, system_prefers_dark: bool) {
        let dark_now = self.is_dark(system_prefers_dark);
        self.theme = if dark_now { Theme::Light } else { Theme::Dark };
    }

    pub fn is_dark(&self, system_prefers_dark: bool) -> bool {
        match self.theme {
            Theme::System => system_prefers_dark,
            Theme::Light => false,
            Theme::Dark => true,
        }
    }

    pub fn toggle_mobile_menu(&mut self) {
        self.mobile_menu_open = !self.mobile_menu_open;
    }

    pub fn toggle_profile(&mut self) {
        self.profile_open = !self.profile_open;
    }

    /// A click landed outside the profile dropdown.
    pub fn dismiss_profile(&mut self) {
        self.profile_open = false;
    }

    /// Following any link closes both menus.
    pub fn navigated(&mut self) {
        self.mobile_menu_open = false;
        self.profile_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_table() {
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse("/addbook"), Some(Route::AddBook));
        assert_eq!(
            Route::parse("/book/65f1c2"),
            Some(Route::Book(BookId::new("65f1c2")))
        );
        assert_eq!(
            Route::parse("/editbook/65f1c2/"),
            Some(Route::EditBook(BookId::new("65f1c2")))
        );
        assert_eq!(Route::parse("/book/42?theme=dark"), Some(Route::Book(BookId::new("42"))));
    }

    #[test]
    fn unknown_paths_do_not_match() {
        assert_eq!(Route::parse("/all-books"), None);
        assert_eq!(Route::parse("/book/"), None);
        assert_eq!(Route::parse("/book/1/2"), None);
        assert_eq!(Route::parse("/cart"), None);
    }

    #[test]
    fn paths_round_trip() {
        for route in [
            Route::Home,
            Route::AddBook,
            Route::Book(BookId::new("abc 1")),
            Route::EditBook(BookId::new("abc")),
        ] {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
        assert_eq!(Route::Book(BookId::new("abc 1")).path(), "/book/abc%201");
    }

    #[test]
    fn theme_toggle_resolves_system_preference() {
        let mut shell = ShellState::default();
        assert!(shell.is_dark(true));

        shell.toggle_theme(true);
        assert_eq!(shell.theme, Theme::Light);
        shell.toggle_theme(true);
        assert_eq!(shell.theme, Theme::Dark);

        let mut shell = ShellState::default();
        shell.toggle_theme(false);
        assert_eq!(shell.theme, Theme::Dark);
    }

    #[test]
    fn menus_are_independent_until_navigation() {
        let mut shell = ShellState::default();
        shell.toggle_mobile_menu();
        shell.toggle_profile();
        assert!(shell.mobile_menu_open && shell.profile_open);

        shell.dismiss_profile();
        assert!(shell.mobile_menu_open);
        assert!(!shell.profile_open);

        shell.toggle_profile();
        shell.navigated();
        assert!(!shell.mobile_menu_open && !shell.profile_open);
    }
}

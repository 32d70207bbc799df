//! Route guard
//!
//! Decides which top-level screen may be shown for a session snapshot.
//! Protected screens are unreachable without a token, and nothing but the
//! splash is shown until the session has been restored.

use std::fmt;

use crate::session::SessionState;

/// Screens behind the session guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    /// Latest posts
    Home,
    /// Concert catalogue
    Explore,
    Tickets,
    Profile,
    /// Profile sub-page listing favorites
    Favorites,
    /// Profile sub-page listing purchased tickets
    TicketList,
}

impl Tab {
    pub const ALL: [Tab; 6] = [
        Tab::Home,
        Tab::Explore,
        Tab::Tickets,
        Tab::Profile,
        Tab::Favorites,
        Tab::TicketList,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Home => "Latest posts",
            Tab::Explore => "Concerts",
            Tab::Tickets => "Tickets",
            Tab::Profile => "Profile",
            Tab::Favorites => "Favorites",
            Tab::TicketList => "My tickets",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Shown while the session is still being restored
    Splash,
    Login,
    Protected(Tab),
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Splash => "/",
            Route::Login => "/login",
            Route::Protected(Tab::Home) => "/(tabs)/home",
            Route::Protected(Tab::Explore) => "/(tabs)/explore",
            Route::Protected(Tab::Tickets) => "/(tabs)/tickets",
            Route::Protected(Tab::Profile) => "/(tabs)/profile",
            Route::Protected(Tab::Favorites) => "/profile/favorites",
            Route::Protected(Tab::TicketList) => "/profile/tickets-list",
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Protected(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Landing route for a session snapshot
pub fn guard(state: &SessionState) -> Route {
    navigate(state, Tab::Home)
}

/// Route actually shown when `requested` is asked for
///
/// A logged-in user on the login screen lands on the requested tab; a
/// logged-out user asking for a protected tab lands on login.
pub fn navigate(state: &SessionState, requested: Tab) -> Route {
    if !state.is_ready() {
        return Route::Splash;
    }
    if state.is_authenticated() {
        Route::Protected(requested)
    } else {
        Route::Login
    }
}

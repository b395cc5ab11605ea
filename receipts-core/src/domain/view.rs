//! Navigation view state
//!
//! Presentation only; nothing here touches receipt data.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Invoices,
    Analytics,
    Login,
    Profile,
}

impl Page {
    /// Pages listed in the navigation bar
    pub const NAV: [Page; 3] = [Page::Home, Page::Invoices, Page::Analytics];

    pub fn path(&self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Invoices => "/invoices",
            Page::Analytics => "/dashboard",
            Page::Login => "/login",
            Page::Profile => "/profile",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Invoices => "Invoices",
            Page::Analytics => "Analytics",
            Page::Login => "Login",
            Page::Profile => "Profile",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Collapsible navigation menu
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavMenu {
    open: bool,
}

impl NavMenu {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Following a link closes the menu
    pub fn navigate(&mut self, page: Page) -> Page {
        self.open = false;
        page
    }
}

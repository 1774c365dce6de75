//! Path to view table

/// Screens of the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Timer,
    History,
    Settings,
}

#[derive(Debug, Clone, Copy)]
pub enum Target {
    Redirect(&'static str),
    View(View),
}

#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub path: &'static str,
    pub target: Target,
}

pub const DEFAULT_PATH: &str = "/tabs/timer";

pub const ROUTES: &[Route] = &[
    Route {
        path: "/",
        target: Target::Redirect(DEFAULT_PATH),
    },
    Route {
        path: "/tabs",
        target: Target::Redirect(DEFAULT_PATH),
    },
    Route {
        path: "/tabs/timer",
        target: Target::View(View::Timer),
    },
    Route {
        path: "/tabs/history",
        target: Target::View(View::History),
    },
    Route {
        path: "/tabs/settings",
        target: Target::View(View::Settings),
    },
];

const MAX_REDIRECTS: usize = 8;

fn normalize(path: &str) -> &str {
    let trimmed = path.trim();
    if trimmed.len() > 1 {
        trimmed.trim_end_matches('/')
    } else {
        trimmed
    }
}

/// Follow redirects from `path` to the view it shows
pub fn resolve(path: &str) -> Option<View> {
    let mut current = normalize(path);

    for _ in 0..=MAX_REDIRECTS {
        let route = ROUTES.iter().find(|r| r.path == current)?;
        match route.target {
            Target::View(view) => return Some(view),
            Target::Redirect(to) => current = to,
        }
    }

    tracing::warn!("Too many redirects resolving '{}'", path);
    None
}

impl View {
    pub fn path(&self) -> &'static str {
        match self {
            View::Timer => "/tabs/timer",
            View::History => "/tabs/history",
            View::Settings => "/tabs/settings",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_redirects_to_timer() {
        assert_eq!(resolve("/"), Some(View::Timer));
        assert_eq!(resolve("/tabs/"), Some(View::Timer));
        assert_eq!(resolve("/tabs"), Some(View::Timer));
    }

    #[test]
    fn test_tabs() {
        assert_eq!(resolve("/tabs/history"), Some(View::History));
        assert_eq!(resolve("/tabs/settings/"), Some(View::Settings));
        assert_eq!(resolve("/settings"), None);
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn test_view_paths_resolve_to_themselves() {
        for view in [View::Timer, View::History, View::Settings] {
            assert_eq!(resolve(view.path()), Some(view));
        }
    }
}

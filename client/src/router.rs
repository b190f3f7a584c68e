//! Route table, auth guard and navigator.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every navigation is evaluated once against the guard: a route that
//! requires auth with no token in the session is rewritten to
//! `/login?redirect=<requested path>`. The HTTP wrapper uses the same
//! navigator to bounce the user to login on a 401.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::session::{Session, SessionStore};
use crate::storage::lock;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const REDIRECT_PARAM: &str = "redirect";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteName {
    Home,
    Login,
    Register,
    Profile,
    VideoList,
    VideoUpload,
    VideoPlayer,
    Search,
    Social,
    Friends,
    PrivateChat,
    ChatRoomList,
    ChatRoom,
    NotFound,
}

impl RouteName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Login => "Login",
            Self::Register => "Register",
            Self::Profile => "Profile",
            Self::VideoList => "VideoList",
            Self::VideoUpload => "VideoUpload",
            Self::VideoPlayer => "VideoPlayer",
            Self::Search => "Search",
            Self::Social => "Social",
            Self::Friends => "Friends",
            Self::PrivateChat => "PrivateChat",
            Self::ChatRoomList => "ChatRoomList",
            Self::ChatRoom => "ChatRoom",
            Self::NotFound => "NotFound",
        }
    }
}

struct RouteDef {
    name: RouteName,
    /// Segments; `:name` captures a parameter. Relative to the parent for children.
    pattern: &'static str,
    requires_auth: bool,
    children: &'static [RouteDef],
}

const fn route(name: RouteName, pattern: &'static str, requires_auth: bool) -> RouteDef {
    RouteDef {
        name,
        pattern,
        requires_auth,
        children: &[],
    }
}

// Static segments are declared before parameter segments at the same depth.
static ROUTES: &[RouteDef] = &[
    route(RouteName::Home, "/", false),
    route(RouteName::Login, "/login", false),
    route(RouteName::Register, "/register", false),
    route(RouteName::Profile, "/profile", true),
    route(RouteName::VideoList, "/video/list", false),
    route(RouteName::VideoUpload, "/video/upload", true),
    route(RouteName::VideoPlayer, "/video/:id", false),
    route(RouteName::Search, "/search", false),
    RouteDef {
        name: RouteName::Social,
        pattern: "/social",
        requires_auth: true,
        children: &[
            route(RouteName::Friends, "friends", false),
            route(RouteName::PrivateChat, "chat/:userId", false),
            route(RouteName::ChatRoomList, "chatroom/list", false),
            route(RouteName::ChatRoom, "chatroom/:roomId", false),
        ],
    },
];

/// Result of resolving a location against the route table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch {
    pub name: RouteName,
    pub params: BTreeMap<String, String>,
    pub query: Vec<(String, String)>,
    pub requires_auth: bool,
    /// Path plus query, as navigated to.
    pub full_path: String,
}

impl RouteMatch {
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Outcome of the auth guard for one navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

/// Resolve `location` (path with optional query/fragment) to a route.
#[must_use]
pub fn resolve(location: &str) -> RouteMatch {
    let without_fragment = location.split('#').next().unwrap_or_default();
    let (path, query_str) = without_fragment
        .split_once('?')
        .unwrap_or((without_fragment, ""));
    let query = url::form_urlencoded::parse(query_str.as_bytes())
        .into_owned()
        .collect::<Vec<_>>();
    let segments = split_segments(path);

    let (name, params, requires_auth) = match_routes(ROUTES, &segments, false)
        .unwrap_or((RouteName::NotFound, BTreeMap::new(), false));

    RouteMatch {
        name,
        params,
        query,
        requires_auth,
        full_path: without_fragment.to_owned(),
    }
}

/// Decide whether a navigation to `target` may proceed for `session`.
#[must_use]
pub fn guard(target: &RouteMatch, session: &Session) -> Navigation {
    if target.requires_auth && !session.is_logged_in() {
        return Navigation::Redirect(login_location(&target.full_path));
    }
    Navigation::Proceed
}

/// `/login?redirect=<return_to>`
#[must_use]
pub fn login_location(return_to: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(REDIRECT_PARAM, return_to)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

type Resolved = (RouteName, BTreeMap<String, String>, bool);

fn match_routes(defs: &[RouteDef], segments: &[&str], inherited_auth: bool) -> Option<Resolved> {
    for def in defs {
        let pattern = split_segments(def.pattern);
        let requires_auth = inherited_auth || def.requires_auth;

        if segments.len() < pattern.len() {
            continue;
        }
        let Some(params) = match_segments(&pattern, &segments[..pattern.len()]) else {
            continue;
        };

        let rest = &segments[pattern.len()..];
        if rest.is_empty() {
            return Some((def.name, params, requires_auth));
        }
        if let Some((name, child_params, child_auth)) = match_routes(def.children, rest, requires_auth) {
            let mut merged = params;
            merged.extend(child_params);
            return Some((name, merged, child_auth));
        }
    }
    None
}

fn match_segments(pattern: &[&str], segments: &[&str]) -> Option<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    for (expected, actual) in pattern.iter().zip(segments) {
        if let Some(name) = expected.strip_prefix(':') {
            params.insert(name.to_owned(), (*actual).to_owned());
        } else if expected != actual {
            return None;
        }
    }
    Some(params)
}

#[derive(Debug)]
struct History {
    current: String,
    entries: Vec<String>,
}

/// Shared current-location holder that applies the guard on every move.
#[derive(Clone, Debug)]
pub struct Navigator {
    history: Arc<Mutex<History>>,
    session: SessionStore,
}

impl Navigator {
    /// Navigator positioned at `/`.
    #[must_use]
    pub fn new(session: SessionStore) -> Self {
        Self {
            history: Arc::new(Mutex::new(History {
                current: HOME_PATH.to_owned(),
                entries: vec![HOME_PATH.to_owned()],
            })),
            session,
        }
    }

    #[must_use]
    pub fn current(&self) -> String {
        lock(&self.history).current.clone()
    }

    #[must_use]
    pub fn current_route(&self) -> RouteMatch {
        resolve(&self.current())
    }

    /// Every location visited, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).entries.clone()
    }

    /// Navigate to `location`, applying the auth guard. Returns the route
    /// actually landed on.
    pub fn navigate(&self, location: &str) -> RouteMatch {
        let target = resolve(location);
        let landed = match guard(&target, &self.session.snapshot()) {
            Navigation::Proceed => target,
            Navigation::Redirect(login) => {
                tracing::info!(target = %target.full_path, "auth required; redirecting to login");
                resolve(&login)
            }
        };
        self.push(&landed.full_path);
        landed
    }

    /// Send the user to login, keeping the current location as the return
    /// path. Staying on the login route does not nest redirects.
    pub fn redirect_to_login(&self) -> RouteMatch {
        let current = self.current_route();
        if current.name == RouteName::Login {
            return current;
        }
        let landed = resolve(&login_location(&current.full_path));
        self.push(&landed.full_path);
        landed
    }

    /// The `redirect` query parameter of the current location, if any.
    #[must_use]
    pub fn return_path(&self) -> Option<String> {
        self.current_route()
            .query_value(REDIRECT_PARAM)
            .filter(|p| p.starts_with('/'))
            .map(ToOwned::to_owned)
    }

    fn push(&self, location: &str) {
        let mut history = lock(&self.history);
        history.current = location.to_owned();
        history.entries.push(location.to_owned());
    }
}

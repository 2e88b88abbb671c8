//! View allow-list deciding where a transport may exist

pub const INDEX_VIEW: &str = "/";
pub const LOBBY_VIEW: &str = "/lobby";
/// Allow-listed ahead of a game screen existing
pub const GAME_VIEW: &str = "/game";

#[derive(Debug, Clone)]
pub struct ViewGate {
    allowed: Vec<String>,
}

impl ViewGate {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|view| normalize_view(view.as_ref()))
                .collect(),
        }
    }

    pub fn allows(&self, view: &str) -> bool {
        let view = normalize_view(view);
        self.allowed.iter().any(|allowed| *allowed == view)
    }

    pub fn allowed_views(&self) -> &[String] {
        &self.allowed
    }
}

impl Default for ViewGate {
    fn default() -> Self {
        Self::new([LOBBY_VIEW, GAME_VIEW])
    }
}

/// Reduce a view identifier to its path: no query, fragment or trailing slash
pub fn normalize_view(view: &str) -> String {
    let view = view.trim();
    let end = view.find(|c: char| c == '?' || c == '#').unwrap_or(view.len());
    let path = view[..end].trim_end_matches('/');
    if path.is_empty() {
        INDEX_VIEW.to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allow_list() {
        let gate = ViewGate::default();
        assert!(gate.allows("/lobby"));
        assert!(gate.allows("/game"));
        assert!(!gate.allows("/"));
        assert!(!gate.allows("/settings"));
        assert!(!gate.allows(""));
    }

    #[test]
    fn test_equivalent_views() {
        let gate = ViewGate::default();
        assert!(gate.allows("/lobby/"));
        assert!(gate.allows("/lobby?code=ABCD"));
        assert!(gate.allows("/game#board"));
        assert!(gate.allows("  /lobby "));
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let gate = ViewGate::default();
        assert!(!gate.allows("/lobby/settings"));
        assert!(!gate.allows("/lobbyist"));
        assert!(!gate.allows("/LOBBY"));
    }

    #[test]
    fn test_normalize_view() {
        assert_eq!(normalize_view(""), "/");
        assert_eq!(normalize_view("/"), "/");
        assert_eq!(normalize_view("/?x=1"), "/");
        assert_eq!(normalize_view("/lobby//"), "/lobby");
    }

    #[test]
    fn test_custom_allow_list_normalized() {
        let gate = ViewGate::new(["/arena/"]);
        assert_eq!(gate.allowed_views().to_vec(), vec!["/arena".to_string()]);
        assert!(gate.allows("/arena"));
        assert!(!gate.allows("/lobby"));
    }
}

use shared::domain::ProjectId;

const VISUALIZER_PREFIX: &str = "/visualizer/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Visualizer(ProjectId),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Visualizer(id) => format!("{VISUALIZER_PREFIX}{id}"),
        }
    }

    /// The visualizer prefix matches case-insensitively; ids are kept verbatim.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(Self::Home);
        }

        let prefix_len = VISUALIZER_PREFIX.len();
        let head = trimmed.get(..prefix_len)?;
        if !head.eq_ignore_ascii_case(VISUALIZER_PREFIX) {
            return None;
        }

        let id = &trimmed[prefix_len..];
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self::Visualizer(ProjectId::new(id)))
    }

    pub fn project_id(&self) -> Option<&ProjectId> {
        match self {
            Self::Home => None,
            Self::Visualizer(id) => Some(id),
        }
    }
}

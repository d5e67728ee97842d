use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicI64, Ordering},
};

use chrono::Utc;
use serde::{Deserialize, Serialize};

static LAST_ISSUED_ID: AtomicI64 = AtomicI64::new(0);

/// Project identifier. Also the session handoff key and the render session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Millisecond-clock id, bumped past the last issued value so ids handed out
    /// by one process never repeat. Not unique across processes.
    pub fn generate() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut last = LAST_ISSUED_ID.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match LAST_ISSUED_ID.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(next.to_string()),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "public" => Ok(Self::Public),
            other => Err(format!("unknown visibility '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
    pub source_image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered_image: Option<String>,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
}

impl ProjectRecord {
    /// Unsaved record for a freshly uploaded floor plan.
    pub fn draft(id: ProjectId, source_image: impl Into<String>) -> Self {
        let name = format!("Residence {id}");
        Self {
            id,
            name,
            source_image: source_image.into(),
            rendered_image: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Entry passed from the intake flow to the render view through session storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRecord {
    #[serde(default)]
    pub initial_image: String,
    #[serde(default)]
    pub initial_rendered_image: Option<String>,
    #[serde(default)]
    pub name: String,
}

impl HandoffRecord {
    pub fn from_project(project: &ProjectRecord) -> Self {
        Self {
            initial_image: project.source_image.clone(),
            initial_rendered_image: project
                .rendered_image
                .clone()
                .filter(|image| !image.is_empty()),
            name: project.name.clone(),
        }
    }

    pub fn has_initial_image(&self) -> bool {
        !self.initial_image.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_strictly_increase() {
        let ids: Vec<i64> = (0..64)
            .map(|_| ProjectId::generate().as_str().parse().expect("numeric id"))
            .collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn handoff_record_serializes_missing_render_as_null() {
        let project = ProjectRecord::draft(ProjectId::new("42"), "data:image/png;base64,AA==");
        let record = HandoffRecord::from_project(&project);

        let text = serde_json::to_string(&record).expect("serialize");
        assert_eq!(
            text,
            r#"{"initialImage":"data:image/png;base64,AA==","initialRenderedImage":null,"name":"Residence 42"}"#
        );
    }

    #[test]
    fn handoff_record_drops_empty_rendered_image() {
        let mut project = ProjectRecord::draft(ProjectId::new("7"), "data:image/png;base64,AA==");
        project.rendered_image = Some(String::new());
        assert_eq!(HandoffRecord::from_project(&project).initial_rendered_image, None);
    }

    #[test]
    fn blank_ids_are_empty() {
        assert!(ProjectId::new("").is_empty());
        assert!(ProjectId::new("  ").is_empty());
        assert!(!ProjectId::new("abc").is_empty());
    }

    #[test]
    fn visibility_parses_case_insensitively() {
        assert_eq!("Public".parse::<Visibility>(), Ok(Visibility::Public));
        assert_eq!(" private ".parse::<Visibility>(), Ok(Visibility::Private));
        assert!("shared".parse::<Visibility>().is_err());
    }
}

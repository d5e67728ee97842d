use serde::{Deserialize, Serialize};

use crate::domain::{ProjectRecord, Visibility};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProjectRequest {
    pub item: ProjectRecord,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateViewRequest {
    pub source_image: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateViewResponse {
    #[serde(default)]
    pub rendered_image: Option<String>,
}

impl GenerateViewResponse {
    /// The rendered image, if the service actually produced a non-empty one.
    pub fn into_rendered_image(self) -> Option<String> {
        self.rendered_image.filter(|image| !image.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectId;

    #[test]
    fn create_project_request_uses_wire_field_names() {
        let request = CreateProjectRequest {
            item: ProjectRecord {
                id: ProjectId::new("17"),
                name: "Residence 17".into(),
                source_image: "data:image/png;base64,AAAA".into(),
                rendered_image: None,
                timestamp: 17,
            },
            visibility: Visibility::Private,
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["visibility"], "private");
        assert_eq!(value["item"]["id"], "17");
        assert_eq!(value["item"]["sourceImage"], "data:image/png;base64,AAAA");
        assert!(value["item"].get("renderedImage").is_none());
    }

    #[test]
    fn empty_rendered_image_counts_as_absent() {
        let response: GenerateViewResponse =
            serde_json::from_str(r#"{"renderedImage":""}"#).expect("parse");
        assert_eq!(response.into_rendered_image(), None);

        let response: GenerateViewResponse = serde_json::from_str("{}").expect("parse");
        assert_eq!(response.into_rendered_image(), None);
    }
}

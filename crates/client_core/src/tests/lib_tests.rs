use super::*;
use shared::domain::Visibility;

fn request(id: &str, source_image: &str) -> CreateProjectRequest {
    CreateProjectRequest {
        item: ProjectRecord::draft(ProjectId::new(id), source_image),
        visibility: Visibility::Private,
    }
}

#[test]
fn sign_in_state_controls_upload_permission() {
    let auth = SignInState::new(false);
    assert!(!auth.can_upload());
    auth.set_signed_in(true);
    assert!(auth.can_upload());
}

#[tokio::test]
async fn in_memory_projects_are_confirmed_and_kept() {
    let client = InMemoryProjectClient::new();

    let saved = client
        .create_project(request("1", "data:image/png;base64,AA=="))
        .await
        .expect("create");

    assert_eq!(saved.name, "Residence 1");
    assert_eq!(client.get(&ProjectId::new("1")), Some(saved));
}

#[tokio::test]
async fn in_memory_projects_reject_duplicates_and_blank_images() {
    let client = InMemoryProjectClient::new();
    client
        .create_project(request("1", "data:image/png;base64,AA=="))
        .await
        .expect("create");

    assert!(client
        .create_project(request("1", "data:image/png;base64,AA=="))
        .await
        .is_err());
    assert!(client.create_project(request("2", "")).await.is_err());
}

#[tokio::test]
async fn missing_clients_always_fail() {
    assert!(MissingGenerationClient
        .generate_3d_view(GenerateViewRequest {
            source_image: "data:image/png;base64,AA==".into(),
        })
        .await
        .is_err());
    assert!(MissingPersistenceClient
        .create_project(request("1", "data:image/png;base64,AA=="))
        .await
        .is_err());
}

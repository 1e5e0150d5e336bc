use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Users API",
        version = "0.1.0",
        description = "User records: create, read, update, soft/hard delete and paginated listing"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = crate::api::USERS_PATH, api = domain_users::handlers::ApiDoc)
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_paths_are_nested_under_version_prefix() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/v1/users"));
        assert!(paths.contains_key("/v1/users/{id}"));
        assert!(paths.contains_key("/v1/users/{id}/hard"));
        assert!(paths.contains_key("/v1/users/by-email/{email}"));
    }
}

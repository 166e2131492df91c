#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        // Verify that the schema contains the expected components
        assert!(openapi.components.is_some());
        let components = openapi.components.as_ref().unwrap();

        // Check that ErrorResponse schema is properly defined
        assert!(components.schemas.contains_key("ErrorResponse"));

        // Check that HealthResponse schema is properly defined
        assert!(components.schemas.contains_key("HealthResponse"));

        // Verify that the schema can be serialized to JSON without errors
        let json_result = serde_json::to_string(&openapi);
        assert!(json_result.is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        let error_response_schema = components.schemas.get("ErrorResponse").unwrap();

        // Verify ErrorResponse has the expected structure
        if let utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj)) = error_response_schema {
            let properties = &obj.properties;
            assert!(properties.contains_key("error"));
            assert!(properties.contains_key("code"));
            assert!(properties.contains_key("success"));
        } else {
            panic!("ErrorResponse should be an object schema");
        }
    }

    #[test]
    fn test_health_response_schema_structure() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();
        let health_response_schema = components.schemas.get("HealthResponse").unwrap();

        // Verify HealthResponse has the expected structure
        if let utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj)) = health_response_schema {
            let properties = &obj.properties;
            assert!(properties.contains_key("status"));
            assert!(properties.contains_key("version"));
            assert!(properties.contains_key("database"));
            assert!(properties.contains_key("sessions"));
        } else {
            panic!("HealthResponse should be an object schema");
        }
    }

    #[test]
    fn test_openapi_paths_contain_health_endpoint() {
        let openapi = ApiDoc::openapi();

        // Verify that the /health endpoint is properly defined
        assert!(openapi.paths.paths.contains_key("/health"));

        let health_path = openapi.paths.paths.get("/health").unwrap();
        let health_get = health_path.operations.get(&utoipa::openapi::PathItemType::Get);
        assert!(health_get.is_some());

        let health_get_op = health_get.unwrap();

        let responses = &health_get_op.responses;
        assert!(responses.responses.contains_key("200"));
        assert!(responses.responses.contains_key("503"));
    }

    #[test]
    fn test_openapi_paths_cover_accounts_and_sessions() {
        use utoipa::openapi::PathItemType;

        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        let collection = paths.get("/api/v1/accounts").unwrap();
        assert!(collection.operations.contains_key(&PathItemType::Get));
        assert!(collection.operations.contains_key(&PathItemType::Post));

        let item = paths.get("/api/v1/accounts/{account_id}").unwrap();
        for method in [PathItemType::Get, PathItemType::Put, PathItemType::Delete] {
            assert!(item.operations.contains_key(&method));
        }

        assert!(paths.contains_key("/api/v1/accounts/{account_id}/email"));
        assert!(paths.contains_key("/auth/login"));
        assert!(paths.contains_key("/auth/logout"));

        let components = openapi.components.as_ref().unwrap();
        for schema in ["AccountDto", "CreateAccountRequest", "UpdateAccountRequest", "LoginRequest"] {
            assert!(components.schemas.contains_key(schema), "missing schema {}", schema);
        }
    }

    #[test]
    fn test_account_dto_has_no_password() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();

        if let Some(utoipa::openapi::RefOr::T(utoipa::openapi::schema::Schema::Object(obj))) =
            components.schemas.get("AccountDto")
        {
            assert!(obj.properties.contains_key("username"));
            assert!(!obj.properties.contains_key("password"));
        } else {
            panic!("AccountDto should be an object schema");
        }
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi = ApiDoc::openapi();
        let openapi_json = serde_json::to_string(&openapi).unwrap();

        // Ensure no references to crate.schemas.ErrorResponse exist
        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));

        // Ensure proper ErrorResponse references exist
        assert!(openapi_json.contains("ErrorResponse"));
    }
}

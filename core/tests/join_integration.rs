use apijoin_core::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn schema_ref(name: &str) -> Schema {
    Schema::reference(&format!("#/components/schemas/{name}"))
}

fn get_returning(schema: Schema) -> PathItem {
    PathItem::default().with_operation(
        Method::Get,
        Operation::default().with_response("200", Response::json("ok", schema)),
    )
}

fn json_response_ref<'a>(document: &'a Document, path: &str, method: Method) -> Option<&'a str> {
    document.paths[path]
        .operation(method)?
        .responses["200"]
        .content["application/json"]
        .schema
        .as_ref()?
        .reference
        .as_deref()
}

fn address() -> Schema {
    Schema::typed("object")
        .with_property("street", Schema::typed("string"))
        .with_property("city", Schema::typed("string"))
}

fn user(id_type: &str) -> Schema {
    Schema::typed("object").with_property("id", Schema::typed(id_type))
}

// ---------------------------------------------------------------------------
// Rename-right
// ---------------------------------------------------------------------------

#[test]
fn test_rename_right_retargets_incoming_operations() {
    let users = Document::openapi("3.0.3")
        .with_path("/resource", get_returning(schema_ref("User")))
        .with_path("/users", get_returning(schema_ref("User")))
        .with_schema("User", user("string"));
    let orders = Document::openapi("3.0.3")
        .with_path("/resource", get_returning(schema_ref("User")))
        .with_path("/orders", get_returning(schema_ref("User")))
        .with_schema("User", user("integer"));

    let config = JoinConfig::default()
        .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight);
    let result = join(
        vec![
            ParsedDocument::new("users", users),
            ParsedDocument::new("orders", orders),
        ],
        config,
    )
    .unwrap();

    let schemas: Vec<&str> = result
        .document
        .components
        .schemas
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(schemas, vec!["User", "User_orders"]);
    assert_eq!(result.collision_count, 1);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("User_orders"));

    let doc = &result.document;
    assert_eq!(
        json_response_ref(doc, "/orders", Method::Get),
        Some("#/components/schemas/User_orders")
    );
    assert_eq!(
        json_response_ref(doc, "/users", Method::Get),
        Some("#/components/schemas/User")
    );
    assert_eq!(
        json_response_ref(doc, "/resource", Method::Get),
        Some("#/components/schemas/User")
    );
    assert_eq!(result.statistics.paths, 3);
    assert_eq!(result.statistics.schemas, 2);
}

#[test]
fn test_repeated_renames_stay_unique() {
    let base = Document::openapi("3.0.3").with_schema("User", user("string"));
    let config = JoinConfig::default()
        .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight)
        .with_rename_template("{Name}_copy");

    let result = join(
        vec![
            ParsedDocument::new("a", base.clone()),
            ParsedDocument::new("b", Document::openapi("3.0.3").with_schema("User", user("integer"))),
            ParsedDocument::new("c", Document::openapi("3.0.3").with_schema("User", user("boolean"))),
        ],
        config,
    )
    .unwrap();

    let schemas: Vec<&str> = result
        .document
        .components
        .schemas
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(schemas, vec!["User", "User_copy", "User_copy_2"]);
    assert_eq!(result.collision_count, 2);
}

// ---------------------------------------------------------------------------
// Fail strategies
// ---------------------------------------------------------------------------

#[test]
fn test_default_strategy_fails_on_path_collision() {
    let left = Document::openapi("3.0.3").with_path("/users", get_returning(user("string")));
    let right = Document::openapi("3.0.3").with_path("/users", get_returning(user("integer")));

    let err = join(
        vec![
            ParsedDocument::new("users.yaml", left),
            ParsedDocument::new("accounts.yaml", right),
        ],
        JoinConfig::default(),
    )
    .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("/users"), "{message}");
    assert!(message.contains("users.yaml"), "{message}");
    assert!(message.contains("accounts.yaml"), "{message}");
    assert!(matches!(
        err,
        JoinError::Collision {
            category: CollisionCategory::Path,
            ..
        }
    ));
}

#[test]
fn test_errors_use_source_map_positions() {
    let mut map = SourceMap::new();
    map.insert("paths./users", 12, 3);
    let left = ParsedDocument::new(
        "users.yaml",
        Document::openapi("3.0.3").with_path("/users", get_returning(user("string"))),
    )
    .with_source_map(map);
    let right = ParsedDocument::new(
        "accounts.yaml",
        Document::openapi("3.0.3").with_path("/users", get_returning(user("integer"))),
    );

    let err = join(vec![left, right], JoinConfig::default()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("users.yaml:12:3"), "{message}");
    assert!(message.contains("accounts.yaml (paths./users)"), "{message}");
}

// ---------------------------------------------------------------------------
// Operation context
// ---------------------------------------------------------------------------

fn shipping_document() -> Document {
    Document::openapi("3.0.3")
        .with_path("/shipping", get_returning(schema_ref("Address")))
        .with_path(
            "/orders",
            PathItem::default().with_operation(
                Method::Post,
                Operation::default()
                    .with_json_body(schema_ref("Address"))
                    .with_response("201", Response::default()),
            ),
        )
        .with_schema("Address", address().with_property("zip", Schema::typed("string")))
}

fn renamed_with_policy(policy: PrimaryOperationPolicy) -> Vec<String> {
    let base = Document::openapi("3.0.3").with_schema("Address", address());
    let config = JoinConfig::default()
        .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight)
        .with_rename_template("{PrimaryResource | pascalCase}{Name}")
        .with_operation_context(policy);

    let result = join(
        vec![
            ParsedDocument::new("base", base),
            ParsedDocument::new("shipping", shipping_document()),
        ],
        config,
    )
    .unwrap();
    result.document.components.schemas.keys().cloned().collect()
}

#[test]
fn test_alphabetical_policy_prefers_post_orders() {
    assert_eq!(
        renamed_with_policy(PrimaryOperationPolicy::Alphabetical),
        vec!["Address", "OrdersAddress"]
    );
}

#[test]
fn test_first_encountered_policy_prefers_declaration_order() {
    assert_eq!(
        renamed_with_policy(PrimaryOperationPolicy::FirstEncountered),
        vec!["Address", "ShippingAddress"]
    );
}

#[test]
fn test_missing_lineage_warns_and_falls_back_to_name() {
    let config = JoinConfig::default()
        .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight)
        .with_rename_template("{PrimaryResource | pascalCase}{Name}")
        .with_operation_context(PrimaryOperationPolicy::FirstEncountered);

    let result = join(
        vec![
            ParsedDocument::new("a", Document::openapi("3.0.3").with_schema("User", user("string"))),
            ParsedDocument::new("b", Document::openapi("3.0.3").with_schema("User", user("integer"))),
        ],
        config,
    )
    .unwrap();

    // An unreferenced schema renders to its bare name, which is taken.
    assert!(result.document.components.schemas.contains_key("User_2"));
    assert_eq!(result.collision_count, 1);
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings[0].contains("without operation context"));
}

#[test]
fn test_rename_left_traces_the_accumulated_side() {
    let left = Document::openapi("3.0.3")
        .with_path("/users", get_returning(schema_ref("User")))
        .with_schema("User", user("string"));
    let right = Document::openapi("3.0.3")
        .with_path("/accounts", get_returning(schema_ref("User")))
        .with_schema("User", user("integer"));

    let mut config = JoinConfig::default()
        .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameLeft)
        .with_rename_template("{PrimaryResource | pascalCase}{Name}")
        .with_operation_context(PrimaryOperationPolicy::FirstEncountered);
    config.trace_both_sides = true;

    let result = join(
        vec![
            ParsedDocument::new("users", left),
            ParsedDocument::new("accounts", right),
        ],
        config,
    )
    .unwrap();

    let doc = &result.document;
    assert_eq!(doc.components.schemas["UsersUser"], user("string"));
    assert_eq!(doc.components.schemas["User"], user("integer"));
    assert_eq!(
        json_response_ref(doc, "/users", Method::Get),
        Some("#/components/schemas/UsersUser")
    );
    assert_eq!(
        json_response_ref(doc, "/accounts", Method::Get),
        Some("#/components/schemas/User")
    );
}

// ---------------------------------------------------------------------------
// Prefixes
// ---------------------------------------------------------------------------

#[test]
fn test_namespace_prefix_names_the_losing_side() {
    let config = JoinConfig::default()
        .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight)
        .with_namespace_prefix("orders", "Ord");

    let result = join(
        vec![
            ParsedDocument::new("specs/users.yaml", Document::openapi("3.0.3").with_schema("User", user("string"))),
            ParsedDocument::new("specs/orders.yaml", Document::openapi("3.0.3").with_schema("User", user("integer"))),
        ],
        config,
    )
    .unwrap();
    assert!(result.document.components.schemas.contains_key("Ord_User"));
}

#[test]
fn test_always_apply_prefix_renames_every_schema_of_the_source() {
    let mut config = JoinConfig::default().with_namespace_prefix("orders", "Ord");
    config.always_apply_prefix = true;

    let orders = Document::openapi("3.0.3")
        .with_path("/orders", get_returning(schema_ref("Order")))
        .with_schema(
            "Order",
            Schema::typed("object").with_property("buyer", schema_ref("User")),
        )
        .with_schema("User", user("integer"));

    let result = join(
        vec![
            ParsedDocument::new("users", Document::openapi("3.0.3").with_schema("User", user("string"))),
            ParsedDocument::new("orders", orders),
        ],
        config,
    )
    .unwrap();

    let doc = &result.document;
    let names: Vec<&str> = doc.components.schemas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["User", "Ord_Order", "Ord_User"]);
    assert_eq!(
        doc.components.schemas["Ord_Order"].properties["buyer"].reference.as_deref(),
        Some("#/components/schemas/Ord_User")
    );
    assert_eq!(
        json_response_ref(doc, "/orders", Method::Get),
        Some("#/components/schemas/Ord_Order")
    );
    assert_eq!(result.collision_count, 0);
    assert_eq!(result.warnings.len(), 2);
}

// ---------------------------------------------------------------------------
// Semantic deduplication
// ---------------------------------------------------------------------------

#[test]
fn test_semantic_deduplication_after_merge() {
    let customers = Document::openapi("3.0.3")
        .with_path("/customers", get_returning(schema_ref("BillingAddress")))
        .with_schema("BillingAddress", address())
        .with_schema("Address", address());
    let shipments = Document::openapi("3.0.3")
        .with_path("/shipments", get_returning(schema_ref("ShippingAddress")))
        .with_schema("ShippingAddress", address().with_description("destination"));

    let mut config = JoinConfig::default();
    config.semantic_deduplication = true;
    let result = join(
        vec![
            ParsedDocument::new("customers", customers),
            ParsedDocument::new("shipments", shipments),
        ],
        config,
    )
    .unwrap();

    let doc = &result.document;
    let names: Vec<&str> = doc.components.schemas.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Address"]);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("consolidated 2"), "{}", result.warnings[0]);
    assert_eq!(
        json_response_ref(doc, "/customers", Method::Get),
        Some("#/components/schemas/Address")
    );
    assert_eq!(
        json_response_ref(doc, "/shipments", Method::Get),
        Some("#/components/schemas/Address")
    );
    assert_eq!(result.collision_count, 0);
}

// ---------------------------------------------------------------------------
// Swagger 2.0
// ---------------------------------------------------------------------------

#[test]
fn test_flat_family_join_rewrites_definitions() {
    let pets = Document::swagger()
        .with_path(
            "/pets",
            PathItem::default().with_operation(
                Method::Post,
                Operation::default()
                    .with_parameter(Parameter::new("body", "body", Schema::reference("#/definitions/Pet")))
                    .with_response("200", Response::with_schema("ok", Schema::reference("#/definitions/Pet"))),
            ),
        )
        .with_schema("Pet", Schema::typed("object").with_property("name", Schema::typed("string")));
    let mut store = Document::swagger()
        .with_path(
            "/store",
            PathItem::default().with_operation(
                Method::Get,
                Operation::default()
                    .with_response("200", Response::with_schema("ok", Schema::reference("#/definitions/Pet"))),
            ),
        )
        .with_schema("Pet", Schema::typed("object").with_property("id", Schema::typed("integer")));
    store.schemes.push("https".to_string());

    let config = JoinConfig::default()
        .with_strategy(CollisionCategory::Schema, CollisionStrategy::RenameRight);
    let result = join(
        vec![
            ParsedDocument::new("pets.json", pets),
            ParsedDocument::new("store.json", store),
        ],
        config,
    )
    .unwrap();

    let doc = &result.document;
    assert_eq!(result.version, "2.0");
    assert!(doc.definitions.contains_key("Pet_store"));
    let store_response = &doc.paths["/store"].get.as_ref().unwrap().responses["200"];
    assert_eq!(
        store_response.schema.as_ref().unwrap().reference.as_deref(),
        Some("#/definitions/Pet_store")
    );
    let body = &doc.paths["/pets"].post.as_ref().unwrap().parameters[0];
    assert_eq!(
        body.schema.as_ref().unwrap().reference.as_deref(),
        Some("#/definitions/Pet")
    );
    assert_eq!(doc.schemes, vec!["https".to_string()]);
}

// ---------------------------------------------------------------------------
// Components and reporting
// ---------------------------------------------------------------------------

#[test]
fn test_component_collisions_follow_their_own_strategy() {
    let mut left = Document::openapi("3.0.3");
    left.components.parameters.insert(
        "Limit".to_string(),
        Parameter::new("limit", "query", Schema::typed("integer")),
    );
    let mut right = Document::openapi("3.0.3");
    right.components.parameters.insert(
        "Limit".to_string(),
        Parameter::new("limit", "query", Schema::typed("string")),
    );
    right.components.parameters.insert(
        "Offset".to_string(),
        Parameter::new("offset", "query", Schema::typed("integer")),
    );

    let mut config = JoinConfig::default()
        .with_strategy(CollisionCategory::Component, CollisionStrategy::AcceptRight);
    config.collision_report = true;
    let result = join(
        vec![ParsedDocument::new("a", left), ParsedDocument::new("b", right)],
        config,
    )
    .unwrap();

    let parameters = &result.document.components.parameters;
    assert_eq!(parameters.len(), 2);
    assert_eq!(parameters["Limit"].schema, Some(Schema::typed("string")));
    assert_eq!(result.statistics.other_components, 2);

    let report = result.collision_report.unwrap();
    assert_eq!(report.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.category, CollisionCategory::Component);
    assert_eq!(record.resolution, Resolution::KeptRight);
    assert_eq!(record.left_source, "a");
    assert_eq!(record.right_source, "b");
    assert_eq!(report.by_category(CollisionCategory::Path).count(), 0);
}

#[test]
fn test_joined_result_can_be_joined_again() {
    let first = join(
        vec![
            ParsedDocument::new("a", Document::openapi("3.0.3").with_path("/a", get_returning(user("string")))),
            ParsedDocument::new("b", Document::openapi("3.0.3").with_path("/b", get_returning(user("string")))),
        ],
        JoinConfig::default(),
    )
    .unwrap();

    let second = join(
        vec![
            first.into_parsed("ab"),
            ParsedDocument::new("c", Document::openapi("3.0.3").with_path("/c", get_returning(user("string")))),
        ],
        JoinConfig::default(),
    )
    .unwrap();

    let paths: Vec<&str> = second.document.paths.keys().map(String::as_str).collect();
    assert_eq!(paths, vec!["/a", "/b", "/c"]);
    assert_eq!(second.statistics.operations, 3);
    assert_eq!(second.statistics.documents, 2);
}

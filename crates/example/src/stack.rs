//! The face-recognition API stack.
//!
//! Images uploaded to a bucket trigger an indexing function that stores
//! faceprints in a table and a face collection. A REST API exposes a search
//! function guarded by an API key.

use serde_json::json;
use strata_apply::{OutputDeclaration, OutputExporter};
use strata_core::StackConfig;
use strata_graph::{
    AttributeValue, BuildError, Fragment, ResourceGraph, ResourceId, ResourceNode,
};

/// Maximum number of faces indexed per image.
pub const MAX_FACES_COUNT: i64 = 10;

/// Stage the REST API is deployed to.
pub const API_STAGE: &str = "v1";

/// A stack ready to build: its declarations and the outputs to export.
#[derive(Debug)]
pub struct FaceStack {
    /// The declarations.
    pub graph: ResourceGraph,
    /// The outputs.
    pub outputs: OutputExporter,
}

fn reference(target: &ResourceId, attribute: &str) -> AttributeValue {
    AttributeValue::reference(target, attribute)
}

fn function_environment(
    config: &StackConfig,
    table: &ResourceId,
    collection: &ResourceId,
) -> AttributeValue {
    AttributeValue::map([
        ("COLLECTION_ID", reference(collection, "collection_id")),
        ("TABLE_ID", reference(table, "name")),
        ("MAX_FACES_COUNT", AttributeValue::from(MAX_FACES_COUNT.to_string())),
        ("DEBUG_MODE", AttributeValue::from(config.debug_mode().to_string())),
    ])
}

/// Declares every resource and output of the stack.
///
/// # Errors
///
/// Returns [`BuildError::DuplicateIdentity`] if two declarations collide,
/// which would be a bug in this function.
pub fn face_stack(config: &StackConfig, account_id: &str) -> Result<FaceStack, BuildError> {
    let identifier = config.shared_resource_identifier();

    let bucket = ResourceNode::new("storage", "images")
        .with_attribute("bucket_name", config.bucket_name(account_id))
        .with_attribute("force_destroy", true)
        .with_attribute(
            "tags",
            AttributeValue::map([("Name", identifier), ("Region", config.region())]),
        );
    let table = ResourceNode::new("table", "faces")
        .with_attribute("name", identifier)
        .with_attribute("billing_mode", "PAY_PER_REQUEST")
        .with_attribute("hash_key", "FaceId")
        .with_attribute(
            "attributes",
            AttributeValue::from(json!([{ "name": "FaceId", "type": "S" }])),
        );
    let collection = ResourceNode::new("collection", "faces").with_attribute(
        "collection_id",
        AttributeValue::interpolate([
            Fragment::Reference(table.id().attribute("name")),
            Fragment::from("-collection"),
        ]),
    );

    let (bucket_id, table_id, collection_id) =
        (bucket.id().clone(), table.id().clone(), collection.id().clone());

    let policy = ResourceNode::new("permission", "lambda").with_attribute(
        "document",
        AttributeValue::map([
            ("Version", AttributeValue::from("2012-10-17")),
            (
                "Statement",
                AttributeValue::list([
                    AttributeValue::map([
                        ("Effect", AttributeValue::from("Allow")),
                        ("Action", AttributeValue::list(["s3:GetObject"])),
                        (
                            "Resource",
                            AttributeValue::interpolate([
                                Fragment::Reference(bucket_id.attribute("arn")),
                                Fragment::from("/*"),
                            ]),
                        ),
                    ]),
                    AttributeValue::map([
                        ("Effect", AttributeValue::from("Allow")),
                        (
                            "Action",
                            AttributeValue::list(["dynamodb:PutItem", "dynamodb:GetItem"]),
                        ),
                        ("Resource", reference(&table_id, "arn")),
                    ]),
                    AttributeValue::map([
                        ("Effect", AttributeValue::from("Allow")),
                        (
                            "Action",
                            AttributeValue::list([
                                "rekognition:IndexFaces",
                                "rekognition:SearchFacesByImage",
                            ]),
                        ),
                        ("Resource", reference(&collection_id, "arn")),
                    ]),
                ]),
            ),
        ]),
    );
    let role = ResourceNode::new("identity", "lambda")
        .with_attribute("name", format!("{identifier}-lambda"))
        .with_attribute(
            "assume_role_policy",
            AttributeValue::from(json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "Service": "lambda.amazonaws.com" },
                    "Action": "sts:AssumeRole",
                }],
            })),
        );
    let attachment = ResourceNode::new("attachment", "lambda")
        .with_attribute("role", reference(role.id(), "name"))
        .with_attribute("policy_arn", reference(policy.id(), "arn"));

    let index = ResourceNode::new("function", "index")
        .with_attribute("function_name", format!("{identifier}_index"))
        .with_attribute("handler", "lambda_index.lambda_handler")
        .with_attribute("runtime", "python3.11")
        .with_attribute("role", reference(role.id(), "arn"))
        .with_attribute(
            "environment",
            function_environment(config, &table_id, &collection_id),
        )
        .depends_on(attachment.id().clone());
    let search = ResourceNode::new("function", "search")
        .with_attribute("function_name", format!("{identifier}_search"))
        .with_attribute("handler", "lambda_search.lambda_handler")
        .with_attribute("runtime", "python3.11")
        .with_attribute("role", reference(role.id(), "arn"))
        .with_attribute(
            "environment",
            function_environment(config, &table_id, &collection_id),
        )
        .depends_on(attachment.id().clone());

    let invoke = ResourceNode::new("function_permission", "s3_invoke")
        .with_attribute("function_name", reference(index.id(), "function_name"))
        .with_attribute("principal", "s3.amazonaws.com")
        .with_attribute("source_arn", reference(&bucket_id, "arn"));
    let notification = ResourceNode::new("notification", "uploads")
        .with_attribute("bucket", reference(&bucket_id, "bucket_name"))
        .with_attribute("lambda_function_arn", reference(index.id(), "arn"))
        .with_attribute("events", AttributeValue::list(["s3:ObjectCreated:*"]))
        .with_attribute("filter_suffix", ".jpg")
        .depends_on(invoke.id().clone());

    let api = ResourceNode::new("api", "rest")
        .with_attribute("name", config.api_name())
        .with_attribute("binary_media_types", AttributeValue::list(["image/jpeg"]));
    let route = ResourceNode::new("api_route", "search")
        .with_attribute("rest_api_id", reference(api.id(), "id"))
        .with_attribute("path_part", "search")
        .with_attribute("http_method", "PUT")
        .with_attribute("api_key_required", true)
        .with_attribute("integration_uri", reference(search.id(), "invoke_arn"));
    let deployment = ResourceNode::new("api_deployment", "stage")
        .with_attribute("rest_api_id", reference(api.id(), "id"))
        .with_attribute("stage_name", API_STAGE)
        .depends_on(route.id().clone());
    let key = ResourceNode::new("api_key", "client")
        .with_attribute("name", format!("{identifier}-client"))
        .with_attribute("enabled", true);
    let plan = ResourceNode::new("usage_plan", "default")
        .with_attribute("api_id", reference(api.id(), "id"))
        .with_attribute("stage", reference(deployment.id(), "stage_name"))
        .with_attribute("key_id", reference(key.id(), "id"))
        .with_attribute(
            "throttle",
            AttributeValue::map([
                ("burst_limit", AttributeValue::from(20)),
                ("rate_limit", AttributeValue::from(10)),
            ]),
        );

    let outputs = OutputExporter::new()
        .with_output(
            OutputDeclaration::new(
                "api_url",
                AttributeValue::interpolate([
                    Fragment::Reference(deployment.id().attribute("invoke_url")),
                    Fragment::from("/search"),
                ]),
            )
            .with_description("Endpoint accepting images to search for"),
        )
        .with_output(
            OutputDeclaration::reference("api_key", key.id(), "value")
                .sensitive()
                .with_description("Key clients send in the x-api-key header"),
        )
        .with_output(OutputDeclaration::reference("bucket_name", &bucket_id, "bucket_name"))
        .with_output(OutputDeclaration::reference("table_name", &table_id, "name"))
        .with_output(OutputDeclaration::reference(
            "collection_id",
            &collection_id,
            "collection_id",
        ))
        .with_output(OutputDeclaration::reference("index_function_arn", index.id(), "arn"))
        .with_output(OutputDeclaration::new("region", config.region()));

    let mut graph = ResourceGraph::new();
    for node in [
        bucket,
        table,
        collection,
        policy,
        role,
        attachment,
        index,
        search,
        invoke,
        notification,
        api,
        route,
        deployment,
        key,
        plan,
    ] {
        graph.add_node(node)?;
    }

    Ok(FaceStack { graph, outputs })
}

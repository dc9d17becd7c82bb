//! Schema output of `#[derive(ToolArguments)]` for the argument shapes the
//! Medium tools use, checked both structurally and with the validator the
//! server runs on every call.

#![allow(dead_code)]

use medium_mcp::{ToolArguments, ToolArgumentsDescriptor};
use serde_json::{json, Value};

fn accepts(schema: &Value, args: Value) -> bool {
    jsonschema::validator_for(schema)
        .expect("derived schema compiles")
        .is_valid(&args)
}

#[derive(ToolArguments)]
struct DraftArgs {
    #[tool_arg(desc = "Headline shown on the post", min_len = 1)]
    title: String,
    #[tool_arg(desc = "Markdown body", min_len = 10)]
    content: String,
    #[tool_arg(desc = "Up to five tags")]
    tags: Option<Vec<String>>,
    #[tool_arg(rename = "publicationId")]
    publication_id: Option<String>,
}

#[test]
fn draft_schema_matches_publish_payload() {
    assert_eq!(
        DraftArgs::input_schema(),
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Headline shown on the post", "minLength": 1 },
                "content": { "type": "string", "description": "Markdown body", "minLength": 10 },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Up to five tags"
                },
                "publicationId": { "type": "string" }
            },
            "required": ["title", "content"]
        })
    );
}

#[test]
fn draft_schema_enforces_lengths_and_required_fields() {
    let schema = DraftArgs::input_schema();
    assert!(accepts(&schema, json!({ "title": "T", "content": "ten chars!" })));
    assert!(accepts(
        &schema,
        json!({ "title": "T", "content": "ten chars!", "tags": [], "publicationId": "p1" })
    ));
    assert!(!accepts(&schema, json!({ "title": "", "content": "ten chars!" })));
    assert!(!accepts(&schema, json!({ "title": "T", "content": "short" })));
    assert!(!accepts(&schema, json!({ "content": "ten chars!" })));
    assert!(!accepts(&schema, json!({ "title": "T", "content": "ten chars!", "tags": "rust" })));
}

#[derive(ToolArguments)]
struct FilterArgs {
    #[tool_arg(min_len = 1)]
    keywords: Option<Vec<String>>,
    #[tool_arg(min_len = 3)]
    subtitle: Option<String>,
}

#[test]
fn min_len_on_optional_fields_applies_only_when_present() {
    let schema = FilterArgs::input_schema();
    assert_eq!(schema["properties"]["keywords"]["minItems"], 1);
    assert!(schema["properties"]["keywords"].get("minLength").is_none());
    assert_eq!(schema["properties"]["subtitle"]["minLength"], 3);
    assert!(schema.get("required").is_none());

    assert!(accepts(&schema, json!({})));
    assert!(accepts(&schema, json!({ "keywords": ["rust"], "subtitle": "abc" })));
    assert!(!accepts(&schema, json!({ "keywords": [] })));
    assert!(!accepts(&schema, json!({ "subtitle": "ab" })));
}

#[derive(ToolArguments)]
struct PagingArgs {
    #[tool_arg(required = true, rename = "publicationId")]
    publication_id: Option<String>,
    #[tool_arg(required = false)]
    limit: u32,
    min_score: f64,
    include_drafts: bool,
    #[tool_arg(skip)]
    request_origin: String,
}

#[test]
fn overrides_scalar_types_and_skipped_fields() {
    let schema = PagingArgs::input_schema();
    let properties = &schema["properties"];
    assert_eq!(properties["publicationId"]["type"], "string");
    assert_eq!(properties["limit"]["type"], "integer");
    assert_eq!(properties["min_score"]["type"], "number");
    assert_eq!(properties["include_drafts"]["type"], "boolean");
    assert!(properties.get("request_origin").is_none());
    assert!(properties.get("publication_id").is_none());
    assert_eq!(
        schema["required"],
        json!(["publicationId", "min_score", "include_drafts"])
    );
}

#[derive(ToolArguments)]
struct TagFilter {
    #[tool_arg(min_len = 1)]
    tag: String,
    exclude: Option<bool>,
}

#[derive(ToolArguments)]
struct NestedSearchArgs {
    primary: TagFilter,
    fallback: Option<TagFilter>,
    #[tool_arg(desc = "Extra filters, all of which must match")]
    extra: Vec<TagFilter>,
}

#[test]
fn nested_argument_structs_embed_their_schema() {
    let filter = TagFilter::input_schema();
    assert_eq!(
        filter,
        json!({
            "type": "object",
            "properties": {
                "tag": { "type": "string", "minLength": 1 },
                "exclude": { "type": "boolean" }
            },
            "required": ["tag"]
        })
    );

    let schema = NestedSearchArgs::input_schema();
    assert_eq!(schema["properties"]["primary"], filter);
    assert_eq!(schema["properties"]["fallback"], filter);
    assert_eq!(schema["properties"]["extra"]["items"], filter);
    assert_eq!(
        schema["properties"]["extra"]["description"],
        "Extra filters, all of which must match"
    );
    assert_eq!(schema["required"], json!(["primary", "extra"]));

    assert!(accepts(&schema, json!({ "primary": { "tag": "rust" }, "extra": [] })));
    assert!(!accepts(&schema, json!({ "primary": { "tag": "" }, "extra": [] })));
    assert!(!accepts(
        &schema,
        json!({ "primary": { "tag": "rust" }, "extra": [{ "exclude": true }] })
    ));
}

#[derive(ToolArguments)]
struct NoArgs {}

#[derive(ToolArguments)]
struct UnitArgs;

#[test]
fn argument_free_tools_accept_an_empty_object() {
    let expected = json!({ "type": "object", "properties": {} });
    assert_eq!(NoArgs::input_schema(), expected);
    assert_eq!(UnitArgs::input_schema(), expected);
    assert!(accepts(&expected, json!({})));
}

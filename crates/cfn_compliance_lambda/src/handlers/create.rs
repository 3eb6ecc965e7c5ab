use serde_json::{json, Value};

use crate::adapters::bucket::BucketNotifier;
use crate::adapters::function::{FunctionPermissionGranter, InvokePermissionRequest};
use crate::adapters::key::{KeyMetadataReader, KeyOrigin};
use crate::adapters::queue::QueueTagger;
use crate::runtime::contract::{
    Action, ByokParams, CallbackStatus, CustomResourceEvent, JsonParams, JsonTarget,
    PrincipalFormat, PrincipalParams, RequestType, ResponseData, S3NotificationParams,
};
use crate::runtime::principals::{flatten_principals, kms_principals};
use crate::runtime::tag_lists::{
    attribute_definition_entries, key_schema_entries, missing_required_tag, parse_pairs,
    queue_tag_map, tag_entries,
};

/// Invocation-scoped identity derived from the Lambda execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationIdentity {
    /// Account id extracted from the invoked-function ARN.
    pub account_id: String,
    /// CloudWatch log stream name; doubles as the physical resource id.
    pub log_stream: String,
}

/// Startup configuration for the create handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateHandlerConfig {
    /// Tag keys that must appear in every `json`/`tags` request.
    pub required_tags: Vec<String>,
}

/// External collaborators the actions call into.
pub struct ActionServices<'a> {
    pub queue_tagger: &'a dyn QueueTagger,
    pub permission_granter: &'a dyn FunctionPermissionGranter,
    pub bucket_notifier: &'a dyn BucketNotifier,
    pub key_metadata: &'a dyn KeyMetadataReader,
}

/// Terminal result of one invocation, ready to be reported to the stack
/// engine. A `None` reason falls back to the default log-stream reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackOutcome {
    pub status: CallbackStatus,
    pub reason: Option<String>,
    pub data: ResponseData,
}

impl CallbackOutcome {
    fn success(data: ResponseData) -> Self {
        Self {
            status: CallbackStatus::Success,
            reason: None,
            data,
        }
    }

    fn failure(reason: impl Into<String>, data: ResponseData) -> Self {
        Self {
            status: CallbackStatus::Failed,
            reason: Some(reason.into()),
            data,
        }
    }
}

/// Lifecycle filter plus action dispatch. Update and Delete are declared
/// unsupported and terminate as SUCCESS so stack operations never block on
/// this resource; only Create reaches an action handler. One action either
/// fully succeeds or the whole invocation is FAILED.
pub fn handle_event(
    event: &CustomResourceEvent,
    identity: &InvocationIdentity,
    config: &CreateHandlerConfig,
    services: &ActionServices<'_>,
) -> CallbackOutcome {
    let mut data = ResponseData::new();

    match event.request_type {
        RequestType::Update | RequestType::Delete => {
            log_info(
                "lifecycle_skipped",
                json!({
                    "request_type": event.request_type,
                    "logical_resource_id": event.logical_resource_id.clone(),
                }),
            );
            return CallbackOutcome::success(data);
        }
        RequestType::Create => {}
    }

    let Some(action_properties) = event.resource_properties.action.as_ref() else {
        return CallbackOutcome::success(data);
    };
    let Some(action_name) = action_properties.name.as_deref() else {
        return CallbackOutcome::success(data);
    };

    let action = match Action::parse(action_name) {
        Ok(action) => action,
        Err(error) => {
            log_error(
                "action_rejected",
                json!({"action": action_name, "error": error.message()}),
            );
            return CallbackOutcome::failure(error.message(), data);
        }
    };

    log_info(
        "action_dispatched",
        json!({
            "action": action_name,
            "logical_resource_id": event.logical_resource_id.clone(),
        }),
    );

    let result = match action {
        Action::Json => run_json_action(
            &action_properties.parameters,
            &config.required_tags,
            services.queue_tagger,
            &mut data,
        ),
        Action::S3Notification => run_s3_notification_action(
            &action_properties.parameters,
            identity,
            services.permission_granter,
            services.bucket_notifier,
            &mut data,
        ),
        Action::Byok => run_byok_action(
            &action_properties.parameters,
            services.key_metadata,
            &mut data,
        ),
        Action::Principal => run_principal_action(&action_properties.parameters, &mut data),
    };

    match result {
        Ok(()) => CallbackOutcome::success(data),
        Err(reason) => {
            log_error("action_failed", json!({"action": action_name, "reason": reason.clone()}));
            CallbackOutcome::failure(reason, data)
        }
    }
}

fn run_json_action(
    parameters: &serde_json::Map<String, Value>,
    required_tags: &[String],
    queue_tagger: &dyn QueueTagger,
    data: &mut ResponseData,
) -> Result<(), String> {
    let params =
        JsonParams::from_parameters(parameters).map_err(|error| error.message().to_string())?;

    let parsed = parse_pairs(&params.pairs);
    for segment in &parsed.skipped {
        log_info("segment_skipped", json!({"segment": segment.clone()}));
    }

    let entries = match params.target {
        JsonTarget::Tags => {
            if let Some(missing) = missing_required_tag(required_tags, &parsed) {
                return Err(format!("Missing required tag: {missing}"));
            }
            contract_json(&tag_entries(&parsed))
        }
        JsonTarget::DynamoDbSchema => contract_json(&attribute_definition_entries(&parsed)),
        JsonTarget::DynamoDbKey => contract_json(&key_schema_entries(&parsed)),
        JsonTarget::Sqs => {
            let Some(queue_url) = params.queue_url.as_deref() else {
                return Err("Missing SQS URI".to_string());
            };
            let tags = queue_tag_map(&parsed);
            if tags.is_empty() {
                return Err("Missing SQS tags".to_string());
            }
            queue_tagger.tag_queue(queue_url, &tags).map_err(|error| {
                data.set_error(error.clone());
                format!("Error adding tags to SQS: {error}")
            })?;
            // Queue tagging has no structured list output; templates still
            // read an (empty) Json attribute.
            Value::Array(Vec::new())
        }
    };

    data.insert("Json", entries);
    Ok(())
}

fn run_s3_notification_action(
    parameters: &serde_json::Map<String, Value>,
    identity: &InvocationIdentity,
    permission_granter: &dyn FunctionPermissionGranter,
    bucket_notifier: &dyn BucketNotifier,
    data: &mut ResponseData,
) -> Result<(), String> {
    let params = S3NotificationParams::from_parameters(parameters)
        .map_err(|error| error.message().to_string())?;

    let request = InvokePermissionRequest {
        function_arn: params.function_arn.clone(),
        bucket_arn: format!("arn:aws:s3:::{}", params.bucket),
        source_account: identity.account_id.clone(),
        statement_id: uuid::Uuid::new_v4().to_string(),
    };
    permission_granter
        .allow_bucket_invoke(&request)
        .map_err(|error| {
            data.set_error(error.clone());
            format!("Error processing S3 notification: {error}")
        })?;

    bucket_notifier
        .put_object_created_notification(&params.bucket, &params.function_arn, &params.filter_rules)
        .map_err(|error| {
            data.set_error(error.clone());
            format!("Error processing S3 notification: {error}")
        })?;

    data.insert("Status", Value::from("SUCCESS"));
    Ok(())
}

fn run_byok_action(
    parameters: &serde_json::Map<String, Value>,
    key_metadata: &dyn KeyMetadataReader,
    data: &mut ResponseData,
) -> Result<(), String> {
    let params =
        ByokParams::from_parameters(parameters).map_err(|error| error.message().to_string())?;

    let origin = key_metadata.key_origin(&params.key_id).map_err(|error| {
        data.set_error(error.clone());
        format!("Error processing KMS: {error}")
    })?;

    if origin != KeyOrigin::External {
        data.insert("Id", Value::from("Provided Key is not BYOK"));
        return Err("Provided encryption key is not BYOK".to_string());
    }

    Ok(())
}

fn run_principal_action(
    parameters: &serde_json::Map<String, Value>,
    data: &mut ResponseData,
) -> Result<(), String> {
    let params = PrincipalParams::from_parameters(parameters)
        .map_err(|error| error.message().to_string())?;

    let principal = match params.format {
        PrincipalFormat::Flat => {
            Value::from(flatten_principals(&params.account_id, &params.principals))
        }
        PrincipalFormat::Kms => {
            contract_json(&kms_principals(&params.account_id, &params.principals))
        }
    };

    data.insert("Principal", principal);
    Ok(())
}

fn contract_json(value: impl serde::Serialize) -> Value {
    serde_json::to_value(value).expect("contract value should serialize")
}

fn log_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "create_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "create_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

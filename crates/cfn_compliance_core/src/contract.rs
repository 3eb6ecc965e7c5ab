use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle event emitted by CloudFormation for a custom resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

/// Invocation envelope sent by CloudFormation. Fields beyond the ones we
/// consume (ServiceToken, ResourceType, ...) are ignored on deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
    #[serde(rename = "ResponseURL", default, skip_serializing_if = "Option::is_none")]
    pub response_url: Option<String>,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceProperties {
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionProperties>,
}

/// Action request as authored in the template: a name plus a loosely-typed
/// parameter mapping. Each action validates the mapping into its own typed
/// parameter struct before doing any work.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionProperties {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Parameters", default)]
    pub parameters: Map<String, Value>,
}

/// Closed set of supported actions. Names are matched case-insensitively;
/// anything outside this set is a validation error rather than a silent
/// success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Json,
    S3Notification,
    Byok,
    Principal,
}

impl Action {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "s3notification" => Ok(Self::S3Notification),
            "byok" => Ok(Self::Byok),
            "principal" => Ok(Self::Principal),
            other => Err(ValidationError::new(format!("Unrecognized action: {other}"))),
        }
    }
}

/// Terminal status reported back to CloudFormation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallbackStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

/// Fixed-shape body of the callback PUT to `ResponseURL`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackBody {
    pub status: CallbackStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: ResponseData,
}

/// Per-invocation response accumulator. Built fresh for every invocation and
/// handed back to CloudFormation in the callback `Data` field, where
/// templates read action results via `Fn::GetAtt`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ResponseData {
    entries: Map<String, Value>,
}

impl ResponseData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    /// Records the underlying text of a failed external call under the
    /// `error` key.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.entries.insert("error".to_string(), Value::from(message.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Target shape for the `json` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonTarget {
    Tags,
    DynamoDbSchema,
    DynamoDbKey,
    Sqs,
}

impl JsonTarget {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name.to_ascii_lowercase().as_str() {
            "tags" => Ok(Self::Tags),
            "dynamodbschema" => Ok(Self::DynamoDbSchema),
            "dynamodbkey" => Ok(Self::DynamoDbKey),
            "sqs" => Ok(Self::Sqs),
            other => Err(ValidationError::new(format!(
                "Unsupported Type for json action: {other}"
            ))),
        }
    }
}

/// Validated parameters for the `json` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonParams {
    pub pairs: String,
    pub target: JsonTarget,
    pub queue_url: Option<String>,
}

impl JsonParams {
    pub fn from_parameters(parameters: &Map<String, Value>) -> Result<Self, ValidationError> {
        let target_name = string_param(parameters, "Type").ok_or_else(|| {
            ValidationError::new("Json action missing parameters: Type")
        })?;

        Ok(Self {
            pairs: string_param(parameters, "JSON").unwrap_or_default(),
            target: JsonTarget::parse(&target_name)?,
            queue_url: string_param(parameters, "SQS"),
        })
    }
}

/// One S3 key filter rule (`prefix`/`suffix`) as authored in the template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationFilterRule {
    pub name: String,
    pub value: String,
}

/// Validated parameters for the `s3notification` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3NotificationParams {
    pub bucket: String,
    pub function_arn: String,
    pub filter_rules: Vec<NotificationFilterRule>,
}

impl S3NotificationParams {
    pub fn from_parameters(parameters: &Map<String, Value>) -> Result<Self, ValidationError> {
        let bucket = string_param(parameters, "Bucket");
        let function_arn = string_param(parameters, "Lambda");

        let mut missing = Vec::new();
        if bucket.is_none() {
            missing.push("Bucket");
        }
        if function_arn.is_none() {
            missing.push("Lambda");
        }
        if !missing.is_empty() {
            return Err(ValidationError::new(format!(
                "S3 notification missing parameters: {}",
                missing.join(", ")
            )));
        }

        let filter_rules = match parameters.get("FilterRules") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|error| {
                ValidationError::new(format!("Invalid FilterRules parameter: {error}"))
            })?,
        };

        Ok(Self {
            bucket: bucket.unwrap_or_default(),
            function_arn: function_arn.unwrap_or_default(),
            filter_rules,
        })
    }
}

/// Validated parameters for the `byok` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByokParams {
    pub key_id: String,
}

impl ByokParams {
    pub fn from_parameters(parameters: &Map<String, Value>) -> Result<Self, ValidationError> {
        let key_id = string_param(parameters, "Key")
            .ok_or_else(|| ValidationError::new("No encryption key provided"))?;
        Ok(Self { key_id })
    }
}

/// Output shape for the `principal` action. `Kms` keeps the historical
/// asymmetry of returning a list instead of a joined string; downstream
/// `Fn::GetAtt` consumers depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalFormat {
    Flat,
    Kms,
}

/// Validated parameters for the `principal` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalParams {
    pub account_id: String,
    pub principals: Vec<String>,
    pub format: PrincipalFormat,
}

impl PrincipalParams {
    pub fn from_parameters(parameters: &Map<String, Value>) -> Result<Self, ValidationError> {
        let account_id = string_param(parameters, "Account");
        let principal = string_param(parameters, "Principal");

        let mut missing = Vec::new();
        if account_id.is_none() {
            missing.push("Account");
        }
        if principal.is_none() {
            missing.push("Principal");
        }
        if !missing.is_empty() {
            return Err(ValidationError::new(format!(
                "Principal action missing parameters: {}",
                missing.join(", ")
            )));
        }

        let format = match string_param(parameters, "Type") {
            None => PrincipalFormat::Flat,
            Some(name) if name.eq_ignore_ascii_case("kms") => PrincipalFormat::Kms,
            Some(other) => {
                return Err(ValidationError::new(format!(
                    "Unsupported Type for principal action: {other}"
                )));
            }
        };

        Ok(Self {
            account_id: account_id.unwrap_or_default(),
            principals: principal
                .unwrap_or_default()
                .split(',')
                .map(str::to_string)
                .collect(),
            format,
        })
    }
}

fn string_param(parameters: &Map<String, Value>, key: &str) -> Option<String> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parameters(value: Value) -> Map<String, Value> {
        value
            .as_object()
            .expect("test parameters should be an object")
            .clone()
    }

    #[test]
    fn action_names_match_case_insensitively() {
        assert_eq!(Action::parse("JSON").expect("should parse"), Action::Json);
        assert_eq!(
            Action::parse("S3Notification").expect("should parse"),
            Action::S3Notification
        );
        assert_eq!(Action::parse("byok").expect("should parse"), Action::Byok);
        assert_eq!(
            Action::parse("Principal").expect("should parse"),
            Action::Principal
        );
    }

    #[test]
    fn unrecognized_action_is_an_error() {
        let error = Action::parse("rotatekeys").expect_err("should fail");
        assert_eq!(error.message(), "Unrecognized action: rotatekeys");
    }

    #[test]
    fn event_deserializes_from_cloudformation_shape() {
        let event: CustomResourceEvent = serde_json::from_value(json!({
            "RequestType": "Create",
            "ServiceToken": "arn:aws:lambda:us-east-1:111111111111:function:compliance",
            "ResponseURL": "https://cloudformation.example/callback",
            "StackId": "arn:aws:cloudformation:us-east-1:111111111111:stack/demo/abc",
            "RequestId": "req-1",
            "LogicalResourceId": "ComplianceAction",
            "ResourceProperties": {
                "Action": {
                    "Name": "principal",
                    "Parameters": {"Account": "111111111111", "Principal": "*"}
                }
            }
        }))
        .expect("event should deserialize");

        assert_eq!(event.request_type, RequestType::Create);
        assert_eq!(
            event.response_url.as_deref(),
            Some("https://cloudformation.example/callback")
        );
        let action = event
            .resource_properties
            .action
            .expect("action should be present");
        assert_eq!(action.name.as_deref(), Some("principal"));
        assert_eq!(
            action.parameters.get("Account").and_then(Value::as_str),
            Some("111111111111")
        );
    }

    #[test]
    fn event_tolerates_missing_resource_properties() {
        let event: CustomResourceEvent = serde_json::from_value(json!({
            "RequestType": "Delete",
            "StackId": "stack",
            "RequestId": "req",
            "LogicalResourceId": "logical"
        }))
        .expect("event should deserialize");

        assert_eq!(event.request_type, RequestType::Delete);
        assert!(event.resource_properties.action.is_none());
        assert!(event.response_url.is_none());
    }

    #[test]
    fn callback_status_serializes_to_wire_values() {
        assert_eq!(
            serde_json::to_value(CallbackStatus::Success).expect("should serialize"),
            json!("SUCCESS")
        );
        assert_eq!(
            serde_json::to_value(CallbackStatus::Failed).expect("should serialize"),
            json!("FAILED")
        );
    }

    #[test]
    fn json_params_require_a_target_type() {
        let error = JsonParams::from_parameters(&parameters(json!({"JSON": "a=b"})))
            .expect_err("should fail");
        assert_eq!(error.message(), "Json action missing parameters: Type");
    }

    #[test]
    fn json_params_reject_unknown_target_type() {
        let error =
            JsonParams::from_parameters(&parameters(json!({"JSON": "a=b", "Type": "kinesis"})))
                .expect_err("should fail");
        assert_eq!(error.message(), "Unsupported Type for json action: kinesis");
    }

    #[test]
    fn json_params_default_to_empty_pair_string() {
        let params = JsonParams::from_parameters(&parameters(json!({"Type": "Tags"})))
            .expect("should parse");
        assert_eq!(params.pairs, "");
        assert_eq!(params.target, JsonTarget::Tags);
        assert!(params.queue_url.is_none());
    }

    #[test]
    fn s3_notification_params_name_every_missing_field() {
        let error = S3NotificationParams::from_parameters(&parameters(json!({})))
            .expect_err("should fail");
        assert_eq!(
            error.message(),
            "S3 notification missing parameters: Bucket, Lambda"
        );

        let error = S3NotificationParams::from_parameters(&parameters(
            json!({"Bucket": "audit-logs"}),
        ))
        .expect_err("should fail");
        assert_eq!(error.message(), "S3 notification missing parameters: Lambda");
    }

    #[test]
    fn s3_notification_params_decode_filter_rules() {
        let params = S3NotificationParams::from_parameters(&parameters(json!({
            "Bucket": "audit-logs",
            "Lambda": "arn:aws:lambda:us-east-1:111111111111:function:ingest",
            "FilterRules": [{"Name": "prefix", "Value": "incoming/"}]
        })))
        .expect("should parse");

        assert_eq!(
            params.filter_rules,
            vec![NotificationFilterRule {
                name: "prefix".to_string(),
                value: "incoming/".to_string(),
            }]
        );
    }

    #[test]
    fn s3_notification_params_reject_malformed_filter_rules() {
        let error = S3NotificationParams::from_parameters(&parameters(json!({
            "Bucket": "audit-logs",
            "Lambda": "arn:aws:lambda:us-east-1:111111111111:function:ingest",
            "FilterRules": [{"Name": "prefix"}]
        })))
        .expect_err("should fail");
        assert!(error.message().starts_with("Invalid FilterRules parameter"));
    }

    #[test]
    fn byok_params_require_a_key() {
        let error = ByokParams::from_parameters(&parameters(json!({}))).expect_err("should fail");
        assert_eq!(error.message(), "No encryption key provided");
    }

    #[test]
    fn principal_params_name_every_missing_field() {
        let error =
            PrincipalParams::from_parameters(&parameters(json!({}))).expect_err("should fail");
        assert_eq!(
            error.message(),
            "Principal action missing parameters: Account, Principal"
        );
    }

    #[test]
    fn principal_params_split_the_principal_list() {
        let params = PrincipalParams::from_parameters(&parameters(json!({
            "Account": "111111111111",
            "Principal": "*,222222222222"
        })))
        .expect("should parse");

        assert_eq!(params.principals, vec!["*", "222222222222"]);
        assert_eq!(params.format, PrincipalFormat::Flat);
    }

    #[test]
    fn principal_params_accept_kms_format() {
        let params = PrincipalParams::from_parameters(&parameters(json!({
            "Account": "111111111111",
            "Principal": "{accountid}:root",
            "Type": "kms"
        })))
        .expect("should parse");
        assert_eq!(params.format, PrincipalFormat::Kms);
    }

    #[test]
    fn principal_params_reject_unknown_format() {
        let error = PrincipalParams::from_parameters(&parameters(json!({
            "Account": "111111111111",
            "Principal": "*",
            "Type": "iam"
        })))
        .expect_err("should fail");
        assert_eq!(
            error.message(),
            "Unsupported Type for principal action: iam"
        );
    }

    #[test]
    fn response_data_records_error_text() {
        let mut data = ResponseData::new();
        assert!(data.is_empty());
        data.set_error("describe_key timed out");
        assert_eq!(
            data.get("error"),
            Some(&Value::from("describe_key timed out"))
        );
    }
}

use std::collections::BTreeMap;

use aws_sdk_s3::types::{
    Event, FilterRule, FilterRuleName, LambdaFunctionConfiguration, NotificationConfiguration,
    NotificationConfigurationFilter, S3KeyFilter,
};
use cfn_compliance_lambda::adapters::bucket::BucketNotifier;
use cfn_compliance_lambda::adapters::callback::CallbackTransport;
use cfn_compliance_lambda::adapters::function::{
    FunctionPermissionGranter, InvokePermissionRequest,
};
use cfn_compliance_lambda::adapters::key::{KeyMetadataReader, KeyOrigin};
use cfn_compliance_lambda::adapters::queue::QueueTagger;
use cfn_compliance_lambda::handlers::callback::{callback_headers, deliver_callback};
use cfn_compliance_lambda::handlers::create::{
    handle_event, ActionServices, CreateHandlerConfig, InvocationIdentity,
};
use cfn_compliance_lambda::runtime::contract::{CustomResourceEvent, NotificationFilterRule};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct SqsQueueTagger {
    client: aws_sdk_sqs::Client,
}

impl QueueTagger for SqsQueueTagger {
    fn tag_queue(&self, queue_url: &str, tags: &BTreeMap<String, String>) -> Result<(), String> {
        let client = self.client.clone();
        let queue_url = queue_url.to_string();
        let tags = tags.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut request = client.tag_queue().queue_url(queue_url);
                for (key, value) in tags {
                    request = request.tags(key, value);
                }
                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to tag queue: {error}"))
            })
        })
    }
}

struct LambdaPermissionGranter {
    client: aws_sdk_lambda::Client,
}

impl FunctionPermissionGranter for LambdaPermissionGranter {
    fn allow_bucket_invoke(&self, request: &InvokePermissionRequest) -> Result<(), String> {
        let client = self.client.clone();
        let request = request.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .add_permission()
                    .function_name(request.function_arn)
                    .action("lambda:InvokeFunction")
                    .principal("s3.amazonaws.com")
                    .source_arn(request.bucket_arn)
                    .source_account(request.source_account)
                    .statement_id(request.statement_id)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to grant invoke permission: {error}"))
            })
        })
    }
}

struct S3BucketNotifier {
    client: aws_sdk_s3::Client,
}

impl BucketNotifier for S3BucketNotifier {
    fn put_object_created_notification(
        &self,
        bucket: &str,
        function_arn: &str,
        filter_rules: &[NotificationFilterRule],
    ) -> Result<(), String> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let function_arn = function_arn.to_string();
        let filter_rules = filter_rules.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut configuration = LambdaFunctionConfiguration::builder()
                    .lambda_function_arn(function_arn)
                    .events(Event::from("s3:ObjectCreated:*"));

                if !filter_rules.is_empty() {
                    let mut key_filter = S3KeyFilter::builder();
                    for rule in &filter_rules {
                        key_filter = key_filter.filter_rules(
                            FilterRule::builder()
                                .name(FilterRuleName::from(rule.name.as_str()))
                                .value(rule.value.clone())
                                .build(),
                        );
                    }
                    configuration = configuration.filter(
                        NotificationConfigurationFilter::builder()
                            .key(key_filter.build())
                            .build(),
                    );
                }

                let configuration = configuration
                    .build()
                    .map_err(|error| format!("invalid notification configuration: {error}"))?;

                client
                    .put_bucket_notification_configuration()
                    .bucket(bucket)
                    .notification_configuration(
                        NotificationConfiguration::builder()
                            .lambda_function_configurations(configuration)
                            .build(),
                    )
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to put bucket notification: {error}"))
            })
        })
    }
}

struct KmsKeyMetadataReader {
    client: aws_sdk_kms::Client,
}

impl KeyMetadataReader for KmsKeyMetadataReader {
    fn key_origin(&self, key_id: &str) -> Result<KeyOrigin, String> {
        let client = self.client.clone();
        let key_id = key_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .describe_key()
                    .key_id(key_id)
                    .send()
                    .await
                    .map_err(|error| format!("failed to describe key: {error}"))?;

                let metadata = output
                    .key_metadata()
                    .ok_or_else(|| "describe_key response missing key metadata".to_string())?;

                Ok(match metadata.origin() {
                    Some(aws_sdk_kms::types::OriginType::External) => KeyOrigin::External,
                    Some(other) => KeyOrigin::Other(other.as_str().to_string()),
                    None => KeyOrigin::Other("unknown".to_string()),
                })
            })
        })
    }
}

struct HttpCallbackTransport {
    client: reqwest::Client,
}

impl CallbackTransport for HttpCallbackTransport {
    fn put(&self, url: &str, body: &[u8]) -> Result<(), String> {
        let client = self.client.clone();
        let url = url.to_string();
        let body = body.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut request = client.put(url).body(body.clone());
                for (name, value) in callback_headers(&body) {
                    request = request.header(name, value);
                }

                let response = request
                    .send()
                    .await
                    .map_err(|error| format!("failed to send callback: {error}"))?;

                if !response.status().is_success() {
                    return Err(format!("callback returned status {}", response.status()));
                }
                Ok(())
            })
        })
    }
}

fn account_id_from_arn(invoked_function_arn: &str) -> Option<String> {
    invoked_function_arn
        .split(':')
        .nth(4)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn parse_required_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();

    let parsed: CustomResourceEvent = serde_json::from_value(payload.clone())
        .map_err(|error| Error::from(format!("invalid custom resource event: {error}")))?;

    let identity = InvocationIdentity {
        account_id: account_id_from_arn(&context.invoked_function_arn)
            .ok_or_else(|| Error::from("invoked function ARN is missing an account id"))?,
        log_stream: context.env_config.log_stream.clone(),
    };

    let config = CreateHandlerConfig {
        required_tags: std::env::var("REQUIRED_TAGS")
            .map(|raw| parse_required_tags(&raw))
            .unwrap_or_default(),
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let queue_tagger = SqsQueueTagger {
        client: aws_sdk_sqs::Client::new(&aws_config),
    };
    let permission_granter = LambdaPermissionGranter {
        client: aws_sdk_lambda::Client::new(&aws_config),
    };
    let bucket_notifier = S3BucketNotifier {
        client: aws_sdk_s3::Client::new(&aws_config),
    };
    let key_metadata = KmsKeyMetadataReader {
        client: aws_sdk_kms::Client::new(&aws_config),
    };
    let services = ActionServices {
        queue_tagger: &queue_tagger,
        permission_granter: &permission_granter,
        bucket_notifier: &bucket_notifier,
        key_metadata: &key_metadata,
    };

    let outcome = handle_event(&parsed, &identity, &config, &services);

    let transport = HttpCallbackTransport {
        client: reqwest::Client::new(),
    };
    deliver_callback(&parsed, &identity, &outcome, &transport);

    // CloudFormation consumes the callback, not the return value; the event
    // is handed back unchanged.
    Ok(payload)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}

use cfn_compliance_core::contract::NotificationFilterRule;

pub trait BucketNotifier {
    /// Overwrites the bucket's notification configuration to invoke the
    /// function on all object-created events, optionally scoped by key
    /// filter rules.
    fn put_object_created_notification(
        &self,
        bucket: &str,
        function_arn: &str,
        filter_rules: &[NotificationFilterRule],
    ) -> Result<(), String>;
}

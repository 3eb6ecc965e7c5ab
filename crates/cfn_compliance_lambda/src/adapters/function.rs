/// Invoke-permission grant scoped to one bucket and the invoking account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokePermissionRequest {
    pub function_arn: String,
    pub bucket_arn: String,
    pub source_account: String,
    pub statement_id: String,
}

pub trait FunctionPermissionGranter {
    fn allow_bucket_invoke(&self, request: &InvokePermissionRequest) -> Result<(), String>;
}

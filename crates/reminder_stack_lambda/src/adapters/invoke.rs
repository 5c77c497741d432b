pub trait FunctionInvoker {
    /// Fire-and-forget invocation; returns once the request is queued.
    fn invoke_async(&self, function_name: &str, payload: &[u8]) -> Result<(), String>;
}

pub trait WorkflowStarter {
    /// Starts an execution and returns its ARN.
    fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String, String>;
}

use core_types::Execution;

/// Append-only record of every fill.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    executions: Vec<Execution>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, execution: Execution) {
        self.executions.push(execution);
    }

    /// Fills on `symbol`, oldest first.
    pub fn for_symbol(&self, symbol: &str) -> Vec<Execution> {
        self.executions
            .iter()
            .filter(|execution| execution.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> &[Execution] {
        &self.executions
    }
}

pub mod project;
pub mod scenario;
pub mod sensitivity;

use buildout_core::ComputationOutput;
use serde::Serialize;
use serde_json::Value;

pub type CommandResult = Result<Value, Box<dyn std::error::Error>>;

/// Re-wrap a computation for the output formatters: `result` is printed as a
/// field/value table, `results` as a row table.
pub fn envelope<T: Serialize>(output: &ComputationOutput<T>, result: Value, results: Value) -> Value {
    serde_json::json!({
        "result": result,
        "results": results,
        "methodology": output.methodology,
        "warnings": output.warnings,
        "metadata": output.metadata,
    })
}

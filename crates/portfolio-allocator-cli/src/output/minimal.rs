use serde_json::Value;

/// Result fields printed in preference order when there are no allocations.
const PRIORITY_KEYS: [&str; 3] = ["sharpe_ratio", "expected_return", "expected_risk"];

/// Print just the answer: one `ASSET WEIGHT` line per allocation, else the
/// first populated priority field, else the first field of the result.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{}", line);
    }
}

fn minimal_lines(value: &Value) -> Vec<String> {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let Value::Object(map) = result_obj else {
        return vec![format_minimal(result_obj)];
    };

    if let Some(Value::Array(allocations)) = map.get("optimized_allocations") {
        return allocations
            .iter()
            .map(|a| format!("{} {}", format_minimal(&a["asset"]), format_minimal(&a["weight"])))
            .collect();
    }

    // OptimizationResult carries its portfolio flattened beside "status".
    for key in PRIORITY_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return vec![format_minimal(val)];
        }
    }

    map.iter()
        .next()
        .map(|(key, val)| vec![format!("{}: {}", key, format_minimal(val))])
        .unwrap_or_default()
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
///
/// Scalar result fields go in a Field/Value table. Arrays of objects
/// (allocations, frontier points) and matrices each get their own table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => {
            print_flat_object(res_map);
            for (key, val) in res_map {
                if let Value::Array(arr) = val {
                    if is_nested(arr) {
                        println!("\n{}:", key);
                        print_array_table(arr);
                    }
                }
            }
        }
        _ => print_flat_object(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(|w| w.as_str()) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Arrays holding objects or rows are rendered separately.
fn is_nested(arr: &[Value]) -> bool {
    matches!(arr.first(), Some(Value::Object(_)) | Some(Value::Array(_)))
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if let Value::Array(arr) = val {
            if is_nested(arr) {
                continue;
            }
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    let mut builder = Builder::default();
    match arr.first() {
        Some(Value::Object(first)) => {
            let headers: Vec<String> = first.keys().cloned().collect();
            builder.push_record(&headers);
            for item in arr {
                if let Value::Object(map) = item {
                    let row: Vec<String> = headers
                        .iter()
                        .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                        .collect();
                    builder.push_record(row);
                }
            }
        }
        Some(Value::Array(_)) => {
            for row in arr {
                if let Value::Array(cells) = row {
                    builder.push_record(cells.iter().map(format_value).collect::<Vec<_>>());
                }
            }
        }
        _ => {
            for item in arr {
                println!("{}", format_value(item));
            }
            return;
        }
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

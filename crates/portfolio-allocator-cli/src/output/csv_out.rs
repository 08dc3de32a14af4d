use serde_json::Value;
use std::io;

/// Result fields written as row tables rather than field/value pairs.
const ROW_FIELDS: [&str; 2] = ["optimized_allocations", "points"];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    write_csv(stdout.lock(), value);
}

fn write_csv<W: io::Write>(out: W, value: &Value) {
    // Row tables and the field/value block after them differ in width.
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(out);

    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => {
                let rows = ROW_FIELDS
                    .iter()
                    .find_map(|f| result.get(*f).and_then(|v| v.as_array()));
                match rows {
                    Some(rows) => {
                        write_array_csv(&mut wtr, rows);
                        let scalars: serde_json::Map<String, Value> = result
                            .iter()
                            .filter(|(k, _)| !ROW_FIELDS.contains(&k.as_str()))
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect();
                        if !scalars.is_empty() {
                            write_fields(&mut wtr, &scalars);
                        }
                    }
                    None => write_fields(&mut wtr, result),
                }
            }
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &serde_json::Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allocations_written_as_rows() {
        let rows = json!([
            {"asset": "BTC", "weight": "0.6"},
            {"asset": "USDC", "weight": "0.4"}
        ]);
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_array_csv(&mut wtr, rows.as_array().unwrap());
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text, "asset,weight\nBTC,0.6\nUSDC,0.4\n");
    }

    #[test]
    fn test_allocation_output_keeps_summary_fields() {
        let value = json!({"result": {
            "optimized_allocations": [
                {"asset": "ETH", "weight": "0.3195"},
                {"asset": "USDC", "weight": "0.6805"}
            ],
            "expected_return": "0.1071",
            "expected_risk": "0.2742",
            "sharpe_ratio": "0.3906"
        }});
        let mut buf = Vec::new();
        write_csv(&mut buf, &value);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "asset,weight\nETH,0.3195\nUSDC,0.6805\n\
             field,value\nexpected_return,0.1071\nexpected_risk,0.2742\nsharpe_ratio,0.3906\n"
        );
    }

    #[test]
    fn test_plain_result_as_fields() {
        let value = json!({"result": {"status": "failure", "reason": "not PSD"}});
        let mut buf = Vec::new();
        write_csv(&mut buf, &value);
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "field,value\nreason,not PSD\nstatus,failure\n");
    }
}

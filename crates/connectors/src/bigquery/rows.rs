//! Decoding of `rows[].f[].v` cells into typed JSON values using the result schema.

use chrono::DateTime;
use serde_json::{Map, Number, Value};

use super::api::FieldSchema;

pub fn decode_rows(fields: &[FieldSchema], rows: &[Value]) -> Vec<Map<String, Value>> {
    rows.iter().map(|row| decode_record(fields, row)).collect()
}

fn decode_record(fields: &[FieldSchema], record: &Value) -> Map<String, Value> {
    let cells = record
        .get("f")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    fields
        .iter()
        .zip(cells.iter().chain(std::iter::repeat(&Value::Null)))
        .map(|(field, cell)| {
            let raw = cell.get("v").unwrap_or(&Value::Null);
            (field.name.clone(), decode_cell(field, raw))
        })
        .collect()
}

fn decode_cell(field: &FieldSchema, raw: &Value) -> Value {
    if raw.is_null() {
        return Value::Null;
    }
    if field.is_repeated() {
        let items = raw.as_array().map(Vec::as_slice).unwrap_or_default();
        return Value::Array(
            items
                .iter()
                .map(|item| decode_scalar(field, item.get("v").unwrap_or(&Value::Null)))
                .collect(),
        );
    }
    decode_scalar(field, raw)
}

fn decode_scalar(field: &FieldSchema, raw: &Value) -> Value {
    if raw.is_null() {
        return Value::Null;
    }
    match field.field_type.as_str() {
        "RECORD" | "STRUCT" => Value::Object(decode_record(&field.fields, raw)),
        "INTEGER" | "INT64" => raw
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|| raw.clone()),
        "FLOAT" | "FLOAT64" => raw
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| raw.clone()),
        "BOOLEAN" | "BOOL" => match raw.as_str() {
            Some("true") => Value::Bool(true),
            Some("false") => Value::Bool(false),
            _ => raw.clone(),
        },
        "TIMESTAMP" => raw
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .and_then(|secs| DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64))
            .map(|ts| Value::String(ts.to_rfc3339()))
            .unwrap_or_else(|| raw.clone()),
        _ => raw.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, ty: &str) -> FieldSchema {
        FieldSchema {
            name: name.to_string(),
            field_type: ty.to_string(),
            mode: None,
            fields: vec![],
        }
    }

    #[test]
    fn test_decode_scalars() {
        let fields = vec![
            field("SQLDATE", "INTEGER"),
            field("Actor1Name", "STRING"),
            field("GoldsteinScale", "FLOAT"),
            field("IsRootEvent", "BOOLEAN"),
            field("Missing", "STRING"),
        ];
        let rows = vec![json!({"f": [
            {"v": "20250115"}, {"v": "UKRAINE"}, {"v": "-10.0"}, {"v": "true"}, {"v": null}
        ]})];

        let decoded = decode_rows(&fields, &rows);
        assert_eq!(decoded.len(), 1);
        let row = &decoded[0];
        assert_eq!(row["SQLDATE"], json!(20250115));
        assert_eq!(row["Actor1Name"], json!("UKRAINE"));
        assert_eq!(row["GoldsteinScale"], json!(-10.0));
        assert_eq!(row["IsRootEvent"], json!(true));
        assert_eq!(row["Missing"], Value::Null);
    }

    #[test]
    fn test_decode_timestamp_record_and_repeated() {
        let mut labels = field("labels", "STRING");
        labels.mode = Some("REPEATED".to_string());
        let mut loc = field("loc", "RECORD");
        loc.fields = vec![field("lat", "FLOAT"), field("lon", "FLOAT")];
        let fields = vec![field("ts", "TIMESTAMP"), labels, loc];

        let rows = vec![json!({"f": [
            {"v": "1.7356896E9"},
            {"v": [{"v": "protest"}, {"v": "crowd"}]},
            {"v": {"f": [{"v": "50.45"}, {"v": "30.52"}]}}
        ]})];

        let row = &decode_rows(&fields, &rows)[0];
        assert_eq!(row["ts"], json!("2025-01-01T00:00:00+00:00"));
        assert_eq!(row["labels"], json!(["protest", "crowd"]));
        assert_eq!(row["loc"], json!({"lat": 50.45, "lon": 30.52}));
    }

    #[test]
    fn test_short_row_pads_with_null() {
        let fields = vec![field("a", "STRING"), field("b", "STRING")];
        let rows = vec![json!({"f": [{"v": "x"}]})];
        let row = &decode_rows(&fields, &rows)[0];
        assert_eq!(row["b"], Value::Null);
    }
}

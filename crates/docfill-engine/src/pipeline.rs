/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Expression evaluation: a path head followed by `|`-chained operators.
//!
//! `orders|sort:amount:desc|take:2` resolves `orders`, stable-sorts the
//! array by each item's `amount`, reverses, and keeps the first two items.
//! Operators never alias the caller's values; anything they return is a
//! fresh value.

use std::cmp::Ordering;

use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::format::{format_datetime, format_number, parse_datetime};
use crate::path::{resolve, resolve_from, PathExpr};
use crate::value::Value;

/// Evaluate an expression against the context chain.
pub fn evaluate(raw: &str, ctx: &Context) -> RenderResult<Value> {
    let mut segments = raw.split('|').filter(|s| !s.trim().is_empty());
    let head = match segments.next() {
        Some(head) => head,
        None => return Ok(Value::Null),
    };

    let path = PathExpr::parse(head)?;
    let mut value = resolve(&path, ctx).clone();
    for segment in segments {
        let mut parts = segment.split(':');
        let name = parts.next().unwrap_or("").trim().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();
        value = apply_operator(&name, &args, value)?;
    }
    Ok(value)
}

fn apply_operator(name: &str, args: &[&str], operand: Value) -> RenderResult<Value> {
    match name {
        "sort" => op_sort(args, operand),
        "take" => op_take(args, operand),
        "first" => Ok(with_array(operand, |items| {
            items.first().cloned().unwrap_or(Value::Null)
        })),
        "last" => Ok(with_array(operand, |items| {
            items.last().cloned().unwrap_or(Value::Null)
        })),
        "nth" => op_nth(args, operand),
        "at" => op_at(args, operand),
        "maxby" => op_extreme_by("maxby", args, operand, Ordering::Greater),
        "minby" => op_extreme_by("minby", args, operand, Ordering::Less),
        "get" | "pick" => op_get(name, args, operand),
        "count" => Ok(Value::Int(operand.count())),
        "if" => op_if(args, operand),
        "format" => op_format(args, operand),
        other => Err(RenderError::UnknownOperator(other.to_string())),
    }
}

/// Apply `f` to the operand's items if it is an array; other operands pass
/// through unchanged.
fn with_array(operand: Value, f: impl FnOnce(&[Value]) -> Value) -> Value {
    match &operand {
        Value::Array(items) => f(items),
        _ => operand,
    }
}

fn required_arg<'a>(operator: &str, args: &[&'a str], what: &str) -> RenderResult<&'a str> {
    match args.first().map(|a| a.trim()) {
        Some(arg) if !arg.is_empty() => Ok(args[0]),
        _ => Err(RenderError::op_arg(
            operator,
            format!("missing {} argument", what),
        )),
    }
}

fn int_arg(operator: &str, raw: &str) -> RenderResult<i64> {
    raw.trim().parse().map_err(|_| {
        RenderError::op_arg(operator, format!("'{}' is not an integer", raw.trim()))
    })
}

fn op_sort(args: &[&str], operand: Value) -> RenderResult<Value> {
    let key = PathExpr::parse(required_arg("sort", args, "key")?)?;
    let descending = match args.get(1).map(|a| a.trim().to_ascii_lowercase()) {
        None => false,
        Some(dir) if dir == "asc" => false,
        Some(dir) if dir == "desc" => true,
        Some(dir) => {
            return Err(RenderError::op_arg(
                "sort",
                format!("direction must be 'asc' or 'desc', got '{}'", dir),
            ))
        }
    };

    Ok(with_array(operand, |items| {
        let mut sorted = items.to_vec();
        sorted.sort_by(|a, b| compare_values(resolve_from(a, &key), resolve_from(b, &key)));
        if descending {
            sorted.reverse();
        }
        Value::Array(sorted)
    }))
}

fn op_take(args: &[&str], operand: Value) -> RenderResult<Value> {
    let n = int_arg("take", required_arg("take", args, "count")?)?;
    Ok(with_array(operand, |items| {
        if n <= 0 {
            Value::Array(Vec::new())
        } else {
            Value::Array(items.iter().take(n as usize).cloned().collect())
        }
    }))
}

fn op_nth(args: &[&str], operand: Value) -> RenderResult<Value> {
    let n = int_arg("nth", required_arg("nth", args, "position")?)?;
    Ok(with_array(operand, |items| {
        if n < 1 {
            return Value::Null;
        }
        items.get((n - 1) as usize).cloned().unwrap_or(Value::Null)
    }))
}

fn op_at(args: &[&str], operand: Value) -> RenderResult<Value> {
    let i = int_arg("at", required_arg("at", args, "index")?)?;
    Ok(with_array(operand, |items| {
        let index = if i < 0 { items.len() as i64 + i } else { i };
        usize::try_from(index)
            .ok()
            .and_then(|idx| items.get(idx))
            .cloned()
            .unwrap_or(Value::Null)
    }))
}

fn op_extreme_by(
    operator: &str,
    args: &[&str],
    operand: Value,
    wanted: Ordering,
) -> RenderResult<Value> {
    let key = PathExpr::parse(required_arg(operator, args, "key")?)?;
    Ok(with_array(operand, |items| {
        let mut best: Option<&Value> = None;
        for item in items {
            match best {
                None => best = Some(item),
                Some(current) => {
                    let ord =
                        compare_values(resolve_from(item, &key), resolve_from(current, &key));
                    // Ties keep the earliest item.
                    if ord == wanted {
                        best = Some(item);
                    }
                }
            }
        }
        best.cloned().unwrap_or(Value::Null)
    }))
}

fn op_get(operator: &str, args: &[&str], operand: Value) -> RenderResult<Value> {
    let path = PathExpr::parse(required_arg(operator, args, "path")?)?;
    Ok(resolve_from(&operand, &path).clone())
}

fn op_if(args: &[&str], operand: Value) -> RenderResult<Value> {
    let true_text = required_arg("if", args, "text")?;
    let false_text = args.get(1).copied().unwrap_or("");
    Ok(Value::String(
        if operand.is_truthy() { true_text } else { false_text }.to_string(),
    ))
}

fn op_format(args: &[&str], operand: Value) -> RenderResult<Value> {
    let kind = required_arg("format", args, "kind")?.trim().to_ascii_lowercase();
    // Patterns may themselves contain `:` (e.g. `HH:mm:ss`).
    let pattern = args[1..].join(":");

    let text = match kind.as_str() {
        "number" | "numeric" => match coerce_number(&operand) {
            Some(n) => format_number(n, &pattern),
            None => operand.to_text(),
        },
        "percent" => match coerce_number(&operand) {
            Some(n) => format!("{}%", format_number(n * 100.0, &pattern)),
            None => operand.to_text(),
        },
        "permille" => match coerce_number(&operand) {
            Some(n) => format!("{}‰", format_number(n * 1000.0, &pattern)),
            None => operand.to_text(),
        },
        "date" | "datetime" | "time" => match parse_datetime(&operand.to_text()) {
            Some(dt) => format_datetime(dt, &pattern),
            None => operand.to_text(),
        },
        other => {
            return Err(RenderError::op_arg(
                "format",
                format!("unknown format kind '{}'", other),
            ))
        }
    };
    Ok(Value::String(text))
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(_) | Value::Float(_) => value.as_number(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ordering used by `sort`, `maxby`, and `minby`.
///
/// Null sorts before everything. Two numbers compare numerically; two
/// values that both parse as date/times compare chronologically; anything
/// else compares textually, case-insensitive.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }

    let (ta, tb) = (a.to_text(), b.to_text());
    if let (Some(da), Some(db)) = (parse_datetime(&ta), parse_datetime(&tb)) {
        return da.cmp(&db);
    }

    ta.to_lowercase().cmp(&tb.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(json: &str) -> Value {
        Value::from_json(serde_json::from_str(json).unwrap())
    }

    fn eval(expr: &str, root: &Value) -> RenderResult<Value> {
        let ctx = Context::new(root);
        evaluate(expr, &ctx)
    }

    fn eval_text(expr: &str, root: &Value) -> String {
        eval(expr, root).unwrap().to_text()
    }

    fn orders() -> Value {
        value(
            r#"{"orders":[
                {"id":"ORD-001","amount":12.5},
                {"id":"ORD-002","amount":100},
                {"id":"ORD-003","amount":66.2}
            ]}"#,
        )
    }

    #[test]
    fn test_plain_path() {
        let root = value(r#"{"patient":{"name":"Alice"}}"#);
        assert_eq!(eval_text("patient.name", &root), "Alice");
    }

    #[test]
    fn test_sort_and_take_order() {
        let root = orders();
        let result = eval("orders|sort:amount:desc|take:2", &root).unwrap();
        let Value::Array(items) = result else { panic!() };
        let ids: Vec<String> = items
            .iter()
            .map(|o| resolve_from(o, &PathExpr::parse("id").unwrap()).to_text())
            .collect();
        assert_eq!(ids, ["ORD-002", "ORD-003"]);
    }

    #[test]
    fn test_sort_desc_is_reverse_of_asc() {
        let root = value(r#"{"xs":[{"k":2,"tag":"a"},{"k":1},{"k":2,"tag":"b"},{"k":3}]}"#);
        let asc = eval("xs|sort:k:asc", &root).unwrap();
        let desc = eval("xs|sort:k:desc", &root).unwrap();
        let Value::Array(mut asc_items) = asc else { panic!() };
        let Value::Array(desc_items) = desc else { panic!() };
        asc_items.reverse();
        assert_eq!(asc_items, desc_items);
    }

    #[test]
    fn test_sort_does_not_alias_source() {
        let root = orders();
        eval("orders|sort:amount:desc", &root).unwrap();
        // The source array is untouched.
        assert_eq!(
            eval_text("orders[0].id", &root),
            "ORD-001"
        );
    }

    #[test]
    fn test_sort_requires_key() {
        assert!(matches!(
            eval("orders|sort", &orders()),
            Err(RenderError::InvalidOperatorArg { .. })
        ));
    }

    #[test]
    fn test_take_bounds() {
        let root = orders();
        assert_eq!(eval("orders|take:0", &root).unwrap(), Value::Array(vec![]));
        let Value::Array(all) = eval("orders|take:99", &root).unwrap() else { panic!() };
        assert_eq!(all.len(), 3);
        assert!(matches!(
            eval("orders|take:x", &root),
            Err(RenderError::InvalidOperatorArg { .. })
        ));
    }

    #[test]
    fn test_first_last_nth_at() {
        let root = value(r#"{"xs":["a","b","c"]}"#);
        assert_eq!(eval_text("xs|first", &root), "a");
        assert_eq!(eval_text("xs|last", &root), "c");
        assert_eq!(eval_text("xs|nth:2", &root), "b");
        assert_eq!(eval("xs|nth:9", &root).unwrap(), Value::Null);
        assert_eq!(eval_text("xs|at:0", &root), "a");
        assert_eq!(eval_text("xs|at:-1", &root), "c");
        assert_eq!(eval("xs|at:5", &root).unwrap(), Value::Null);
        assert_eq!(eval("xs|at:-4", &root).unwrap(), Value::Null);

        let empty = value(r#"{"xs":[]}"#);
        assert_eq!(eval("xs|first", &empty).unwrap(), Value::Null);
        assert_eq!(eval("xs|last", &empty).unwrap(), Value::Null);
    }

    #[test]
    fn test_maxby_minby() {
        let root = orders();
        assert_eq!(eval_text("orders|maxby:amount|get:id", &root), "ORD-002");
        assert_eq!(eval_text("orders|minby:amount|get:id", &root), "ORD-001");

        let empty = value(r#"{"xs":[]}"#);
        assert_eq!(eval("xs|maxby:k", &empty).unwrap(), Value::Null);
    }

    #[test]
    fn test_maxby_tie_keeps_first() {
        let root = value(r#"{"xs":[{"k":1,"n":"one"},{"k":5,"n":"first"},{"k":5,"n":"second"}]}"#);
        assert_eq!(eval_text("xs|maxby:k|get:n", &root), "first");
    }

    #[test]
    fn test_get_projects_inside_operand() {
        let root = value(r#"{"report":{"summary":{"title":"Q3"}}}"#);
        assert_eq!(eval_text("report|get:summary.title", &root), "Q3");
        assert_eq!(eval_text("report|pick:summary.title", &root), "Q3");
    }

    #[test]
    fn test_count() {
        let root = value(r#"{"xs":[1,2,3],"o":{"a":1},"s":"abcd","n":null,"i":5}"#);
        assert_eq!(eval_text("xs|count", &root), "3");
        assert_eq!(eval_text("o|count", &root), "1");
        assert_eq!(eval_text("s|count", &root), "4");
        assert_eq!(eval_text("n|count", &root), "0");
        assert_eq!(eval_text("i|count", &root), "1");
        assert_eq!(eval_text("missing|count", &root), "0");
    }

    #[test]
    fn test_if_operator() {
        let root = value(r#"{"vip":true,"plain":false}"#);
        assert_eq!(eval_text("vip|if:Yes:No", &root), "Yes");
        assert_eq!(eval_text("plain|if:Yes:No", &root), "No");
        assert_eq!(eval_text("plain|if:Yes", &root), "");
    }

    #[test]
    fn test_format_number() {
        let root = value(r#"{"amount":100,"g":0.0123,"b":0.0045,"word":"n/a"}"#);
        assert_eq!(eval_text("amount|format:number:0.00", &root), "100.00");
        assert_eq!(eval_text("g|format:number:0.00%", &root), "1.23%");
        assert_eq!(eval_text("g|format:percent:0.00", &root), "1.23%");
        assert_eq!(eval_text("b|format:permille:0.00", &root), "4.50‰");
        // Not coercible: degrade to the textual rendering.
        assert_eq!(eval_text("word|format:number:0.00", &root), "n/a");
    }

    #[test]
    fn test_format_date() {
        let root = value(r#"{"createdAt":"2026-02-24T10:11:12Z","month":"2025-05"}"#);
        assert_eq!(
            eval_text("createdAt|format:date:yyyy-MM-dd", &root),
            "2026-02-24"
        );
        assert_eq!(eval_text("month|format:date:yyyy年M月", &root), "2025年5月");
        assert_eq!(eval_text("createdAt|format:time:HH:mm:ss", &root), "10:11:12");
    }

    #[test]
    fn test_format_errors() {
        let root = value(r#"{"x":1}"#);
        assert!(matches!(
            eval("x|format", &root),
            Err(RenderError::InvalidOperatorArg { .. })
        ));
        assert!(matches!(
            eval("x|format:roman:I", &root),
            Err(RenderError::InvalidOperatorArg { .. })
        ));
    }

    #[test]
    fn test_unknown_operator() {
        assert!(matches!(
            eval("orders|explode", &orders()),
            Err(RenderError::UnknownOperator(_))
        ));
    }

    #[test]
    fn test_operator_names_case_insensitive() {
        let root = orders();
        assert_eq!(eval_text("orders|MAXBY:amount|Get:id", &root), "ORD-002");
    }

    #[test]
    fn test_empty_pipeline_segments_discarded() {
        let root = value(r#"{"xs":["a"]}"#);
        assert_eq!(eval_text("xs||first|", &root), "a");
    }

    #[test]
    fn test_sort_by_date_strings() {
        let root = value(
            r#"{"m":[{"month":"2025-07"},{"month":"2025-01"},{"month":"2025-05"}]}"#,
        );
        assert_eq!(
            eval_text("m|sort:month:asc|first|get:month", &root),
            "2025-01"
        );
        assert_eq!(
            eval_text("m|sort:month:asc|last|get:month", &root),
            "2025-07"
        );
    }

    #[test]
    fn test_compare_null_sorts_first() {
        let root = value(r#"{"xs":[{"k":2},{"z":1},{"k":1}]}"#);
        let Value::Array(items) = eval("xs|sort:k", &root).unwrap() else { panic!() };
        // The item without `k` (null key) comes first.
        assert!(resolve_from(&items[0], &PathExpr::parse("k").unwrap()).is_null());
    }

    #[test]
    fn test_compare_text_case_insensitive() {
        let root = value(r#"{"xs":[{"n":"beta"},{"n":"Alpha"}]}"#);
        assert_eq!(eval_text("xs|sort:n|first|get:n", &root), "Alpha");
    }

    #[test]
    fn test_ranking_scenario() {
        // 11 institutions, descending revenue 1e6 … 1e5 step -90000 except last.
        let mut items = Vec::new();
        for (i, name) in ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K"]
            .iter()
            .enumerate()
        {
            items.push(serde_json::json!({
                "name": format!("机构{}", name),
                "revenue": 1_000_000 - (i as i64) * 90_000,
            }));
        }
        let root = Value::from_json(serde_json::json!({ "inst": items }));

        assert_eq!(
            eval_text("inst|sort:revenue:desc|take:10|nth:3|get:name", &root),
            "机构C"
        );
        assert_eq!(
            eval_text("inst|sort:revenue:desc|take:10|at:-1|get:name", &root),
            "机构J"
        );
    }
}

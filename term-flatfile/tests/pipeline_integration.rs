//! End-to-end runs of the record validator over JSON-declared layouts.

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use term_flatfile::context::{
    move_dup_values_from_context, restore_values_to_context, ContextValue,
};
use term_flatfile::core::{RecordConfig, RecordSet, Severity, ValidationType};
use term_flatfile::prelude::*;
use term_flatfile::validators::LookupBackend;

/// Reference tables keyed by the rule's `table` parameter.
#[derive(Debug)]
struct ReferenceTables {
    tables: HashMap<String, Vec<String>>,
}

impl ReferenceTables {
    fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert(
            "branches".to_string(),
            vec!["B01".to_string(), "B02".to_string()],
        );
        Self { tables }
    }
}

impl LookupBackend for ReferenceTables {
    fn lookup(&self, kind: ValidationType, params: &serde_json::Value, value: &str) -> Result<bool> {
        let table = params["table"].as_str().unwrap_or_default();
        let rows = self.tables.get(table).ok_or_else(|| {
            TermError::lookup_failed(kind.as_str(), format!("unknown table '{table}'"))
        })?;
        Ok(rows.iter().any(|row| row == value))
    }
}

fn transaction_layout() -> RecordConfig {
    serde_json::from_value(json!({
        "name": "transaction",
        "fields": [
            {"fieldName": "branch", "dataType": "A/N", "length": 3,
             "validations": [{"type": "DB", "severity": "WARNING", "params": {"table": "branches"}}]},
            {"fieldName": "date", "dataType": "n",
             "validations": [{"type": "DATE", "params": {"format": "%Y%m%d"}}]},
            {"fieldName": "kind", "dataType": "any", "alignment": "L",
             "validations": [{"type": "IN", "params": {"values": "DEP|WDR"},
                              "errorMessage": "unknown transaction kind"}]},
            {"fieldName": "sign", "dataType": "*"},
            {"fieldName": "amount", "dataType": "numeric", "alignment": "R"}
        ],
        "mapFunctions": [
            {"fieldName": "amount", "function": "AGGREGATE", "mapTo": "net", "signField": "sign"},
            {"fieldName": "amount", "function": "MAX", "mapTo": "largestDeposit",
             "condition": "${kind} = DEP"},
            {"fieldName": "amount", "function": "AVERAGE", "mapTo": "avgAmount"},
            {"fieldName": "kind", "function": "COUNT", "mapTo": "withdrawals",
             "condition": "${kind} = WDR & ${net} > 0"}
        ]
    }))
    .unwrap()
}

fn records(layout: &RecordConfig, rows: &[[&str; 5]]) -> RecordSet {
    RecordSet::from_rows(
        layout,
        rows.iter()
            .map(|row| row.iter().map(|v| Some(v.to_string())).collect::<Vec<_>>()),
    )
    .unwrap()
}

fn validator() -> RecordValidator {
    RecordValidator::builder()
        .lookup_backend(Arc::new(ReferenceTables::new()))
        .log_config(LogConfig::verbose())
        .build()
}

#[test]
fn test_clean_file_passes() {
    let layout = transaction_layout();
    let mut set = records(
        &layout,
        &[
            ["B01", "20240105", "DEP", "+", "00150.00"],
            ["B02", "20240106", "WDR", "-", "  40.00"],
            ["B01", "20240107", "DEP", "", "10"],
        ],
    );
    let mut ctx = InMemoryContext::new();

    let report = validator().run(&mut ctx, &layout, &mut set).unwrap();

    assert!(report.is_success(), "{:?}", report.issues);
    assert!(report.issues.is_empty());

    let values = set.map_values();
    assert_eq!(values.get("net").unwrap().to_string(), "120.00");
    assert_eq!(values.get("largestDeposit").unwrap().to_string(), "150.00");
    assert_eq!(values.get("withdrawals").unwrap().to_string(), "1");
    let avg = values.accumulator("avgAmount").unwrap();
    assert_eq!(avg.counter(), 3);
    assert_eq!(avg.value().round(2).to_string(), "66.67");
}

#[test]
fn test_issues_are_stamped_and_typed() {
    let layout = transaction_layout();
    let mut set = records(
        &layout,
        &[
            ["B01", "20240105", "DEP", "", "5"],
            ["B09", "2024-01-06", " XFR", "", "7"],
            ["B01", "20240107", "DEP", "", "12A"],
        ],
    );
    let mut ctx = InMemoryContext::new();

    let report = validator().run(&mut ctx, &layout, &mut set).unwrap();

    assert!(!report.is_success());
    assert!(report.issues_for_line(1).is_empty());

    let line_two: Vec<(&str, &str, Severity)> = report
        .issues_for_line(2)
        .iter()
        .map(|i| (i.field_name.as_str(), i.validation_type.as_str(), i.severity))
        .collect();
    assert_eq!(
        line_two,
        vec![
            ("branch", "DB", Severity::Warning),
            ("date", "DATATYPE", Severity::Error),
            ("date", "DATE", Severity::Error),
            ("kind", "ALIGNMENT", Severity::Error),
            ("kind", "IN", Severity::Error),
        ]
    );
    assert_eq!(report.issues_for_line(2)[4].message, "unknown transaction kind");

    let line_three = report.issues_for_line(3);
    assert_eq!(line_three.len(), 1);
    assert_eq!(line_three[0].validation_type, "DATATYPE");

    // the non-numeric amount on line 3 stays out of every aggregate
    assert_eq!(set.map_values().get("net").unwrap().to_string(), "12");
    assert_eq!(set.map_values().accumulator("avgAmount").unwrap().counter(), 2);
    assert_eq!(set.errors().len(), report.issues.len());
}

#[test]
fn test_warnings_alone_do_not_fail() {
    let layout = transaction_layout();
    let mut set = records(&layout, &[["B77", "20240105", "DEP", "", "1"]]);

    let report = validator()
        .run(&mut InMemoryContext::new(), &layout, &mut set)
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.issues_by_severity(Severity::Warning).len(), 1);
}

#[test]
fn test_context_holds_no_field_values_after_run() {
    let layout = transaction_layout();
    let mut set = records(&layout, &[["B01", "20240105", "DEP", "-", "3"]]);
    let mut ctx = InMemoryContext::new();

    validator().run(&mut ctx, &layout, &mut set).unwrap();

    for name in ["branch", "date", "kind", "sign", "amount"] {
        assert!(!ctx.has_data(name), "{name} leaked into the context");
    }
    assert_eq!(
        ctx.get_object_data("net").and_then(ContextValue::as_decimal),
        Some(0.into())
    );
}

#[test]
fn test_nested_run_restores_outer_context() {
    let layout = transaction_layout();
    let mut ctx = InMemoryContext::new();
    ctx.set_data("net", "outer-net".into());
    ctx.set_data("kind", "outer-kind".into());

    let mut outer = records(&layout, &[["B01", "20240105", "DEP", "", "10"]]);
    let mut inner = records(&layout, &[["B02", "20240106", "DEP", "", "99"]]);

    // an enclosing caller protects its own entries around the inner run
    let dup = move_dup_values_from_context(&ctx, [&layout]);
    validator().run(&mut ctx, &layout, &mut inner).unwrap();
    restore_values_to_context(&mut ctx, &dup);

    assert_eq!(ctx.get_object_data("net"), Some(&ContextValue::from("outer-net")));
    assert_eq!(ctx.get_object_data("kind"), Some(&ContextValue::from("outer-kind")));
    assert!(ctx.steps().iter().any(|s| s.contains("'net' is restored")));

    let validator = validator();
    validator.run_nested(&mut ctx, &layout, &mut outer).unwrap();
    assert_eq!(outer.map_values().get("net").unwrap().to_string(), "10");
    assert_eq!(inner.map_values().get("net").unwrap().to_string(), "99");
    assert_eq!(ctx.get_object_data("net"), Some(&ContextValue::from("outer-net")));
}

#[test]
fn test_configuration_faults_abort() {
    let mut layout = transaction_layout();
    layout.map_functions[0].sign_field = Some("missing".to_string());
    let mut set = records(&layout, &[["B01", "20240105", "DEP", "", "1"]]);
    let mut ctx = InMemoryContext::new();

    let err = validator().run(&mut ctx, &layout, &mut set).unwrap_err();
    assert!(matches!(err, TermError::Configuration(_)));
    assert!(!ctx.has_data("amount"));
}

#[test]
fn test_lookup_fault_aborts() {
    let layout: RecordConfig = serde_json::from_value(json!({
        "fields": [
            {"fieldName": "code", "validations": [{"type": "SQL", "params": {"table": "nope"}}]}
        ]
    }))
    .unwrap();
    let mut set = RecordSet::from_rows(&layout, vec![vec![Some("X".to_string())]]).unwrap();

    let err = validator()
        .run(&mut InMemoryContext::new(), &layout, &mut set)
        .unwrap_err();
    assert!(matches!(err, TermError::LookupFailed { ref kind, .. } if kind == "SQL"));
}

#[test]
fn test_unknown_data_type_alias_is_rejected() {
    let err = RecordConfig::from_json(
        &json!({"fields": [{"fieldName": "x", "dataType": "decimal"}]}).to_string(),
    )
    .unwrap_err();
    assert!(matches!(err, TermError::Serialization(_)));
}

#[test]
fn test_huge_exponent_amount_aborts() {
    let layout = RecordConfig::from_json(
        &json!({
            "fields": [{"fieldName": "reading", "dataType": "any"}],
            "mapFunctions": [{"fieldName": "reading", "function": "AVERAGE", "mapTo": "avgReading"}]
        })
        .to_string(),
    )
    .unwrap();
    let mut set = RecordSet::from_rows(
        &layout,
        vec![vec![Some("2".to_string())], vec![Some("1E+100000000".to_string())]],
    )
    .unwrap();
    let mut ctx = InMemoryContext::new();

    let err = validator().run(&mut ctx, &layout, &mut set).unwrap_err();

    assert!(matches!(err, TermError::NumericParse { ref field, .. } if field == "reading"));
    assert_eq!(set.map_values().get("avgReading").unwrap().to_string(), "2");
    assert!(!ctx.has_data("reading"));
}

#[test]
fn test_condition_operand_with_ampersand() {
    let mut layout = transaction_layout();
    layout.map_functions[1].condition =
        Some("${branch} in [B&1|B01] & ${kind} = DEP".to_string());
    let mut set = records(&layout, &[["B01", "20240105", "DEP", "", "9"]]);

    validator()
        .run(&mut InMemoryContext::new(), &layout, &mut set)
        .unwrap();

    assert_eq!(set.map_values().get("largestDeposit").unwrap().to_string(), "9");
}

#[test]
fn test_report_serializes_camel_case() {
    let layout = transaction_layout();
    let mut set = records(&layout, &[["B01", "2024", "DEP", "", "1"]]);

    let report = validator()
        .run(&mut InMemoryContext::new(), &layout, &mut set)
        .unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["hasError"], json!(true));
    assert_eq!(value["issues"][0]["fieldName"], json!("date"));
    assert_eq!(value["issues"][0]["validationType"], json!("DATE"));
    assert_eq!(value["issues"][0]["recordLine"], json!(1));
}

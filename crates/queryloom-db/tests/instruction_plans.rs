//! Instruction sequences decoded from JSON compile exactly like the ones the
//! builder produces, and keep placeholder/parameter parity.

use std::sync::Arc;

use queryloom_db::mapping::{EntityDef, EntityTree, JoinDef};
use queryloom_db::query::{count_placeholders, CompileOptions};
use queryloom_db::{Instruction, InstructionSequence, QueryBuilder, SqlDialect, Value};

struct AnsiDialect;

impl SqlDialect for AnsiDialect {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn case_sensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("{alias}{separator}{column}")
    }

    fn case_insensitive_column(&self, alias: &str, separator: &str, column: &str) -> String {
        format!("UPPER({alias}{separator}{column})")
    }

    fn in_array_sql(&self) -> &'static str {
        "= ANY(?)"
    }

    fn range_clause(&self) -> &'static str {
        "OFFSET ? ROWS FETCH NEXT ? ROWS ONLY"
    }
}

fn tree() -> Arc<EntityTree> {
    Arc::new(
        EntityTree::new(
            EntityDef::new("Invoice", "invoices", "i")
                .columns(["number", "state"])
                .child(
                    EntityDef::new("Item", "items", "it")
                        .columns(["sku"])
                        .marker("items")
                        .join(JoinDef::left("id", "invoice_id").with_condition("it.deleted = ?", vec![Value::Bool(false)])),
                ),
        )
        .unwrap(),
    )
}

fn decode(json: &str) -> InstructionSequence {
    serde_json::from_str::<Vec<Instruction>>(json).unwrap().into_iter().collect()
}

#[test]
fn test_json_plain_sequence_matches_builder() {
    let from_json = decode(
        r#"[
            {"kind": "INITIAL_QUERY"},
            {"kind": "STRING", "value": " WHERE "},
            {"kind": "COLUMN", "value": {"name": "state", "case_sensitive": false}},
            {"kind": "STRING", "value": " = "},
            {"kind": "STRING_PARAM", "value": "PAID"},
            {"kind": "STRING", "value": " AND "},
            {"kind": "PATH", "value": [{"match": "marker", "value": "items"}]},
            {"kind": "COLUMN", "value": {"name": "sku"}},
            {"kind": "STRING", "value": " = "},
            {"kind": "PARAM", "value": {"type": "String", "value": "A-1"}}
        ]"#,
    )
    .compile_plain(tree(), &AnsiDialect)
    .unwrap();

    let from_builder = QueryBuilder::select()
        .where_()
        .column("state")
        .case_insensitive()
        .eq("PAID")
        .and()
        .path(vec![queryloom_db::query::PathMatcher::marker("items")])
        .column("sku")
        .eq("A-1")
        .compile_plain(tree(), &AnsiDialect)
        .unwrap();

    assert_eq!(from_json.sql(), from_builder.sql());
    assert_eq!(from_json.params(), from_builder.params());
    assert!(from_json.sql().ends_with("WHERE UPPER(i.state) = ? AND it.sku = ?"));
    assert_eq!(
        from_json.params(),
        &[Value::Bool(false), Value::from("PAID"), Value::from("A-1")]
    );
}

#[test]
fn test_json_paged_sequence_keeps_parity() {
    let paged = decode(
        r#"[
            {"kind": "PAGED_INITIAL_QUERY", "value": {"begin": 5, "end": 15}},
            {"kind": "PAGED_MAIN_WHERE", "value": {"additional_columns": ["i.number"]}},
            {"kind": "ID_COLUMN", "value": {}},
            {"kind": "STRING", "value": " "},
            {"kind": "ARRAY_PARAM", "value": [{"type": "Int", "value": 1}, {"type": "Int", "value": 2}]},
            {"kind": "PAGED_MAIN_ORDER_BY"},
            {"kind": "COLUMN", "value": {"name": "number"}},
            {"kind": "STRING", "value": " DESC"},
            {"kind": "PAGED_SECONDARY_WHERE"},
            {"kind": "PATH", "value": [{"match": "entity", "value": "Item"}]},
            {"kind": "COLUMN", "value": {"name": "sku"}},
            {"kind": "STRING", "value": " <> "},
            {"kind": "STRING_PARAM", "value": "X"}
        ]"#,
    )
    .compile_with(tree(), &AnsiDialect, CompileOptions::default().strict(true))
    .unwrap()
    .into_paged()
    .unwrap();

    assert_eq!(count_placeholders(paged.sql()), paged.params().len());
    assert_eq!(count_placeholders(paged.count_sql()), paged.count_params().len());
    assert_eq!(
        paged.params(),
        &[
            Value::Bool(false),
            Value::list([1, 2]),
            Value::Int(5),
            Value::Int(10),
            Value::Bool(false),
            Value::from("X"),
        ]
    );
    assert_eq!(paged.count_params(), &[Value::Bool(false), Value::list([1, 2])]);
    assert!(paged.sql().contains("SELECT DISTINCT i.id AS i_id, i.number FROM"));
    assert!(paged.sql().contains("i.id = ANY(?)"));
    assert!(!paged.count_sql().contains("i.number FROM"));
    assert!(!paged.count_sql().contains("ORDER BY"));
}

#[test]
fn test_builder_sequence_round_trips_through_json() {
    let sequence = QueryBuilder::paged(0, 10)
        .paged_main_where(vec![])
        .column("number")
        .like("2024-%")
        .paged_main_order_by()
        .id()
        .asc()
        .build();

    let json = serde_json::to_string(&sequence.iter().collect::<Vec<_>>()).unwrap();
    assert_eq!(decode(&json), sequence);
}

use std::convert::Infallible;

use decorations::{
    CallContext, ChainDecorator, DecorationTable, DecoratorSpec, HookSetBuilder, HookedDecorator,
    LogLevel, Logging, MethodSig, TableReport,
};

struct Inventory;

type Count = MethodSig<Inventory, (), usize, String>;
type Label = MethodSig<Inventory, (), &'static str, Infallible>;

struct Audit;

impl Audit {
    fn record(&self, _cx: &CallContext<'_, Count>) -> Result<(), String> {
        Ok(())
    }
}

impl HookedDecorator<Count> for Audit {
    fn hooks(hooks: HookSetBuilder<Self, Count>) -> HookSetBuilder<Self, Count> {
        hooks.before().def("record", Self::record).after().def("record_after", Self::record)
    }
}

struct Passthrough;
impl ChainDecorator<Count> for Passthrough {}

fn inventory_table() -> DecorationTable<Inventory> {
    let mut class = DecorationTable::<Inventory>::builder();
    class
        .decorate(DecoratorSpec::<Count>::hooked(|| Audit))
        .decorate(Logging::spec(LogLevel::Debug))
        .decorate(DecoratorSpec::manual(|| Passthrough))
        .define("count", |_: &Inventory, _: &()| Ok(3))
        .unwrap();
    class
        .define::<Label, _>("label", |_: &Inventory, _: &()| Ok("inventory"))
        .unwrap();
    class.build()
}

#[test]
fn report_lists_methods_and_chains() {
    let report = TableReport::from_table(&inventory_table());

    assert!(report.class.ends_with("Inventory"));
    assert_eq!(report.metadata.method_count, 2);
    assert_eq!(report.metadata.decorated_count, 1);

    let count = &report.methods[0];
    assert_eq!(count.name, "count");
    assert!(count.decorated);
    assert_eq!(count.decorators.len(), 3);
    assert_eq!(count.decorators[0].style, "hooked");
    assert_eq!(count.decorators[0].before, vec!["record"]);
    assert_eq!(count.decorators[0].after, vec!["record_after"]);
    assert!(count.decorators[1].decorator_type.ends_with("Logging"));
    assert_eq!(count.decorators[2].style, "manual");
    assert!(count.decorators[2].around.is_empty());

    let label = &report.methods[1];
    assert!(!label.decorated);
    assert!(label.decorators.is_empty());
}

#[test]
fn dot_output_follows_each_chain() {
    let dot = TableReport::from_table(&inventory_table()).to_dot();

    assert!(dot.starts_with("digraph Decorations {"));
    assert!(dot.contains("label=\"Audit\", shape=ellipse"));
    assert!(dot.contains("label=\"Logging\", shape=box"));
    assert!(dot.contains("#1\" -> \""));
    assert!(dot.contains("label=\"original\""));
    assert!(dot.trim_end().ends_with('}'));
}

#[test]
fn mermaid_output_follows_each_chain() {
    let mermaid = TableReport::from_table(&inventory_table()).to_mermaid();

    assert!(mermaid.starts_with("flowchart LR"));
    assert!(mermaid.contains("m0 --> m0d0(\"Audit\")"));
    assert!(mermaid.contains("m0d2 -.-> m0o[\"original\"]"));
    assert!(mermaid.contains("m1[\"label\"]"));
}

#[cfg(feature = "export")]
#[test]
fn json_and_yaml_round_trip() {
    let report = TableReport::from_table(&inventory_table());

    let json = report.to_json().unwrap();
    let parsed: TableReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, report);

    let yaml = report.to_yaml().unwrap();
    assert!(yaml.contains("decorated_count: 1"));
}

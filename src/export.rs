//! Decoration table export for inspection and tooling.
//!
//! A [`TableReport`] is a plain snapshot of a [`DecorationTable`]: every
//! method, whether it is decorated, and the chain of decorators in call order.
//! It renders to Graphviz DOT and Mermaid without extra dependencies, and to
//! JSON or YAML with the `export` feature.

#[cfg(feature = "export")]
use serde::{Deserialize, Serialize};

use crate::decorator::DecoratorInfo;
use crate::table::{DecorationTable, MethodInfo};

/// Snapshot of one class's decorations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "export", derive(Serialize, Deserialize))]
pub struct TableReport {
    /// Full type name of the class
    pub class: String,
    /// Methods in definition order
    pub methods: Vec<MethodReport>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "export", derive(Serialize, Deserialize))]
pub struct MethodReport {
    pub name: String,
    pub signature: String,
    pub decorated: bool,
    /// Outermost first
    pub decorators: Vec<DecoratorReport>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "export", derive(Serialize, Deserialize))]
pub struct DecoratorReport {
    pub decorator_type: String,
    /// `manual` or `hooked`
    pub style: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
    pub around: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "export", derive(Serialize, Deserialize))]
pub struct ReportMetadata {
    pub method_count: usize,
    pub decorated_count: usize,
    /// Export timestamp
    pub exported_at: String,
    /// Report format version
    pub version: String,
}

impl From<&DecoratorInfo> for DecoratorReport {
    fn from(info: &DecoratorInfo) -> Self {
        let hooks = info.hooks().cloned().unwrap_or_default();
        let owned = |names: Vec<&'static str>| -> Vec<String> { names.into_iter().map(String::from).collect() };
        Self {
            decorator_type: info.decorator_type().to_string(),
            style: info.style().to_string(),
            before: owned(hooks.before),
            after: owned(hooks.after),
            around: owned(hooks.around),
        }
    }
}

impl From<&MethodInfo> for MethodReport {
    fn from(info: &MethodInfo) -> Self {
        Self {
            name: info.name().to_string(),
            signature: info.signature().to_string(),
            decorated: info.is_decorated(),
            decorators: info.decorators().iter().map(DecoratorReport::from).collect(),
        }
    }
}

impl TableReport {
    pub fn from_table<T: ?Sized + 'static>(table: &DecorationTable<T>) -> Self {
        let methods: Vec<MethodReport> = table.methods().map(MethodReport::from).collect();
        let metadata = ReportMetadata {
            method_count: methods.len(),
            decorated_count: methods.iter().filter(|method| method.decorated).count(),
            exported_at: exported_at(),
            version: "1.0.0".to_string(),
        };
        Self {
            class: table.class().name().to_string(),
            methods,
            metadata,
        }
    }

    /// Graphviz DOT: one path per method from the method through its
    /// decorators to the original body.
    pub fn to_dot(&self) -> String {
        let mut output = String::new();
        output.push_str("digraph Decorations {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box];\n\n");

        for method in &self.methods {
            let entry = format!("{}::{}", self.class, method.name);
            let fill = if method.decorated { "lightblue" } else { "white" };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor={}, style=filled];\n",
                entry, method.name, fill
            ));
            if !method.decorated {
                continue;
            }

            let mut previous = entry.clone();
            for (position, decorator) in method.decorators.iter().enumerate() {
                let id = format!("{}#{}", entry, position);
                let shape = if decorator.style == "hooked" { "ellipse" } else { "box" };
                output.push_str(&format!(
                    "  \"{}\" [label=\"{}\", shape={}];\n",
                    id,
                    short_type_name(&decorator.decorator_type),
                    shape
                ));
                output.push_str(&format!("  \"{}\" -> \"{}\";\n", previous, id));
                previous = id;
            }
            let original = format!("{}#original", entry);
            output.push_str(&format!(
                "  \"{}\" [label=\"original\", shape=note];\n  \"{}\" -> \"{}\" [style=dashed];\n",
                original, previous, original
            ));
        }

        output.push_str("}\n");
        output
    }

    /// Mermaid flowchart with the same shape as [`to_dot`](Self::to_dot).
    pub fn to_mermaid(&self) -> String {
        let mut output = String::from("flowchart LR\n");
        for (index, method) in self.methods.iter().enumerate() {
            let entry = format!("m{}", index);
            output.push_str(&format!("  {}[\"{}\"]\n", entry, method.name));
            if !method.decorated {
                continue;
            }
            let mut previous = entry.clone();
            for (position, decorator) in method.decorators.iter().enumerate() {
                let id = format!("{}d{}", entry, position);
                output.push_str(&format!(
                    "  {} --> {}(\"{}\")\n",
                    previous,
                    id,
                    short_type_name(&decorator.decorator_type)
                ));
                previous = id;
            }
            output.push_str(&format!("  {} -.-> {}o[\"original\"]\n", previous, entry));
        }
        output
    }

    #[cfg(feature = "export")]
    pub fn to_json(&self) -> crate::DecorationResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| crate::DecorationError::Export(err.to_string()))
    }

    #[cfg(feature = "export")]
    pub fn to_yaml(&self) -> crate::DecorationResult<String> {
        serde_yaml::to_string(self).map_err(|err| crate::DecorationError::Export(err.to_string()))
    }
}

fn exported_at() -> String {
    #[cfg(feature = "export")]
    {
        chrono::Utc::now().to_rfc3339()
    }
    #[cfg(not(feature = "export"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string()
    }
}

// `app::audit::Audit<app::Greet>` -> `Audit<Greet>`
fn short_type_name(name: &str) -> String {
    let mut short = String::with_capacity(name.len());
    let mut segment_start = 0;
    for (index, ch) in name.char_indices() {
        if matches!(ch, '<' | '>' | ',' | ' ' | '(' | ')' | '&') {
            short.push_str(last_segment(&name[segment_start..index]));
            short.push(ch);
            segment_start = index + ch.len_utf8();
        }
    }
    short.push_str(last_segment(&name[segment_start..]));
    short
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("app::audit::Audit"), "Audit");
        assert_eq!(
            short_type_name("decorations::decorators::retry::Retry<app::Fetch>"),
            "Retry<Fetch>"
        );
        assert_eq!(short_type_name("u32"), "u32");
    }
}

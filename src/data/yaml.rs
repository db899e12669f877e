//! YAML rendering with readable multi-line strings.
//!
//! `serde_yaml` quotes multi-line scalars onto one line, which makes
//! evidence snippets unreadable. Values are converted to `yaml-rust`'s
//! document model and emitted with literal block scalars instead.

use anyhow::{Context, Result};
use serde::Serialize;
use yaml_rust_davvid::{Yaml, YamlEmitter};

/// Serializes a value to YAML, emitting multi-line strings as block scalars.
pub fn to_yaml<T: Serialize>(data: &T) -> Result<String> {
    let value = serde_yaml::to_value(data).context("Failed to serialize to serde value")?;
    let document = to_yaml_rust(&value);

    let mut output = String::new();
    let mut emitter = YamlEmitter::new(&mut output);
    emitter.multiline_strings(true);
    emitter.dump(&document).context("Failed to emit YAML")?;

    Ok(output)
}

fn to_yaml_rust(value: &serde_yaml::Value) -> Yaml {
    match value {
        serde_yaml::Value::Null => Yaml::Null,
        serde_yaml::Value::Bool(b) => Yaml::Boolean(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Yaml::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Yaml::Real(f.to_string())
            } else {
                Yaml::String(n.to_string())
            }
        }
        serde_yaml::Value::String(s) => Yaml::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => Yaml::Array(seq.iter().map(to_yaml_rust).collect()),
        serde_yaml::Value::Mapping(map) => {
            let mut hash = yaml_rust_davvid::yaml::Hash::new();
            for (k, v) in map {
                hash.insert(to_yaml_rust(k), to_yaml_rust(v));
            }
            Yaml::Hash(hash)
        }
        serde_yaml::Value::Tagged(tagged) => to_yaml_rust(&tagged.value),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::data::{Category, Confidence, Finding, Severity};

    fn multiline_finding() -> Finding {
        Finding::new(
            "conflict-markers",
            Category::Correctness,
            "src/lib.rs",
            Severity::Blocker,
            Confidence::High,
            "unresolved merge conflict",
        )
        .at_lines(3, 5)
        .with_evidence("<<<<<<< HEAD\nlet a = 1;\n=======")
    }

    #[test]
    fn multiline_evidence_is_block_scalar() {
        let yaml = to_yaml(&multiline_finding()).unwrap();
        assert!(yaml.contains("evidence: |"), "got:\n{yaml}");
        assert!(yaml.contains("severity: blocker"));
        assert!(yaml.contains("category: correctness"));
    }

    #[test]
    fn yaml_reads_back() {
        let finding = multiline_finding();
        let yaml = to_yaml(&finding).unwrap();
        let parsed: Finding = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, finding);
    }
}

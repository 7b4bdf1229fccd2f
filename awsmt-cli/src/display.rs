//! Plan rendering

use colored::{ColoredString, Colorize};
use similar::{ChangeTag, TextDiff};

use awsmt_core::effect::Effect;
use awsmt_core::plan::Plan;
use awsmt_core::resource::Value;
use awsmt_core::schema::{AttributeType, ResourceSchema};

use crate::config::SchemaIndex;

const ATTR_INDENT: &str = "      ";

pub fn print_plan(plan: &Plan, schemas: &SchemaIndex) {
    if plan.mutation_count() == 0 {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        let schema = match effect {
            Effect::Read(_) => None,
            _ => schemas.resources.get(&effect.resource_id().resource_type),
        };
        print_effect(effect, schema);
        println!();
    }

    let summary = plan.summary();
    println!(
        "Plan: {} to add, {} to change, {} to replace, {} to destroy.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
}

fn colored_symbol(effect: &Effect) -> ColoredString {
    match effect {
        Effect::Read(_) => effect.symbol().cyan().bold(),
        Effect::Create(_) => effect.symbol().green().bold(),
        Effect::Update { .. } => effect.symbol().yellow().bold(),
        Effect::Replace { .. } => effect.symbol().magenta().bold(),
        Effect::Delete { .. } => effect.symbol().red().bold(),
    }
}

fn print_effect(effect: &Effect, schema: Option<&ResourceSchema>) {
    let id = effect.resource_id();
    let address = if matches!(effect, Effect::Read(_)) {
        format!("data.{}", id)
    } else {
        id.to_string()
    };
    println!("  {} {}", colored_symbol(effect), address.cyan().bold());

    match effect {
        Effect::Read(r) | Effect::Create(r) => {
            let mut keys: Vec<&String> = r.attributes.keys().collect();
            keys.sort();
            for key in keys {
                println!(
                    "{}{}: {}",
                    ATTR_INDENT,
                    key,
                    format_value(&r.attributes[key]).green()
                );
            }
        }
        Effect::Update {
            from,
            to,
            changed_attributes,
            ..
        }
        | Effect::Replace {
            from,
            to,
            changed_attributes,
            ..
        } => {
            let replacing = matches!(effect, Effect::Replace { .. });
            for key in changed_attributes {
                let attr = schema.and_then(|s| s.attributes.get(key));
                let marker = if replacing && attr.is_some_and(|a| a.force_new) {
                    format!(" {}", "# forces replacement".magenta())
                } else {
                    String::new()
                };
                let old = from.attributes.get(key);
                let new = to.attributes.get(key);

                if attr.is_some_and(|a| matches!(a.attr_type, AttributeType::Json))
                    && let (Some(Value::String(old)), Some(Value::String(new))) = (old, new)
                {
                    println!("{}{}:{}", ATTR_INDENT, key, marker);
                    print_json_diff(old, new);
                    continue;
                }

                println!(
                    "{}{}: {} → {}{}",
                    ATTR_INDENT,
                    key,
                    old.map(format_value)
                        .unwrap_or_else(|| "(none)".to_string())
                        .red(),
                    new.map(format_value)
                        .unwrap_or_else(|| "(none)".to_string())
                        .green(),
                    marker
                );
            }
        }
        Effect::Delete { identifier, .. } => {
            println!("{}{}: {}", ATTR_INDENT, "identifier".bold(), identifier.red());
        }
    }
}

/// Line diff of two JSON documents, both pretty-printed
fn print_json_diff(old: &str, new: &str) {
    let old = pretty_json(old);
    let new = pretty_json(new);
    for line in json_diff_lines(&old, &new) {
        println!("{}  {}", ATTR_INDENT, line);
    }
}

fn json_diff_lines(old: &str, new: &str) -> Vec<ColoredString> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .map(|change| {
            let line = change.value().trim_end_matches('\n');
            match change.tag() {
                ChangeTag::Delete => format!("- {}", line).red(),
                ChangeTag::Insert => format!("+ {}", line).green(),
                ChangeTag::Equal => format!("  {}", line).normal(),
            }
        })
        .collect()
}

fn pretty_json(text: &str) -> String {
    serde_json::from_str::<serde_json::Value>(text)
        .and_then(|v| serde_json::to_string_pretty(&v))
        .map(|s| s + "\n")
        .unwrap_or_else(|_| text.to_string())
}

pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let strs: Vec<_> = entries
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::ResourceRef(binding, attr) => format!("{}.{} (known after apply)", binding, attr),
    }
}

pub fn format_effect(effect: &Effect) -> String {
    let id = effect.resource_id();
    match effect {
        Effect::Read(_) => format!("Read data.{}", id),
        Effect::Create(_) => format!("Create {}", id),
        Effect::Update { .. } => format!("Update {}", id),
        Effect::Replace { .. } => format!("Replace {}", id),
        Effect::Delete { .. } => format!("Delete {}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsmt_core::resource::{Resource, ResourceId, State};
    use std::collections::HashMap;

    #[test]
    fn format_nested_values() {
        let mut map = HashMap::new();
        map.insert("source_group".to_string(), Value::string("hls"));
        map.insert("path".to_string(), Value::string("/ad"));
        let value = Value::List(vec![Value::Map(map), Value::Int(3)]);
        assert_eq!(
            format_value(&value),
            r#"[{path: "/ad", source_group: "hls"}, 3]"#
        );
    }

    #[test]
    fn format_reference_as_pending() {
        let value = Value::ResourceRef("awsmt_channel.main".to_string(), "arn".to_string());
        assert_eq!(
            format_value(&value),
            "awsmt_channel.main.arn (known after apply)"
        );
    }

    #[test]
    fn json_diff_ignores_formatting() {
        let old = r#"{"Version":"2012-10-17","Statement":[]}"#;
        let new = "{\n  \"Statement\": [],\n  \"Version\": \"2012-10-17\"\n}";
        let lines = json_diff_lines(&pretty_json(old), &pretty_json(new));
        assert!(lines.iter().all(|l| l.starts_with("  ")));
    }

    #[test]
    fn json_diff_marks_changed_lines() {
        let old = pretty_json(r#"{"Effect":"Allow"}"#);
        let new = pretty_json(r#"{"Effect":"Deny"}"#);
        let lines: Vec<String> = json_diff_lines(&old, &new)
            .into_iter()
            .map(|l| l.to_string())
            .collect();
        assert!(lines.iter().any(|l| l.contains("- ") && l.contains("Allow")));
        assert!(lines.iter().any(|l| l.contains("+ ") && l.contains("Deny")));
    }

    #[test]
    fn effect_labels() {
        let id = ResourceId::new("awsmt_channel", "main");
        let replace = Effect::Replace {
            id: id.clone(),
            from: State::not_found(id.clone()),
            to: Resource::new("awsmt_channel", "main"),
            changed_attributes: vec!["tier".to_string()],
        };
        assert_eq!(format_effect(&replace), "Replace awsmt_channel.main");
        assert_eq!(
            format_effect(&Effect::Read(
                Resource::new("awsmt_source_location", "src").with_read_only(true)
            )),
            "Read data.awsmt_source_location.src"
        );
    }
}

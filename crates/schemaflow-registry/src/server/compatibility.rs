//! Avro compatibility rules for the local registry.
//!
//! `can_read(reader, writer)` follows Avro schema resolution: records match
//! fields by name, reader-only fields need a default, primitives allow the
//! standard promotions, unions must cover every writer branch.
//!
//! On top of that, `BACKWARD` (and `FULL`) reject dropping a field that had no
//! default in the previous version: consumers still on the previous version
//! cannot fill it in.

use crate::types::CompatibilityLevel;
use apache_avro::Schema;

/// Check `new` against `existing` (oldest first) under `level`.
///
/// Returns the violations; empty means compatible.
pub fn check_compatibility(
    level: CompatibilityLevel,
    existing: &[&Schema],
    new: &Schema,
) -> Vec<String> {
    let against: Vec<&Schema> = if level.is_transitive() {
        existing.to_vec()
    } else {
        existing.last().copied().into_iter().collect()
    };

    let mut messages = Vec::new();
    for old in against {
        match level {
            CompatibilityLevel::None => {}
            CompatibilityLevel::Backward | CompatibilityLevel::BackwardTransitive => {
                can_read(new, old, "", &mut messages);
                dropped_required_fields(old, new, &mut messages);
            }
            CompatibilityLevel::Forward | CompatibilityLevel::ForwardTransitive => {
                can_read(old, new, "", &mut messages);
            }
            CompatibilityLevel::Full | CompatibilityLevel::FullTransitive => {
                can_read(new, old, "", &mut messages);
                can_read(old, new, "", &mut messages);
            }
        }
    }
    messages.dedup();
    messages
}

/// Can data written with `writer` be read with `reader`?
pub fn can_read(reader: &Schema, writer: &Schema, path: &str, messages: &mut Vec<String>) {
    if reader == writer {
        return;
    }

    match (reader, writer) {
        (Schema::Record(r), Schema::Record(w)) => {
            if r.name != w.name {
                messages.push(format!(
                    "{}: record name mismatch, reader '{}' vs writer '{}'",
                    display_path(path),
                    r.name,
                    w.name
                ));
                return;
            }
            for reader_field in &r.fields {
                let field_path = join(path, &reader_field.name);
                let writer_field = w.fields.iter().find(|f| {
                    f.name == reader_field.name
                        || reader_field
                            .aliases
                            .as_ref()
                            .is_some_and(|aliases| aliases.contains(&f.name))
                });
                match writer_field {
                    Some(wf) => can_read(&reader_field.schema, &wf.schema, &field_path, messages),
                    None if reader_field.default.is_none() => messages.push(format!(
                        "{}: reader field has no default and is missing from the writer schema",
                        field_path
                    )),
                    None => {}
                }
            }
        }
        (_, Schema::Union(w)) => {
            for branch in w.variants() {
                let mut branch_messages = Vec::new();
                can_read(reader, branch, path, &mut branch_messages);
                if !branch_messages.is_empty() {
                    messages.push(format!(
                        "{}: writer union branch {:?} cannot be read",
                        display_path(path),
                        kind(branch)
                    ));
                }
            }
        }
        (Schema::Union(r), _) => {
            let readable = r.variants().iter().any(|branch| {
                let mut branch_messages = Vec::new();
                can_read(branch, writer, path, &mut branch_messages);
                branch_messages.is_empty()
            });
            if !readable {
                messages.push(format!(
                    "{}: no reader union branch accepts writer type {}",
                    display_path(path),
                    kind(writer)
                ));
            }
        }
        (Schema::Enum(r), Schema::Enum(w)) => {
            for symbol in &w.symbols {
                if !r.symbols.contains(symbol) {
                    messages.push(format!(
                        "{}: enum symbol '{}' unknown to the reader",
                        display_path(path),
                        symbol
                    ));
                }
            }
        }
        (Schema::Fixed(r), Schema::Fixed(w)) => {
            if r.size != w.size || r.name != w.name {
                messages.push(format!("{}: fixed type mismatch", display_path(path)));
            }
        }
        _ if promotable(writer, reader) => {}
        _ => messages.push(format!(
            "{}: reader type {} cannot read writer type {}",
            display_path(path),
            kind(reader),
            kind(writer)
        )),
    }
}

/// Fields present in `old` without a default and absent from `new`.
fn dropped_required_fields(old: &Schema, new: &Schema, messages: &mut Vec<String>) {
    if let (Schema::Record(o), Schema::Record(n)) = (old, new) {
        for field in &o.fields {
            let kept = n.fields.iter().any(|f| f.name == field.name);
            if !kept && field.default.is_none() {
                messages.push(format!(
                    "{}: field without a default was removed",
                    field.name
                ));
            }
        }
    }
}

fn promotable(writer: &Schema, reader: &Schema) -> bool {
    matches!(
        (writer, reader),
        (Schema::Int, Schema::Long | Schema::Float | Schema::Double)
            | (Schema::Long, Schema::Float | Schema::Double)
            | (Schema::Float, Schema::Double)
            | (Schema::String, Schema::Bytes)
            | (Schema::Bytes, Schema::String)
    )
}

fn kind(schema: &Schema) -> String {
    match schema {
        Schema::Null => "null".into(),
        Schema::Boolean => "boolean".into(),
        Schema::Int => "int".into(),
        Schema::Long => "long".into(),
        Schema::Float => "float".into(),
        Schema::Double => "double".into(),
        Schema::Bytes => "bytes".into(),
        Schema::String => "string".into(),
        Schema::Record(r) => format!("record {}", r.name),
        Schema::Enum(e) => format!("enum {}", e.name),
        Schema::Fixed(f) => format!("fixed {}", f.name),
        Schema::Union(_) => "union".into(),
        other => format!("{:?}", other),
    }
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

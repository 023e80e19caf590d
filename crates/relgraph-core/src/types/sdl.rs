//! GraphQL SDL printer.

use std::fmt::Write;

use super::{FieldDef, InputValueDef, TypeDef, TypeRegistry};

/// Render every registered type as SDL, in registration order.
pub fn print_sdl(registry: &TypeRegistry) -> String {
    let mut out = String::new();
    for (i, def) in registry.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        print_type(&mut out, def);
    }
    out
}

fn print_type(out: &mut String, def: &TypeDef) {
    let description = match def {
        TypeDef::Scalar(t) => t.description.as_deref(),
        TypeDef::Enum(t) => t.description.as_deref(),
        TypeDef::Object(t) => t.description.as_deref(),
        TypeDef::InputObject(t) => t.description.as_deref(),
    };
    print_description(out, description, "");
    let _ = write!(out, "{} {}", def.keyword(), def.name());

    match def {
        TypeDef::Scalar(_) => out.push('\n'),
        TypeDef::Enum(t) => {
            out.push_str(" {\n");
            for value in &t.values {
                let _ = writeln!(out, "  {}", value);
            }
            out.push_str("}\n");
        }
        TypeDef::Object(t) => {
            out.push_str(" {\n");
            for field in &t.fields {
                print_field(out, field);
            }
            out.push_str("}\n");
        }
        // Input objects without fields print without a body.
        TypeDef::InputObject(t) if t.fields.is_empty() => out.push('\n'),
        TypeDef::InputObject(t) => {
            out.push_str(" {\n");
            for field in &t.fields {
                print_description(out, field.description.as_deref(), "  ");
                let _ = writeln!(out, "  {}: {}", field.name, field.ty);
            }
            out.push_str("}\n");
        }
    }
}

fn print_field(out: &mut String, field: &FieldDef) {
    print_description(out, field.description.as_deref(), "  ");
    let _ = write!(out, "  {}", field.name);
    if !field.args.is_empty() {
        let args: Vec<String> = field.args.iter().map(print_arg).collect();
        let _ = write!(out, "({})", args.join(", "));
    }
    let _ = writeln!(out, ": {}", field.ty);
}

fn print_arg(arg: &InputValueDef) -> String {
    format!("{}: {}", arg.name, arg.ty)
}

fn print_description(out: &mut String, description: Option<&str>, indent: &str) {
    if let Some(text) = description {
        let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
        let _ = writeln!(out, "{}\"{}\"", indent, escaped);
    }
}

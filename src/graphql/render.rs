//! Renders a [`GraphQLQueryAst`] as a query document.

use crate::graphql::ast::{selection_arguments, Argument, GraphQLQueryAst};
use crate::graphql::selection::SelectionSetItem;

const INDENT: &str = "  ";

/// Renders `ast` with two-space indentation.
pub fn render_graphql_query(ast: &GraphQLQueryAst) -> String {
    let mut out = String::new();
    out.push_str("query ");
    out.push_str(&ast.operation_name);
    if !ast.variables.is_empty() {
        let defs: Vec<String> = ast
            .variables
            .iter()
            .map(|var| format!("${}: {}", var.name, var.type_name))
            .collect();
        out.push('(');
        out.push_str(&defs.join(", "));
        out.push(')');
    }
    out.push_str(" {\n");
    out.push_str(INDENT);
    out.push_str(&ast.root.field);
    out.push_str(&render_arguments(&ast.root.arguments));
    out.push_str(" {\n");
    render_selections(&mut out, &ast.root.selections, 2);
    out.push_str(INDENT);
    out.push_str("}\n}\n");
    out
}

/// Renders a selection list at `depth` levels of indentation.
pub fn render_selections(out: &mut String, items: &[SelectionSetItem], depth: usize) {
    for item in items {
        out.push_str(&INDENT.repeat(depth));
        if let Some(alias) = &item.alias {
            out.push_str(alias);
            out.push_str(": ");
        }
        out.push_str(&item.field);
        out.push_str(&render_arguments(&selection_arguments(item)));
        if item.selections.is_empty() {
            out.push('\n');
            continue;
        }
        out.push_str(" {\n");
        render_selections(out, &item.selections, depth + 1);
        out.push_str(&INDENT.repeat(depth));
        out.push_str("}\n");
    }
}

fn render_arguments(args: &[Argument]) -> String {
    if args.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = args
        .iter()
        .map(|arg| format!("{}: {}", arg.name, arg.value))
        .collect();
    format!("({})", rendered.join(", "))
}

// src/dag/render.rs

//! Text renderings of a workflow graph.

use std::collections::BTreeMap;

use crate::dag::Graph;

/// Render the graph as an ASCII tree rooted at the dependency-free tasks.
///
/// Children are sorted ascending at every level; a task with several parents
/// appears once under each of them.
pub fn render_ascii(graph: &Graph) -> String {
    let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for task in graph.tasks() {
        for dep in &task.depends_on {
            children.entry(dep.as_str()).or_default().push(&task.name);
        }
    }
    for kids in children.values_mut() {
        kids.sort_unstable();
    }

    let mut out = String::new();
    for root in graph.roots() {
        out.push_str(&root.name);
        out.push('\n');
        render_subtree(&root.name, "", &children, &mut out);
    }
    out
}

fn render_subtree(
    name: &str,
    prefix: &str,
    children: &BTreeMap<&str, Vec<&str>>,
    out: &mut String,
) {
    let kids = children.get(name).map(Vec::as_slice).unwrap_or(&[]);
    for (i, kid) in kids.iter().enumerate() {
        let last = i + 1 == kids.len();
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(kid);
        out.push('\n');

        let next = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_subtree(kid, &next, children, out);
    }
}

/// Render the graph in Graphviz DOT format.
pub fn render_dot(graph: &Graph) -> String {
    let mut out = String::new();
    out.push_str(&format!("digraph {} {{\n", sanitise_name(graph.name())));
    out.push_str("  rankdir=LR;\n");
    out.push_str("  node [shape=box, style=rounded];\n");

    for task in graph.tasks() {
        out.push_str(&format!("  \"{}\" [label=\"{}\"];\n", task.name, task.name));
    }

    out.push('\n');

    for (dep, dependent) in graph.edges() {
        out.push_str(&format!("  \"{dep}\" -> \"{dependent}\";\n"));
    }

    out.push_str("}\n");
    out
}

/// Graphviz identifiers may not contain arbitrary punctuation.
fn sanitise_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Task;

    fn diamond() -> Graph {
        let mut g = Graph::new("diamond");
        for (name, deps) in [
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ] {
            g.add_task(Task {
                name: name.to_string(),
                cmd: format!("echo {name}"),
                depends_on: deps.into_iter().map(String::from).collect(),
                retries: 0,
            })
            .unwrap();
        }
        g
    }

    #[test]
    fn ascii_tree_sorts_children() {
        let out = render_ascii(&diamond());
        let expected = "\
a
├── b
│   └── d
└── c
    └── d
";
        assert_eq!(out, expected);
    }

    #[test]
    fn dot_output_contains_all_edges() {
        let out = render_dot(&diamond());
        assert!(out.starts_with("digraph diamond {"));
        for edge in [
            "\"a\" -> \"b\";",
            "\"a\" -> \"c\";",
            "\"b\" -> \"d\";",
            "\"c\" -> \"d\";",
        ] {
            assert!(out.contains(edge), "missing edge {edge} in:\n{out}");
        }
    }

    #[test]
    fn dot_sanitises_workflow_name() {
        let mut g = Graph::new("my workflow!");
        g.add_task(Task {
            name: "a".into(),
            cmd: "true".into(),
            depends_on: vec![],
            retries: 0,
        })
        .unwrap();

        assert!(render_dot(&g).starts_with("digraph my_workflow_ {"));
    }
}

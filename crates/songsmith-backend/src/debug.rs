//! Text diagrams of generated structures and the role graph.

use std::fmt;

use songsmith_spec::{ChordEvent, RoleGraph, Section, SectionNode, SongStructure};

/// Lineage tree plus performance order of a structure.
///
/// ```text
/// lineage:
///   A verse x2
///     AA chorus x2
///       AAA outro x1
/// performance:
///    1. Verse 1 [A 0.1] | C C/E | F | G | C | Am |
/// ```
pub struct StructureDiagram<'a>(pub &'a SongStructure);

impl fmt::Display for StructureDiagram<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let structure = self.0;

        writeln!(f, "lineage:")?;
        for root in structure.lineage.values().filter(|n| n.parent.is_none()) {
            write_node(f, structure, root)?;
        }

        writeln!(f, "performance:")?;
        for (i, section) in structure.sections.iter().enumerate() {
            writeln!(
                f,
                "  {:>2}. {} [{}{}] {}",
                i + 1,
                section.name,
                section.label,
                form_suffix(section),
                chord_bars(&section.chords)
            )?;
        }
        Ok(())
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, structure: &SongStructure, node: &SectionNode) -> fmt::Result {
    writeln!(
        f,
        "{}{} {} x{}",
        "  ".repeat(node.label.depth() + 1),
        node.label,
        node.role,
        structure.occurrences(&node.label)
    )?;
    for child in structure.children(&node.label) {
        write_node(f, structure, child)?;
    }
    Ok(())
}

/// Variant of each pass, omitted for a single plain pass.
fn form_suffix(section: &Section) -> String {
    if section.form == [0] {
        return String::new();
    }
    let passes: Vec<String> = section.form.iter().map(u32::to_string).collect();
    format!(" {}", passes.join("."))
}

/// Chord symbols grouped into bars: `| C C/E | F |`.
pub fn chord_bars(chords: &[ChordEvent]) -> String {
    let mut out = String::from("|");
    for (i, chord) in chords.iter().enumerate() {
        if i > 0 && chord.bar_start {
            out.push_str(" |");
        }
        out.push(' ');
        out.push_str(&chord.symbol());
    }
    out.push_str(" |");
    if chords.is_empty() {
        out.truncate(1);
    }
    out
}

/// Renders a structure as an indented tree followed by its performance
/// order.
pub fn render(structure: &SongStructure) -> String {
    StructureDiagram(structure).to_string()
}

/// Renders the role graph in Graphviz DOT.
pub fn render_role_graph_dot(graph: &RoleGraph) -> String {
    let mut out = String::from("digraph roles {\n    rankdir=LR;\n    start [shape=point];\n");
    for role in graph.roles() {
        let shape = if role == graph.terminal {
            "doublecircle"
        } else {
            "ellipse"
        };
        out.push_str(&format!("    \"{}\" [shape={}];\n", role, shape));
    }
    for edge in &graph.start {
        out.push_str(&format!(
            "    start -> \"{}\" [label=\"{:.2}\"];\n",
            edge.to, edge.weight
        ));
    }
    for (from, edges) in &graph.transitions {
        for edge in edges {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{:.2}\"];\n",
                from, edge.to, edge.weight
            ));
        }
    }
    out.push_str("}\n");
    out
}

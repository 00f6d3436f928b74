use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::blockmodel::Hierarchy;
use crate::error::RenderError;
use crate::graph::Graph;

/// Graphviz engine used to lay out the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Layout {
    #[default]
    Sfdp,
    Dot,
    Neato,
    Fdp,
    Twopi,
}

impl Layout {
    pub fn engine(self) -> &'static str {
        match self {
            Layout::Sfdp => "sfdp",
            Layout::Dot => "dot",
            Layout::Neato => "neato",
            Layout::Fdp => "fdp",
            Layout::Twopi => "twopi",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrawConfig {
    pub layout: Layout,
    /// Rendered file; its extension picks the Graphviz output format.
    pub output: PathBuf,
}

impl Default for DrawConfig {
    fn default() -> Self {
        DrawConfig {
            layout: Layout::Sfdp,
            output: PathBuf::from("medium.pdf"),
        }
    }
}

/// Vertices get labels only below this size; larger drawings stay legible
/// as coloured dots.
const LABEL_LIMIT: usize = 100;

pub fn hierarchy_to_dot(graph: &Graph, hierarchy: &Hierarchy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph hierarchy {{");
    let _ = writeln!(out, "  graph [overlap=false, outputorder=edgesfirst];");
    let _ = writeln!(out, "  node [shape=circle, style=filled, width=0.2, fontsize=8];");
    let _ = writeln!(out, "  edge [color=\"#00000055\", arrowsize=0.4];");

    // children[l][b]: members of block b at level l, as ids of level l - 1
    // (vertex ids at level 0).
    let children: Vec<Vec<Vec<usize>>> = hierarchy
        .levels
        .iter()
        .enumerate()
        .map(|(l, assignment)| {
            let mut members = vec![Vec::new(); hierarchy.blocks(l)];
            for (node, &block) in assignment.iter().enumerate() {
                members[block].push(node);
            }
            members
        })
        .collect();

    let label_vertices = graph.num_vertices() <= LABEL_LIMIT;
    if let Some(top) = children.len().checked_sub(1) {
        for block in 0..children[top].len() {
            write_cluster(&mut out, graph, &children, top, block, label_vertices, 1);
        }
    }

    for (s, t) in graph.edges() {
        let _ = writeln!(out, "  v{s} -> v{t};");
    }
    out.push_str("}\n");
    out
}

fn write_cluster(
    out: &mut String,
    graph: &Graph,
    children: &[Vec<Vec<usize>>],
    level: usize,
    block: usize,
    label_vertices: bool,
    depth: usize,
) {
    let pad = "  ".repeat(depth);
    let _ = writeln!(out, "{pad}subgraph cluster_l{level}_b{block} {{");
    let _ = writeln!(out, "{pad}  style=dashed; color=\"#888888\"; label=\"\";");

    for &member in &children[level][block] {
        if level == 0 {
            let hue = block_hue(block);
            let label = if label_vertices {
                escape(graph.token(member))
            } else {
                String::new()
            };
            let _ = writeln!(
                out,
                "{pad}  v{member} [label=\"{label}\", tooltip=\"{}\", fillcolor=\"{hue:.3} 0.55 0.85\"];",
                escape(graph.token(member))
            );
        } else {
            write_cluster(out, graph, children, level - 1, member, label_vertices, depth + 1);
        }
    }
    let _ = writeln!(out, "{pad}}}");
}

/// Well-spread hue in `[0, 1)` for a block id.
fn block_hue(block: usize) -> f64 {
    (block as f64 * 0.618_033_988_75).fract()
}

fn escape(token: &str) -> String {
    token.replace('\\', "\\\\").replace('"', "\\\"")
}

fn output_format(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "png",
        Some("svg") => "svg",
        Some("ps") => "ps",
        _ => "pdf",
    }
}

/// `medium.pdf` -> `medium.pdf.dot`; never equal to `output`.
fn dot_source_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".dot");
    PathBuf::from(name)
}

/// Writes the DOT source next to `config.output` and renders it with
/// Graphviz. Returns the rendered path.
pub fn draw_hierarchy(graph: &Graph, hierarchy: &Hierarchy, config: &DrawConfig) -> Result<PathBuf, RenderError> {
    let dot_path = dot_source_path(&config.output);
    std::fs::write(&dot_path, hierarchy_to_dot(graph, hierarchy)).map_err(|source| RenderError::Write {
        path: dot_path.clone(),
        source,
    })?;
    debug!(path = %dot_path.display(), "wrote hierarchy dot");

    let engine = config.layout.engine();
    let format = output_format(&config.output);
    let status = Command::new(engine)
        .arg(format!("-T{format}"))
        .arg(&dot_path)
        .arg("-o")
        .arg(&config.output)
        .status()
        .map_err(|source| RenderError::EngineUnavailable { engine, source })?;
    if !status.success() {
        return Err(RenderError::EngineFailed { engine, status });
    }

    info!(output = %config.output.display(), engine, "rendered hierarchy");
    Ok(config.output.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Graph, Hierarchy) {
        let g: Graph = [("a", "b"), ("b", "a"), ("c", "d"), ("d", "c"), ("b", "c")]
            .into_iter()
            .collect();
        let h = Hierarchy {
            levels: vec![vec![0, 0, 1, 1], vec![0, 0]],
            description_length: 0.0,
        };
        (g, h)
    }

    #[test]
    fn dot_nests_blocks_inside_the_root() {
        let (g, h) = sample();
        let dot = hierarchy_to_dot(&g, &h);

        assert!(dot.starts_with("digraph hierarchy {"));
        let root = dot.find("subgraph cluster_l1_b0").unwrap();
        let b0 = dot.find("subgraph cluster_l0_b0").unwrap();
        let b1 = dot.find("subgraph cluster_l0_b1").unwrap();
        assert!(root < b0 && b0 < b1);
        for v in 0..4 {
            assert!(dot.contains(&format!("v{v} [label=")));
        }
        assert_eq!(dot.matches(" -> ").count(), 5);
    }

    #[test]
    fn tokens_are_escaped() {
        assert_eq!(escape("say \"hi\"\\"), "say \\\"hi\\\"\\\\");
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(output_format(Path::new("medium.pdf")), "pdf");
        assert_eq!(output_format(Path::new("out.PNG")), "png");
        assert_eq!(output_format(Path::new("noext")), "pdf");
    }

    #[test]
    fn dot_source_is_written_even_without_graphviz() {
        let (g, h) = sample();
        let dir = tempfile::tempdir().unwrap();
        let config = DrawConfig {
            output: dir.path().join("out.pdf"),
            ..DrawConfig::default()
        };
        if let Err(err) = draw_hierarchy(&g, &h, &config) {
            assert!(matches!(
                err,
                RenderError::EngineUnavailable { .. } | RenderError::EngineFailed { .. }
            ));
        }
        assert!(dir.path().join("out.pdf.dot").exists());
    }

    #[test]
    fn dot_source_never_overwrites_the_output() {
        assert_eq!(dot_source_path(Path::new("medium.pdf")), Path::new("medium.pdf.dot"));
        assert_eq!(dot_source_path(Path::new("tree.dot")), Path::new("tree.dot.dot"));
        assert_eq!(dot_source_path(Path::new("noext")), Path::new("noext.dot"));
    }
}

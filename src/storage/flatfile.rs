//! Flat-text graph format
//!
//! One file holds the whole graph:
//!
//! ```text
//! # notegraph v1
//! Node ID: 1
//! Text: first note
//! Concepts: rust, audio
//!
//! Edge: SourceID: 2, TargetID: 1, Weight: 0.500000
//! Vertex: SourceID: 2, TargetID: 1, Concept: rust
//! ```
//!
//! Edges and vertices naming a node that is not in the file are loaded
//! as written and logged.
//!
//! Files without the header line are read in legacy mode: no vertex lines
//! are expected and values are taken verbatim, without unescaping.

use super::traits::{GraphStore, StorageError, StorageResult};
use crate::graph::{ConceptGraph, Edge, Node, NodeId, Vertex};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Current format version written in the header
pub const FORMAT_VERSION: &str = "1";

const HEADER_PREFIX: &str = "# notegraph v";
const NODE_ID: &str = "Node ID:";
const TEXT: &str = "Text:";
const CONCEPTS: &str = "Concepts:";
const EDGE: &str = "Edge:";
const VERTEX: &str = "Vertex:";
const SEPARATOR: &str = ", ";
const EMPTY_CONCEPT: &str = "\\e";

/// Write `graph` in the current format.
pub fn write_graph<W: Write>(graph: &ConceptGraph, mut out: W) -> io::Result<()> {
    writeln!(out, "{HEADER_PREFIX}{FORMAT_VERSION}")?;

    for node in graph.nodes() {
        let concepts: Vec<String> = node.concepts.iter().map(|c| escape_concept(c)).collect();
        writeln!(out, "{NODE_ID} {}", node.id)?;
        writeln!(out, "{TEXT} {}", escape_text(&node.text))?;
        writeln!(out, "{CONCEPTS} {}", concepts.join(SEPARATOR))?;
        writeln!(out)?;
    }

    for edge in graph.edges() {
        writeln!(
            out,
            "{EDGE} SourceID: {}, TargetID: {}, Weight: {:.6}",
            edge.source, edge.target, edge.weight
        )?;
    }

    for vertex in graph.vertices() {
        writeln!(
            out,
            "{VERTEX} SourceID: {}, TargetID: {}, Concept: {}",
            vertex.source,
            vertex.target,
            escape_concept(&vertex.concept)
        )?;
    }

    out.flush()
}

/// Read a graph written by [`write_graph`] or by the legacy application.
pub fn read_graph<R: BufRead>(input: R) -> StorageResult<ConceptGraph> {
    let mut reader = GraphReader::default();
    for (idx, line) in input.lines().enumerate() {
        reader.feed(idx + 1, &line?)?;
    }
    reader.finish()
}

/// Line-oriented parser state
#[derive(Default)]
struct GraphReader {
    /// Set once a version header has been seen
    escaped: bool,
    seen_content: bool,
    pending: Option<PendingNode>,
    nodes: Vec<Node>,
    node_ids: HashSet<NodeId>,
    edges: Vec<(usize, Edge)>,
    vertices: Vec<(usize, Vertex)>,
}

struct PendingNode {
    line: usize,
    id: NodeId,
    text: Option<String>,
    concepts: Vec<String>,
}

impl GraphReader {
    fn feed(&mut self, line_no: usize, line: &str) -> StorageResult<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        if let Some(version) = line.strip_prefix(HEADER_PREFIX) {
            if self.seen_content {
                return Err(StorageError::parse(line_no, "version header after content"));
            }
            let version = version.trim();
            if version != FORMAT_VERSION {
                return Err(StorageError::UnsupportedVersion(version.to_string()));
            }
            self.escaped = true;
            self.seen_content = true;
            return Ok(());
        }
        self.seen_content = true;

        if let Some(rest) = line.strip_prefix(NODE_ID) {
            self.flush()?;
            let id = parse_id(rest.trim(), line_no, "node ID")?;
            self.pending = Some(PendingNode {
                line: line_no,
                id,
                text: None,
                concepts: Vec::new(),
            });
        } else if let Some(rest) = line.strip_prefix(TEXT) {
            let escaped = self.escaped;
            let node = self.pending_mut(line_no, "Text")?;
            let raw = strip_one_space(rest);
            node.text = Some(if escaped { unescape(raw) } else { raw.to_string() });
        } else if let Some(rest) = line.strip_prefix(CONCEPTS) {
            let escaped = self.escaped;
            let node = self.pending_mut(line_no, "Concepts")?;
            node.concepts = split_concepts(strip_one_space(rest), escaped);
        } else if let Some(rest) = line.strip_prefix(EDGE) {
            self.flush()?;
            let edge = parse_edge(rest, line_no)?;
            self.edges.push((line_no, edge));
        } else if let Some(rest) = line.strip_prefix(VERTEX) {
            self.flush()?;
            let vertex = parse_vertex(rest, line_no, self.escaped)?;
            self.vertices.push((line_no, vertex));
        } else {
            return Err(StorageError::parse(line_no, format!("unrecognized line: {line:?}")));
        }

        Ok(())
    }

    fn pending_mut(&mut self, line_no: usize, field: &str) -> StorageResult<&mut PendingNode> {
        self.pending.as_mut().ok_or_else(|| {
            StorageError::parse(line_no, format!("{field} line outside a node record"))
        })
    }

    /// Move the in-progress node record, if any, into the result
    fn flush(&mut self) -> StorageResult<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let text = pending.text.ok_or_else(|| {
            StorageError::parse(pending.line, format!("node {} has no Text line", pending.id))
        })?;
        if !self.node_ids.insert(pending.id) {
            return Err(StorageError::parse(
                pending.line,
                format!("duplicate node ID {}", pending.id),
            ));
        }
        self.nodes.push(Node::new(pending.id, text, pending.concepts));
        Ok(())
    }

    fn finish(mut self) -> StorageResult<ConceptGraph> {
        self.flush()?;

        for (line, edge) in &self.edges {
            warn_unknown(&self.node_ids, "edge", *line, &[edge.source, edge.target]);
        }
        for (line, vertex) in &self.vertices {
            warn_unknown(&self.node_ids, "vertex", *line, &[vertex.source, vertex.target]);
        }

        Ok(ConceptGraph::from_parts(
            self.nodes,
            self.edges.into_iter().map(|(_, e)| e).collect(),
            self.vertices.into_iter().map(|(_, v)| v).collect(),
        ))
    }
}

/// Dangling endpoints are kept as written; the file stays loadable.
fn warn_unknown(known: &HashSet<NodeId>, kind: &str, line: usize, endpoints: &[NodeId]) {
    for node in endpoints.iter().filter(|n| !known.contains(*n)) {
        tracing::warn!(kind, line, node = %node, "graph file references unknown node");
    }
}

fn parse_id(raw: &str, line: usize, what: &str) -> StorageResult<NodeId> {
    raw.parse::<u64>()
        .map(NodeId::new)
        .map_err(|e| StorageError::parse(line, format!("invalid {what} {raw:?}: {e}")))
}

/// Value of a `Name: value` segment
fn field<'a>(segment: &'a str, name: &str, line: usize) -> StorageResult<&'a str> {
    segment
        .trim_start()
        .strip_prefix(name)
        .and_then(|s| s.strip_prefix(':'))
        .ok_or_else(|| StorageError::parse(line, format!("expected field {name}")))
}

fn parse_endpoints<'a>(
    rest: &'a str,
    line: usize,
    last: &str,
) -> StorageResult<(NodeId, NodeId, &'a str)> {
    let mut parts = rest.splitn(3, SEPARATOR);
    let source = field(parts.next().unwrap_or_default(), "SourceID", line)?;
    let target = field(parts.next().unwrap_or_default(), "TargetID", line)?;
    let value = field(parts.next().unwrap_or_default(), last, line)?;
    Ok((
        parse_id(source.trim(), line, "source ID")?,
        parse_id(target.trim(), line, "target ID")?,
        value,
    ))
}

fn parse_edge(rest: &str, line: usize) -> StorageResult<Edge> {
    let (source, target, weight) = parse_endpoints(rest, line, "Weight")?;
    let weight = weight.trim();
    let weight: f64 = weight
        .parse()
        .map_err(|e| StorageError::parse(line, format!("invalid weight {weight:?}: {e}")))?;
    if !(0.0..=1.0).contains(&weight) {
        return Err(StorageError::parse(line, format!("weight {weight} outside [0, 1]")));
    }
    Ok(Edge::new(source, target, weight))
}

fn parse_vertex(rest: &str, line: usize, escaped: bool) -> StorageResult<Vertex> {
    let (source, target, concept) = parse_endpoints(rest, line, "Concept")?;
    let concept = strip_one_space(concept);
    let concept = if escaped { unescape(concept) } else { concept.to_string() };
    Ok(Vertex::new(source, target, concept))
}

fn strip_one_space(s: &str) -> &str {
    s.strip_prefix(' ').unwrap_or(s)
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Concepts also escape `,`; an empty concept is written as `\e` so a
/// lone empty label is distinguishable from no labels at all.
fn escape_concept(concept: &str) -> String {
    if concept.is_empty() {
        return EMPTY_CONCEPT.to_string();
    }
    escape_text(concept).replace(',', "\\,")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            push_escaped(&mut out, chars.next());
        } else {
            out.push(c);
        }
    }
    out
}

fn push_escaped(out: &mut String, next: Option<char>) {
    match next {
        Some('n') => out.push('\n'),
        Some('r') => out.push('\r'),
        Some('e') => {}
        Some(other) => out.push(other),
        None => out.push('\\'),
    }
}

/// Split a concepts line on unescaped `", "`.
fn split_concepts(raw: &str, escaped: bool) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    if !escaped {
        return raw.split(SEPARATOR).map(str::to_string).collect();
    }

    let mut concepts = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => push_escaped(&mut current, chars.next()),
            ',' if chars.peek() == Some(&' ') => {
                chars.next();
                concepts.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    concepts.push(current);
    concepts
}

/// Graph store backed by a single flat-text file
///
/// Saves go through a sibling temporary file that is renamed over the
/// destination, so a crash mid-write never leaves a truncated graph.
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    path: PathBuf,
}

impl FlatFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "graph".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl GraphStore for FlatFileStore {
    fn load_graph(&self) -> StorageResult<ConceptGraph> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no graph file yet, starting empty");
                return Ok(ConceptGraph::new());
            }
            Err(e) => return Err(e.into()),
        };
        read_graph(BufReader::new(file))
    }

    fn save_graph(&self, graph: &ConceptGraph) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.temp_path();
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write_graph(graph, &mut writer)?;
        let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), nodes = graph.node_count(), "graph saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn render(graph: &ConceptGraph) -> String {
        let mut buf = Vec::new();
        write_graph(graph, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn parse(text: &str) -> StorageResult<ConceptGraph> {
        read_graph(text.as_bytes())
    }

    #[test]
    fn test_write_format() {
        let mut graph = ConceptGraph::new();
        graph.ingest("first note", tags(&["b", "c"])).unwrap();
        graph.ingest("second note", tags(&["a", "b"])).unwrap();

        let expected = "\
# notegraph v1
Node ID: 1
Text: first note
Concepts: b, c

Node ID: 2
Text: second note
Concepts: a, b

Edge: SourceID: 2, TargetID: 1, Weight: 0.333333
Vertex: SourceID: 2, TargetID: 1, Concept: b
";
        assert_eq!(render(&graph), expected);
    }

    #[test]
    fn test_round_trip_single_node_and_edge() {
        let graph = ConceptGraph::from_parts(
            vec![Node::new(NodeId::new(1), "hello", tags(&["x", "y"]))],
            vec![Edge::new(NodeId::new(1), NodeId::new(2), 0.5)],
            Vec::new(),
        );

        let loaded = parse(&render(&graph)).unwrap();
        assert_eq!(loaded.nodes(), graph.nodes());
        assert_eq!(loaded.edges(), graph.edges());
        assert_eq!(loaded.next_id(), Some(NodeId::new(2)));
    }

    #[test]
    fn test_final_record_is_not_dropped() {
        let loaded = parse("# notegraph v1\nNode ID: 7\nText: only one\nConcepts: a\n").unwrap();
        assert_eq!(loaded.node_count(), 1);
        assert_eq!(loaded.nodes()[0].id, NodeId::new(7));
    }

    #[test]
    fn test_multi_word_text_preserved() {
        let loaded = parse("Node ID: 1\nText: a note  with   spacing \nConcepts: x\n").unwrap();
        assert_eq!(loaded.nodes()[0].text, "a note  with   spacing ");
    }

    #[test]
    fn test_escaping_round_trip() {
        let mut graph = ConceptGraph::new();
        graph.ingest("line one\nline two \\ done", tags(&["salt, pepper", "x"])).unwrap();
        graph.ingest("other", tags(&["salt, pepper"])).unwrap();

        let text = render(&graph);
        assert_eq!(text.lines().filter(|l| l.starts_with("Node ID:")).count(), 2);

        let loaded = parse(&text).unwrap();
        assert_eq!(loaded.nodes(), graph.nodes());
        assert_eq!(loaded.vertices(), graph.vertices());
        assert_eq!(loaded.vertices()[0].concept, "salt, pepper");
    }

    #[test]
    fn test_empty_concepts() {
        let mut graph = ConceptGraph::new();
        graph.ingest("untagged", Vec::new()).unwrap();

        let loaded = parse(&render(&graph)).unwrap();
        assert!(loaded.nodes()[0].concepts.is_empty());
    }

    #[test]
    fn test_legacy_file_loads() {
        let legacy = "\
Node ID: 2
Text: hello world
Concepts: x, y

Node ID: 3
Text: C:\\notes
Concepts: y

Edge: SourceID: 3, TargetID: 2, Weight: 0.500000
";
        let loaded = parse(legacy).unwrap();
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.nodes()[1].text, "C:\\notes");
        assert_eq!(loaded.edge_count(), 1);
        assert_eq!(loaded.vertex_count(), 0);
        assert_eq!(loaded.next_id(), Some(NodeId::new(4)));
    }

    #[test]
    fn test_malformed_numeric_fields() {
        let err = parse("Node ID: abc\n").unwrap_err();
        assert!(matches!(err, StorageError::Parse { line: 1, .. }));

        let err = parse("Node ID: 1\nText: t\nConcepts: a\n\nEdge: SourceID: 1, TargetID: 1, Weight: heavy\n")
            .unwrap_err();
        assert!(matches!(err, StorageError::Parse { line: 5, .. }));
    }

    #[test]
    fn test_weight_out_of_range_rejected() {
        let err = parse("Node ID: 1\nText: t\nConcepts: a\nEdge: SourceID: 1, TargetID: 1, Weight: 1.5\n")
            .unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
    }

    #[test]
    fn test_unknown_endpoints_are_kept() {
        let loaded = parse(
            "# notegraph v1\nNode ID: 1\nText: t\nConcepts: a\n\
             Edge: SourceID: 1, TargetID: 9, Weight: 0.5\n\
             Vertex: SourceID: 9, TargetID: 1, Concept: a\n",
        )
        .unwrap();
        assert_eq!(loaded.node_count(), 1);
        assert_eq!(loaded.edges(), &[Edge::new(NodeId::new(1), NodeId::new(9), 0.5)]);
        assert_eq!(loaded.vertex_count(), 1);
    }

    #[test]
    fn test_max_node_id_loads_without_overflow() {
        let loaded = parse("Node ID: 18446744073709551615\nText: t\nConcepts: a\n").unwrap();
        assert_eq!(loaded.nodes()[0].id, NodeId::new(u64::MAX));
        assert_eq!(loaded.next_id(), None);
    }

    #[test]
    fn test_lone_empty_concept_round_trip() {
        let mut graph = ConceptGraph::new();
        graph.ingest("first", tags(&[""])).unwrap();
        graph.ingest("second", tags(&[""])).unwrap();
        graph.ingest("third", tags(&["", "a"])).unwrap();

        let text = render(&graph);
        assert!(text.contains("Concepts: \\e\n"));

        let loaded = parse(&text).unwrap();
        assert_eq!(loaded.nodes(), graph.nodes());
        assert_eq!(loaded.nodes()[0].concepts, vec![""]);
        assert_eq!(loaded.vertices(), graph.vertices());
        for vertex in loaded.vertices() {
            let source = loaded.get_node(vertex.source).unwrap();
            assert!(source.has_concept(&vertex.concept));
        }
    }

    #[test]
    fn test_missing_text_line_rejected() {
        let err = parse("Node ID: 1\nConcepts: a\nNode ID: 2\nText: t\n").unwrap_err();
        assert!(matches!(err, StorageError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let err = parse("Node ID: 1\nText: a\nNode ID: 1\nText: b\n").unwrap_err();
        assert!(matches!(err, StorageError::Parse { .. }));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let err = parse("# notegraph v2\n").unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedVersion(v) if v == "2"));
    }

    #[test]
    fn test_unrecognized_line_rejected() {
        let err = parse("Node ID: 1\nText: a\nColour: blue\n").unwrap_err();
        assert!(matches!(err, StorageError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path().join("absent.txt"));
        assert_eq!(store.load_graph().unwrap().node_count(), 0);
    }

    #[test]
    fn test_store_save_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.txt");
        let store = FlatFileStore::new(&path);

        let mut graph = ConceptGraph::new();
        graph.ingest("a", tags(&["x"])).unwrap();
        store.save_graph(&graph).unwrap();
        graph.ingest("b", tags(&["x"])).unwrap();
        store.save_graph(&graph).unwrap();

        assert!(!store.temp_path().exists());
        let loaded = store.load_graph().unwrap();
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.edge_count(), 1);
    }

    #[test]
    fn test_store_unreadable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path());
        assert!(matches!(store.load_graph().unwrap_err(), StorageError::Io(_)));
    }
}

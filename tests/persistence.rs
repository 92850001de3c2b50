//! Graph and recordings survive a restart

mod common;

use common::TestApp;
use notegraph::collaborators::MockCollaborators;
use notegraph::storage::read_graph;
use notegraph::NodeId;
use std::fs::File;
use std::io::BufReader;

#[tokio::test]
async fn restart_restores_graph_and_resumes_ids() {
    let app = TestApp::new(
        MockCollaborators::new()
            .with_transcription("line one\nline two, with comma")
            .with_tags(["graphs", "notes, misc"]),
    );
    app.pipeline.process(vec![1, 2, 3]).await.unwrap();
    app.pipeline.process(vec![4, 5, 6]).await.unwrap();
    let before = app.pipeline.engine().snapshot();

    let reopened = app.restart(MockCollaborators::new().with_tags(["graphs"]));
    let restored = reopened.engine().snapshot();
    assert_eq!(restored.nodes(), before.nodes());
    assert_eq!(restored.edges(), before.edges());
    assert_eq!(restored.vertices(), before.vertices());
    assert_eq!(
        restored.get_node(NodeId::new(1)).unwrap().text,
        "line one\nline two, with comma"
    );
    assert_eq!(reopened.recordings().count().unwrap(), 2);

    let third = reopened.process(vec![7]).await.unwrap();
    assert_eq!(third.node_id, NodeId::new(3));
    // shares "graphs" with both earlier notes
    assert_eq!(third.edges_added, 2);
    assert_eq!(third.vertices_added, 2);
}

#[tokio::test]
async fn saved_file_is_readable_on_its_own() {
    let app = TestApp::new(MockCollaborators::new().with_tags(["a", "b"]));
    app.pipeline.process(vec![1]).await.unwrap();
    app.pipeline.process(vec![2]).await.unwrap();

    let file = File::open(app.graph_path()).unwrap();
    let graph = read_graph(BufReader::new(file)).unwrap();
    assert_eq!(graph.node_count(), 2);
    assert_eq!(graph.edge_count(), 1);
    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.next_id(), Some(NodeId::new(3)));
}

#[tokio::test]
async fn recording_links_back_to_its_node() {
    let app = TestApp::new(MockCollaborators::new().with_tags(["solo"]));
    let outcome = app.pipeline.process(vec![9; 32]).await.unwrap();

    let recent = app.pipeline.recordings().list_recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, outcome.recording_id);
    assert_eq!(recent[0].node_id, Some(outcome.node_id));
    assert_eq!(recent[0].tags, vec!["solo"]);
    assert_eq!(std::fs::read(&recent[0].audio_path).unwrap(), vec![9; 32]);
}

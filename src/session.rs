//! Per-map session state
//!
//! A session owns the current map, its viewport and the last error. Each
//! generation request takes a ticket; a completion is applied only if its
//! ticket is still the latest, so an older response that lands after a
//! newer one is dropped. Each action attempt leaves at most one error
//! message behind.
//!
//! `generate_from_text` and `load_file` borrow the session for the whole
//! call and so run one request at a time. To keep several requests in
//! flight, take a ticket with `begin_request`, await
//! `ResilientGenerator::generate_structure` without holding the session,
//! then hand the result to `complete`.

use std::collections::HashSet;
use std::path::Path;

use mindmap_types::{MapNode, MindMapNode, PositionedNode};
use tracing::{debug, info, warn};
use viewport::{SurfaceSize, ViewportConfig, ViewportController};

use crate::ai::ResilientGenerator;
use crate::config::MindMapConfig;
use crate::error::MindMapResult;
use crate::export::export_lines;
use crate::extract::TextExtractor;
use crate::graph::{highlight_ids, LayoutEngine};

/// A built tree together with its layout
#[derive(Debug, Clone, PartialEq)]
pub struct MindMap {
    pub tree: MindMapNode,
    pub positioned: PositionedNode,
}

impl MindMap {
    pub fn from_tree(tree: MindMapNode, layout: &LayoutEngine) -> Self {
        let positioned = layout.layout(&tree);
        Self { tree, positioned }
    }
}

/// Identifies one generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What happened to a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result replaced the current map
    Applied,
    /// A newer request was issued; the result was dropped
    Stale,
    /// The request failed; the error message was replaced
    Failed,
}

#[derive(Debug, Clone)]
pub struct MapSession {
    layout: LayoutEngine,
    viewport_config: ViewportConfig,
    surface: SurfaceSize,
    latest: u64,
    current: Option<MindMap>,
    viewport: Option<ViewportController>,
    error: Option<String>,
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new(
            LayoutEngine::default(),
            ViewportConfig::default(),
            SurfaceSize::default(),
        )
    }
}

impl MapSession {
    pub fn new(
        layout: LayoutEngine,
        viewport_config: ViewportConfig,
        surface: SurfaceSize,
    ) -> Self {
        Self {
            layout,
            viewport_config,
            surface,
            latest: 0,
            current: None,
            viewport: None,
            error: None,
        }
    }

    pub fn from_config(config: &MindMapConfig) -> Self {
        Self::new(
            LayoutEngine::new(config.layout.clone()),
            config.viewport_config(),
            config.surface_size(),
        )
    }

    pub fn map(&self) -> Option<&MindMap> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn viewport(&self) -> Option<&ViewportController> {
        self.viewport.as_ref()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut ViewportController> {
        self.viewport.as_mut()
    }

    /// Start an action: issues a fresh ticket and clears the previous error
    pub fn begin_request(&mut self) -> RequestTicket {
        self.latest += 1;
        self.error = None;
        debug!("Issued request ticket {}", self.latest);
        RequestTicket(self.latest)
    }

    pub fn is_latest(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }

    /// Apply a finished request if it is still the latest
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: MindMapResult<MindMapNode>,
    ) -> Completion {
        if !self.is_latest(ticket) {
            debug!(
                "Dropping result of request {} (latest is {})",
                ticket.0, self.latest
            );
            return Completion::Stale;
        }

        match result {
            Ok(tree) => {
                self.replace_tree(tree);
                Completion::Applied
            }
            Err(e) => {
                warn!("Request {} failed: {}", ticket.0, e);
                self.error = Some(e.user_message());
                Completion::Failed
            }
        }
    }

    /// Replace the map without a generation round trip
    pub fn replace_tree(&mut self, tree: MindMapNode) {
        let map = MindMap::from_tree(tree, &self.layout);
        self.viewport = Some(ViewportController::fitted(
            self.viewport_config.clone(),
            self.surface,
            &map.positioned,
        ));
        info!("Applied mind map with {} node(s)", map.positioned.node_count());
        self.current = Some(map);
        self.error = None;
    }

    /// Generate a map from pasted text
    ///
    /// Holds `&mut self` across the call; see the module docs for running
    /// requests concurrently.
    pub async fn generate_from_text(
        &mut self,
        generator: &ResilientGenerator,
        text: &str,
    ) -> Completion {
        let ticket = self.begin_request();
        let result = generator.generate_structure(text).await;
        self.complete(ticket, result)
    }

    /// Extract a file's text and generate a map from it; sequential like
    /// `generate_from_text`
    pub async fn load_file(
        &mut self,
        extractor: &dyn TextExtractor,
        generator: &ResilientGenerator,
        path: &Path,
    ) -> Completion {
        let ticket = self.begin_request();
        let result = match extractor.extract(path) {
            Ok(text) => generator.generate_structure(&text).await,
            Err(e) => Err(e.into()),
        };
        self.complete(ticket, result)
    }

    /// Ids to highlight for a query; empty without a map
    pub fn highlights(&self, query: &str) -> HashSet<String> {
        self.current
            .as_ref()
            .map(|map| highlight_ids(query, &map.positioned))
            .unwrap_or_default()
    }

    pub fn export_lines(&self) -> Option<Vec<String>> {
        self.current.as_ref().map(|map| export_lines(&map.tree))
    }

    /// Track the rendering surface; the view box is left as is
    pub fn set_surface_size(&mut self, width: f64, height: f64) {
        self.surface = SurfaceSize::new(width, height);
        if let Some(viewport) = self.viewport.as_mut() {
            viewport.set_surface_size(width, height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, AiResult, RetryPolicy, Sleeper, StructureGenerator};
    use crate::error::MindMapError;
    use crate::extract::FileTextExtractor;
    use async_trait::async_trait;
    use mindmap_types::Point;
    use std::sync::Arc;
    use std::time::Duration;

    struct FixedGenerator(AiResult<&'static str>);

    #[async_trait]
    impl StructureGenerator for FixedGenerator {
        async fn generate(&self, _document_text: &str) -> AiResult<String> {
            match &self.0 {
                Ok(body) => Ok(body.to_string()),
                Err(_) => Err(AiError::AuthenticationError),
            }
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn generator(outcome: AiResult<&'static str>) -> ResilientGenerator {
        ResilientGenerator::new(Arc::new(FixedGenerator(outcome)), RetryPolicy::default())
            .with_sleeper(Arc::new(NoSleep))
    }

    const RECORDS: &str = r#"[
        {"id":"a","parentId":"","topic":"Root","content":"about rust"},
        {"id":"b","parentId":"a","topic":"Child","content":""}
    ]"#;

    fn tree(topic: &str) -> MindMapNode {
        MindMapNode::new("a", topic, "")
    }

    #[tokio::test]
    async fn test_concurrent_requests_keep_the_newest() {
        let mut session = MapSession::default();
        let older_gen = generator(Ok(RECORDS));
        let newer_gen = generator(Ok(r#"[{"id":"n","parentId":"","topic":"Newer","content":""}]"#));

        let older = session.begin_request();
        let newer = session.begin_request();
        let (older_result, newer_result) = tokio::join!(
            older_gen.generate_structure("first"),
            newer_gen.generate_structure("second"),
        );

        assert_eq!(session.complete(newer, newer_result), Completion::Applied);
        assert_eq!(session.complete(older, older_result), Completion::Stale);
        assert_eq!(session.map().unwrap().tree.topic, "Newer");
        assert!(session.error().is_none());
    }

    #[test]
    fn test_stale_completion_is_dropped() {
        let mut session = MapSession::default();
        let first = session.begin_request();
        let second = session.begin_request();
        assert!(first < second);

        assert_eq!(session.complete(second, Ok(tree("Newer"))), Completion::Applied);
        assert_eq!(session.complete(first, Ok(tree("Older"))), Completion::Stale);
        assert_eq!(session.map().unwrap().tree.topic, "Newer");
    }

    #[test]
    fn test_stale_failure_does_not_set_error() {
        let mut session = MapSession::default();
        let first = session.begin_request();
        let _second = session.begin_request();
        let outcome = session.complete(
            first,
            Err(MindMapError::PermanentService {
                message: "late".into(),
            }),
        );
        assert_eq!(outcome, Completion::Stale);
        assert!(session.error().is_none());
    }

    #[test]
    fn test_error_is_replaced_not_accumulated() {
        let mut session = MapSession::default();
        let ticket = session.begin_request();
        session.complete(ticket, Err(MindMapError::UnsupportedFormat("pdf".into())));
        assert!(session.error().unwrap().contains("pdf"));

        let ticket = session.begin_request();
        assert!(session.error().is_none());
        session.complete(
            ticket,
            Err(MindMapError::TransientService {
                attempts: 3,
                message: "network".into(),
            }),
        );
        let message = session.error().unwrap();
        assert!(message.contains("unreachable"));
        assert!(!message.contains("pdf"));
    }

    #[test]
    fn test_failure_keeps_previous_map() {
        let mut session = MapSession::default();
        session.replace_tree(tree("Kept"));
        let ticket = session.begin_request();
        assert_eq!(
            session.complete(ticket, Err(MindMapError::Config("x".into()))),
            Completion::Failed
        );
        assert_eq!(session.map().unwrap().tree.topic, "Kept");
    }

    #[test]
    fn test_viewport_recreated_on_replace() {
        let mut session = MapSession::default();
        assert!(session.viewport().is_none());

        session.replace_tree(tree("One"));
        session.viewport_mut().unwrap().pan_by(500.0, 500.0);
        let panned = session.viewport().unwrap().view_box();

        session.replace_tree(tree("Two"));
        let fitted = session.viewport().unwrap().view_box();
        assert_ne!(panned, fitted);
        // single 180x60 box plus 80 spacing on each side
        assert_eq!((fitted.x, fitted.y), (-80.0, -80.0));
        assert_eq!((fitted.width, fitted.height), (340.0, 220.0));
    }

    #[test]
    fn test_surface_size_forwarded() {
        let mut session = MapSession::default();
        session.replace_tree(tree("One"));
        session.set_surface_size(500.0, 400.0);
        let viewport = session.viewport().unwrap();
        assert_eq!(viewport.surface(), SurfaceSize::new(500.0, 400.0));
        let scene = viewport.to_scene(Point::new(0.0, 0.0));
        assert_eq!(scene, Point::new(-80.0, -80.0));
    }

    #[tokio::test]
    async fn test_generate_from_text_applies_and_searches() {
        let mut session = MapSession::default();
        let outcome = session
            .generate_from_text(&generator(Ok(RECORDS)), "notes")
            .await;
        assert_eq!(outcome, Completion::Applied);

        let map = session.map().unwrap();
        assert_eq!(map.positioned.children[0].y, 140.0);
        assert_eq!(session.highlights("RUST"), ["a".to_string()].into_iter().collect());
        assert_eq!(session.export_lines().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_generation_failure_sets_single_message() {
        let mut session = MapSession::default();
        let outcome = session
            .generate_from_text(&generator(Err(AiError::AuthenticationError)), "notes")
            .await;
        assert_eq!(outcome, Completion::Failed);
        assert!(session.error().unwrap().starts_with("Mind map generation failed"));
        assert!(session.map().is_none());
        assert!(session.highlights("rust").is_empty());
    }

    #[tokio::test]
    async fn test_load_file_reports_unsupported_format() {
        let mut session = MapSession::default();
        let outcome = session
            .load_file(
                &FileTextExtractor,
                &generator(Ok(RECORDS)),
                Path::new("deck.pptx"),
            )
            .await;
        assert_eq!(outcome, Completion::Failed);
        assert!(session.error().unwrap().contains("pptx"));
    }

    #[tokio::test]
    async fn test_load_file_generates_from_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "Rust ownership").unwrap();

        let mut session = MapSession::default();
        let outcome = session
            .load_file(&FileTextExtractor, &generator(Ok(RECORDS)), &path)
            .await;
        assert_eq!(outcome, Completion::Applied);
        assert_eq!(session.map().unwrap().tree.id, "a");
    }
}

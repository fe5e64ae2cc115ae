//! Orchestrator: routes user input to skill activation and the session.
//!
//! Owns the registry, the conversation session and the tool settings. Each
//! turn builds a [`ToolDispatcher`] that borrows the active skill, so no
//! shared state outlives a call.

use tracing::{debug, info};

use skillbot_core::config::Config;
use skillbot_core::utils::{expand_home, truncate_with_marker};

use crate::context::{build_activation_message, build_system_prompt, ContextAssembler};
use crate::session::{build_session, ConversationSession};
use crate::skills::SkillRegistry;
use crate::tools::{ToolDispatcher, ToolSettings};

/// Outcome of one user turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReply {
    /// Skill activated by this input, if any.
    pub activated: Option<String>,
    /// Final text from the model.
    pub reply: String,
}

pub struct Orchestrator {
    registry: SkillRegistry,
    session: Box<dyn ConversationSession>,
    settings: ToolSettings,
    /// Cap on the injected skill context; 0 disables it.
    max_skill_context_chars: usize,
}

impl Orchestrator {
    /// Wire the parts together and open the chat with the skill summary.
    pub fn new(
        registry: SkillRegistry,
        mut session: Box<dyn ConversationSession>,
        settings: ToolSettings,
    ) -> Self {
        session.start_chat(&build_system_prompt(&registry.summarize()));
        info!(
            backend = session.backend(),
            skills = registry.len(),
            "Orchestrator ready"
        );
        Self {
            registry,
            session,
            settings,
            max_skill_context_chars: 0,
        }
    }

    /// Discover skills, build the configured backend and open the chat.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let skills_root = expand_home(&config.agent.skills_dir);
        let registry = SkillRegistry::discover(&skills_root);
        let session = build_session(config)?;
        let settings = ToolSettings::from_config(&config.tools);

        Ok(Self::new(registry, session, settings)
            .with_max_skill_context_chars(config.agent.max_skill_context_chars))
    }

    pub fn with_max_skill_context_chars(mut self, max: usize) -> Self {
        self.max_skill_context_chars = max;
        self
    }

    /// Activate the first skill named in `input`, if none is active yet.
    ///
    /// The skill context is injected into the session. The selection is only
    /// recorded once the injection finishes, so a cancelled route leaves no
    /// skill active. Returns the name of the activated skill.
    pub async fn route(&mut self, input: &str) -> Option<String> {
        if let Some(active) = self.registry.active() {
            debug!(skill = %active.name, "Skill already active, routing skipped");
            return None;
        }

        let skill = self.registry.match_input(input)?;
        let name = skill.name.clone();
        let mut context = ContextAssembler::assemble(skill);
        if self.max_skill_context_chars > 0 {
            context = truncate_with_marker(&context, self.max_skill_context_chars);
        }

        let tools = ToolDispatcher::new(&self.settings, Some(skill));
        self.session
            .inject_system_message(&build_activation_message(&name, &context), &tools)
            .await;

        self.registry.select(&name);
        Some(name)
    }

    /// Forward `input` as a conversational turn.
    pub async fn send(&mut self, input: &str) -> anyhow::Result<String> {
        let tools = ToolDispatcher::new(&self.settings, self.registry.active());
        self.session.send_message(input, &tools).await
    }

    /// Route, then send.
    pub async fn handle(&mut self, input: &str) -> anyhow::Result<TurnReply> {
        let activated = self.route(input).await;
        let reply = self.send(input).await?;
        Ok(TurnReply { activated, reply })
    }

    pub fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    /// Display name of the session backend.
    pub fn backend(&self) -> &str {
        self.session.backend()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skillbot_providers::ToolHandler;
    use std::fs;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Start(String),
        Inject(String),
        Send(String),
    }

    /// Records calls; each send reads a file through the tool handler.
    struct RecordingSession {
        events: Arc<Mutex<Vec<Event>>>,
        /// Injections that never complete before one goes through.
        stalled_injects: usize,
    }

    #[async_trait]
    impl ConversationSession for RecordingSession {
        fn start_chat(&mut self, system_prompt: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Start(system_prompt.to_string()));
        }

        async fn send_message(
            &mut self,
            text: &str,
            tools: &dyn ToolHandler,
        ) -> anyhow::Result<String> {
            self.events.lock().unwrap().push(Event::Send(text.to_string()));
            let listing = tools.call_tool("execute_script", r#"{"script_name":"hi.sh"}"#).await;
            Ok(listing)
        }

        async fn inject_system_message(&mut self, text: &str, _tools: &dyn ToolHandler) {
            if self.stalled_injects > 0 {
                self.stalled_injects -= 1;
                std::future::pending::<()>().await;
            }
            self.events
                .lock()
                .unwrap()
                .push(Event::Inject(text.to_string()));
        }

        fn backend(&self) -> &str {
            "Recording"
        }
    }

    fn create_skill(root: &Path, dir: &str, name: &str) {
        let skill = root.join(dir);
        fs::create_dir_all(skill.join("scripts")).unwrap();
        fs::write(
            skill.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: Handles {name} files\n---\nUse the scripts."),
        )
        .unwrap();
        fs::write(skill.join("scripts/hi.sh"), format!("echo from {name}")).unwrap();
    }

    fn orchestrator(root: &Path) -> (Orchestrator, Arc<Mutex<Vec<Event>>>) {
        stalling_orchestrator(root, 0)
    }

    fn stalling_orchestrator(
        root: &Path,
        stalled_injects: usize,
    ) -> (Orchestrator, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let session = RecordingSession {
            events: Arc::clone(&events),
            stalled_injects,
        };
        let settings = ToolSettings {
            working_dir: root.to_path_buf(),
            ..ToolSettings::default()
        };
        let orch = Orchestrator::new(SkillRegistry::discover(root), Box::new(session), settings);
        (orch, events)
    }

    #[tokio::test]
    async fn test_new_starts_chat_with_summary() {
        let dir = tempfile::tempdir().unwrap();
        create_skill(dir.path(), "a", "pdf");
        let (orch, events) = orchestrator(dir.path());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Start(prompt) => assert!(prompt.contains("- **pdf**: Handles pdf files...")),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(orch.backend(), "Recording");
    }

    #[tokio::test]
    async fn test_handle_activates_then_sends() {
        let dir = tempfile::tempdir().unwrap();
        create_skill(dir.path(), "a", "pdf");
        let (mut orch, events) = orchestrator(dir.path());

        let turn = orch.handle("Please convert this PDF").await.unwrap();
        assert_eq!(turn.activated.as_deref(), Some("pdf"));
        // The dispatcher saw the freshly activated skill.
        assert_eq!(turn.reply, "STDOUT:\nfrom pdf\n");
        assert_eq!(orch.registry().active().map(|s| s.name.as_str()), Some("pdf"));

        let events = events.lock().unwrap();
        match &events[1] {
            Event::Inject(msg) => {
                assert!(msg.starts_with("[SYSTEM: ACTIVATE SKILL 'pdf']"));
                assert!(msg.contains("Use the scripts."));
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[2], Event::Send("Please convert this PDF".into()));
    }

    #[tokio::test]
    async fn test_no_reactivation_while_skill_active() {
        let dir = tempfile::tempdir().unwrap();
        create_skill(dir.path(), "a", "pdf");
        create_skill(dir.path(), "b", "docx");
        let (mut orch, events) = orchestrator(dir.path());

        assert_eq!(orch.route("pdf please").await, Some("pdf".into()));
        assert_eq!(orch.route("now docx").await, None);
        assert_eq!(orch.registry().active().map(|s| s.name.as_str()), Some("pdf"));

        let injects = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::Inject(_)))
            .count();
        assert_eq!(injects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_route_leaves_skill_inactive() {
        let dir = tempfile::tempdir().unwrap();
        create_skill(dir.path(), "a", "pdf");
        let (mut orch, events) = stalling_orchestrator(dir.path(), 1);

        let cancelled =
            tokio::time::timeout(Duration::from_secs(30), orch.route("pdf please")).await;
        assert!(cancelled.is_err());
        assert!(orch.registry().active().is_none());

        // The next mention routes again and injects the context.
        assert_eq!(orch.route("pdf please").await, Some("pdf".into()));
        assert_eq!(orch.registry().active().map(|s| s.name.as_str()), Some("pdf"));
        let injects = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::Inject(_)))
            .count();
        assert_eq!(injects, 1);
    }

    #[tokio::test]
    async fn test_plain_input_only_sends() {
        let dir = tempfile::tempdir().unwrap();
        create_skill(dir.path(), "a", "pdf");
        let (mut orch, events) = orchestrator(dir.path());

        let turn = orch.handle("hello there").await.unwrap();
        assert_eq!(turn.activated, None);
        assert_eq!(turn.reply, "Error: No skill active.");
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_context_truncation() {
        let dir = tempfile::tempdir().unwrap();
        create_skill(dir.path(), "a", "pdf");
        let (orch, events) = orchestrator(dir.path());
        let mut orch = orch.with_max_skill_context_chars(10);

        orch.route("pdf").await;
        let events = events.lock().unwrap();
        match &events[1] {
            Event::Inject(msg) => {
                assert!(msg.ends_with(skillbot_core::utils::TRUNCATION_MARKER));
                assert!(!msg.contains("Use the scripts."));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_from_config_requires_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.agent.skills_dir = dir.path().display().to_string();
        assert!(Orchestrator::from_config(&config).is_err());

        config.providers.gemini.api_key = "key".into();
        let orch = Orchestrator::from_config(&config).unwrap();
        assert_eq!(orch.backend(), "Gemini");
        assert!(orch.registry().is_empty());
    }
}

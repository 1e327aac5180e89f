use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, error, info};

use crate::handlers::{self, Services, WATCH_URL};

/// A text message received from the chat platform.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    /// Platform message id, used when a reply should quote the original.
    pub message_id: Option<i32>,
    pub text: String,
}

/// Text produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Send as a reply to the originating message instead of a plain answer.
    pub quote: bool,
}

impl Reply {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quote: false,
        }
    }

    pub fn quote(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quote: true,
        }
    }
}

/// Outbound side of the chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn reply(&self, to: &InboundMessage, reply: Reply) -> Result<()>;
}

/// Condition deciding whether a rule applies to a message.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// `/name`, optionally addressed as `/name@bot`, followed by anything.
    Command(&'static str),
    #[allow(dead_code)]
    Prefix(String),
    /// Regex that has to match at the start of the text.
    Pattern(Regex),
}

impl Trigger {
    pub fn matches(&self, text: &str, bot_username: Option<&str>) -> bool {
        match self {
            Trigger::Command(name) => {
                let Some(token) = text.split_whitespace().next() else {
                    return false;
                };
                let Some(command) = token.strip_prefix('/') else {
                    return false;
                };
                let (command, mention) = match command.split_once('@') {
                    Some((command, mention)) => (command, Some(mention)),
                    None => (command, None),
                };
                if command != *name {
                    return false;
                }
                match (mention, bot_username) {
                    (Some(mention), Some(me)) => mention.eq_ignore_ascii_case(me),
                    _ => true,
                }
            }
            Trigger::Prefix(prefix) => text.starts_with(prefix.as_str()),
            Trigger::Pattern(re) => re.find(text).is_some_and(|m| m.start() == 0),
        }
    }
}

/// Handler a rule dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Help,
    Weather,
    VideoInfo,
    Look,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub trigger: Trigger,
    pub action: Action,
}

impl Rule {
    pub fn new(trigger: Trigger, action: Action) -> Self {
        Self { trigger, action }
    }
}

/// The bot's rules in evaluation order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(Trigger::Command("start"), Action::Start),
        Rule::new(Trigger::Command("help"), Action::Help),
        Rule::new(Trigger::Command("weather"), Action::Weather),
        Rule::new(Trigger::Pattern(WATCH_URL.clone()), Action::VideoInfo),
        Rule::new(Trigger::Command("look"), Action::Look),
    ]
}

/// Maps inbound messages to handlers. The first matching rule wins;
/// messages no rule matches get no reply.
pub struct Router {
    rules: Vec<Rule>,
    services: Services,
    bot_username: Option<String>,
}

impl Router {
    pub fn new(services: Services) -> Self {
        Self::with_rules(services, default_rules())
    }

    pub fn with_rules(services: Services, rules: Vec<Rule>) -> Self {
        Self {
            rules,
            services,
            bot_username: None,
        }
    }

    /// Only accept `/command@name` mentions addressed to this username.
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    pub fn route(&self, text: &str) -> Option<Action> {
        let me = self.bot_username.as_deref();
        self.rules
            .iter()
            .find(|rule| rule.trigger.matches(text, me))
            .map(|rule| rule.action)
    }

    /// Handle one message end to end. Never fails: handler errors are already
    /// turned into reply text, and send failures are only logged.
    pub async fn handle(&self, msg: &InboundMessage, messenger: &dyn Messenger) {
        let Some(action) = self.route(&msg.text) else {
            debug!("No rule matched message in chat {}", msg.chat_id);
            return;
        };

        info!("Chat {}: {:?} for {:?}", msg.chat_id, action, msg.text);

        let reply = handlers::run(action, &self.services, &msg.text).await;
        if let Err(e) = messenger.reply(msg, reply).await {
            error!("Failed to send reply to chat {}: {:#}", msg.chat_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{Fakes, ONE_CAT, SUNNY};
    use crate::handlers::{EMPTY_QUERY, HELP_TEXT, INVALID_LINK, NOT_FOUND, START_TEXT};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(i64, Reply)>>,
        fail: bool,
    }

    impl RecordingMessenger {
        fn sent(&self) -> Vec<(i64, Reply)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn reply(&self, to: &InboundMessage, reply: Reply) -> Result<()> {
            self.sent.lock().unwrap().push((to.chat_id, reply));
            if self.fail {
                anyhow::bail!("chat not found");
            }
            Ok(())
        }
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            chat_id: 42,
            message_id: Some(7),
            text: text.to_string(),
        }
    }

    async fn send(router: &Router, text: &str) -> Vec<(i64, Reply)> {
        let messenger = RecordingMessenger::default();
        router.handle(&message(text), &messenger).await;
        messenger.sent()
    }

    #[test]
    fn test_command_trigger() {
        let trigger = Trigger::Command("look");
        assert!(trigger.matches("/look", None));
        assert!(trigger.matches("/look cats", None));
        assert!(trigger.matches("/look@relay_bot cats", None));
        assert!(!trigger.matches("/lookup cats", None));
        assert!(!trigger.matches("look cats", None));
        assert!(!trigger.matches("/Look cats", None));
        assert!(!trigger.matches("", None));
        assert!(!trigger.matches("please /look cats", None));
    }

    #[test]
    fn test_command_trigger_checks_mention() {
        let trigger = Trigger::Command("help");
        assert!(trigger.matches("/help@Relay_Bot", Some("relay_bot")));
        assert!(!trigger.matches("/help@other_bot", Some("relay_bot")));
        assert!(trigger.matches("/help", Some("relay_bot")));
    }

    #[test]
    fn test_prefix_and_pattern_triggers() {
        let prefix = Trigger::Prefix("!w".to_string());
        assert!(prefix.matches("!weather", None));
        assert!(!prefix.matches(" !weather", None));

        let pattern = Trigger::Pattern(WATCH_URL.clone());
        assert!(pattern.matches("https://youtube.com/watch?v=abc", None));
        assert!(pattern.matches("http://www.youtube.com/watch?v=abc&t=1", None));
        assert!(!pattern.matches("see https://www.youtube.com/watch?v=abc", None));
        assert!(!pattern.matches("https://youtu.be/abc", None));
        assert!(!pattern.matches("https://www.youtube.com/watch?v=", None));
    }

    #[test]
    fn test_unanchored_pattern_only_matches_at_start() {
        let pattern = Trigger::Pattern(Regex::new(r"\d+").unwrap());
        assert!(pattern.matches("123 abc", None));
        assert!(!pattern.matches("abc 123", None));
    }

    #[test]
    fn test_route_default_rules() {
        let router = Router::new(Fakes::happy().services());
        assert_eq!(router.route("/start"), Some(Action::Start));
        assert_eq!(router.route("/help me"), Some(Action::Help));
        assert_eq!(router.route("/weather"), Some(Action::Weather));
        assert_eq!(router.route("/look cats"), Some(Action::Look));
        assert_eq!(
            router.route("https://www.youtube.com/watch?v=abc123"),
            Some(Action::VideoInfo)
        );
        assert_eq!(router.route("hello"), None);
        assert_eq!(router.route("/unknown"), None);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            Rule::new(Trigger::Prefix("/".to_string()), Action::Help),
            Rule::new(Trigger::Command("start"), Action::Start),
        ];
        let router = Router::with_rules(Fakes::happy().services(), rules);
        assert_eq!(router.route("/start"), Some(Action::Help));
    }

    #[tokio::test]
    async fn test_unmatched_messages_get_no_reply() {
        let fakes = Fakes::happy();
        let router = Router::new(fakes.services());
        for text in ["hello", "", "/unknown", "look cats", "https://youtu.be/abc"] {
            assert!(send(&router, text).await.is_empty(), "replied to {:?}", text);
        }
        assert_eq!(fakes.search_calls(), 0);
        assert_eq!(fakes.extract_calls(), 0);
    }

    #[tokio::test]
    async fn test_start_and_help_ignore_trailing_text() {
        let router = Router::new(Fakes::happy().services());
        for (text, expected) in [
            ("/start", START_TEXT),
            ("/start deep-link-payload", START_TEXT),
            ("/help", HELP_TEXT),
            ("/help please", HELP_TEXT),
        ] {
            let sent = send(&router, text).await;
            assert_eq!(sent, vec![(42, Reply::answer(expected))]);
        }
    }

    #[tokio::test]
    async fn test_weather_reply() {
        let router = Router::new(Fakes::happy().services());
        let sent = send(&router, "/weather").await;
        assert_eq!(sent.len(), 1);
        let text = &sent[0].1.text;
        assert!(text.contains("Minsk"));
        assert!(text.contains("5.0"));
        assert!(text.contains("облачно"));
    }

    #[tokio::test]
    async fn test_video_link_invokes_extractor() {
        let fakes = Fakes::happy();
        let router = Router::new(fakes.services());
        let sent = send(&router, "https://www.youtube.com/watch?v=abc123").await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.quote);
        assert!(sent[0].1.text.contains("Fireship"));
        assert_eq!(fakes.extract_calls(), 1);
    }

    #[tokio::test]
    async fn test_video_link_without_www_is_rejected() {
        let fakes = Fakes::happy();
        let router = Router::new(fakes.services());
        let sent = send(&router, "https://youtube.com/watch?v=abc123").await;
        assert_eq!(sent, vec![(42, Reply::quote(INVALID_LINK))]);
        assert_eq!(fakes.extract_calls(), 0);
    }

    #[tokio::test]
    async fn test_look_flow() {
        let fakes = Fakes::happy();
        let router = Router::new(fakes.services());

        let sent = send(&router, "/look ").await;
        assert_eq!(sent, vec![(42, Reply::quote(EMPTY_QUERY))]);
        assert_eq!(fakes.search_calls(), 0);

        let sent = send(&router, "/look cats").await;
        assert!(sent[0].1.text.contains("Cats!"));
        assert!(sent[0].1.text.contains("https://www.youtube.com/watch?v=xyz"));

        let empty = Fakes::new(Ok(SUNNY), Ok(r#"{"items":[]}"#), Ok(Default::default()));
        let router = Router::new(empty.services());
        let sent = send(&router, "/look cats").await;
        assert_eq!(sent, vec![(42, Reply::quote(NOT_FOUND))]);
    }

    #[tokio::test]
    async fn test_failing_providers_still_reply_once() {
        let fakes = Fakes::new(Err("weather down"), Err("search down"), Err("extractor down"));
        let router = Router::new(fakes.services());
        for text in [
            "/weather",
            "/look cats",
            "https://www.youtube.com/watch?v=abc123",
        ] {
            let sent = send(&router, text).await;
            assert_eq!(sent.len(), 1, "expected one reply to {:?}", text);
        }
    }

    #[tokio::test]
    async fn test_send_failure_does_not_propagate() {
        let router = Router::new(Fakes::new(Ok(SUNNY), Ok(ONE_CAT), Err("x")).services());
        let messenger = RecordingMessenger {
            fail: true,
            ..Default::default()
        };
        router.handle(&message("/help"), &messenger).await;
        router.handle(&message("/start"), &messenger).await;
        assert_eq!(messenger.sent().len(), 2);
    }
}

//! Topic gate: keeps the tutor on Data Structures & Algorithms.
//!
//! A pure classifier: a message containing any configured keyword
//! (case-insensitive) is redirected with a canned reply and never reaches
//! the model. Matching is by substring, so "sporty" matches "sport"; the
//! optional whole-word mode only matches keywords bounded by non-alphanumeric
//! characters.

use dsatutor_config::TopicGateConfig;

/// Outcome of classifying one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Redirect { keyword: String, reply: String },
}

impl GateDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, GateDecision::Redirect { .. })
    }
}

/// Keyword-based off-topic filter.
#[derive(Debug, Clone)]
pub struct TopicGate {
    enabled: bool,
    keywords: Vec<String>,
    redirect: String,
    whole_word: bool,
}

impl TopicGate {
    pub fn new<K, S>(keywords: K, redirect: impl Into<String>) -> Self
    where
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            enabled: true,
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            redirect: redirect.into(),
            whole_word: false,
        }
    }

    /// A gate that allows every message.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            keywords: Vec::new(),
            redirect: String::new(),
            whole_word: false,
        }
    }

    pub fn with_whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    pub fn from_config(config: &TopicGateConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        Self::new(&config.keywords, &config.redirect_message).with_whole_word(config.whole_word)
    }

    pub fn classify(&self, message: &str) -> GateDecision {
        if !self.enabled {
            return GateDecision::Allowed;
        }

        let lowered = message.to_lowercase();
        match self.keywords.iter().find(|k| self.matches(&lowered, k)) {
            Some(keyword) => GateDecision::Redirect {
                keyword: keyword.clone(),
                reply: self.redirect.clone(),
            },
            None => GateDecision::Allowed,
        }
    }

    fn matches(&self, haystack: &str, keyword: &str) -> bool {
        if !self.whole_word {
            return haystack.contains(keyword);
        }

        haystack.match_indices(keyword).any(|(start, _)| {
            let end = start + keyword.len();
            let before = haystack[..start].chars().next_back();
            let after = haystack[end..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> TopicGate {
        TopicGate::from_config(&TopicGateConfig::default())
    }

    #[test]
    fn dsa_questions_are_allowed() {
        let gate = gate();
        for msg in [
            "What is binary search?",
            "Explain quicksort in Rust, iteratively",
            "What is the time complexity of a hash table lookup?",
            "",
        ] {
            assert_eq!(gate.classify(msg), GateDecision::Allowed, "{msg}");
        }
    }

    #[test]
    fn keywords_redirect_case_insensitively() {
        let gate = gate();
        let decision = gate.classify("Tell me about FOOTBALL");
        match decision {
            GateDecision::Redirect { keyword, reply } => {
                assert_eq!(keyword, "football");
                assert_eq!(reply, dsatutor_config::DEFAULT_REDIRECT);
            }
            GateDecision::Allowed => panic!("expected redirect"),
        }

        assert!(gate.classify("Who is Ronaldo?").is_redirect());
        assert!(gate.classify("what's the weather like").is_redirect());
    }

    #[test]
    fn substring_matches_are_redirected() {
        // "sporty" contains "sport"; "foodie" contains "food".
        let gate = gate();
        assert!(gate.classify("I'm a sporty person, teach me BFS").is_redirect());
        assert!(gate.classify("Sorting algorithms for foodies").is_redirect());
    }

    #[test]
    fn whole_word_mode_ignores_embedded_keywords() {
        let gate = gate().with_whole_word(true);
        assert_eq!(gate.classify("I'm a sporty person, teach me BFS"), GateDecision::Allowed);
        assert!(gate.classify("Is chess a sport?").is_redirect());
        assert!(gate.classify("sport").is_redirect());
    }

    #[test]
    fn disabled_gate_allows_everything() {
        let config = TopicGateConfig {
            enabled: false,
            ..TopicGateConfig::default()
        };
        let gate = TopicGate::from_config(&config);
        assert_eq!(gate.classify("football football"), GateDecision::Allowed);
    }

    #[test]
    fn custom_keywords_are_normalized() {
        let gate = TopicGate::new(["  Cricket ", ""], "Back to DSA.");
        assert!(gate.classify("cricket scores?").is_redirect());
        assert_eq!(gate.classify("binary trees"), GateDecision::Allowed);
    }
}

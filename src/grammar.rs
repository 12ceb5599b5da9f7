//! # Grammars
//!
//! A grammar is Lark source text that is either known inline or fetched
//! lazily from a URI. Loading never fails outright: problems are recorded in
//! the grammar's `error` field so the IDE can display them.

use crate::fetch::Fetch;

use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////
// Values

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Grammar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Grammar {
    pub fn template() -> Self {
        Grammar {
            uri: None,
            content: Some(String::new()),
            error: Some(String::new()),
        }
    }

    pub fn from_uri(uri: &str) -> Self {
        Grammar {
            uri: Some(uri.to_owned()),
            ..Default::default()
        }
    }

    pub fn from_content(content: &str) -> Self {
        Grammar {
            content: Some(content.to_owned()),
            ..Default::default()
        }
    }

    fn failed(uri: &str, error: String) -> Self {
        Grammar {
            uri: Some(uri.to_owned()),
            content: Some(String::new()),
            error: Some(error),
        }
    }

    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Overwrite the fields present in `patch`, keeping all others.
    pub fn merge(&mut self, patch: GrammarPatch) {
        if let Some(uri) = patch.uri {
            self.uri = Some(uri);
        }
        if let Some(content) = patch.content {
            self.content = Some(content);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
    }
}

/// A partial grammar update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GrammarPatch {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GrammarPatch {
    pub fn content(content: &str) -> Self {
        GrammarPatch {
            content: Some(content.to_owned()),
            ..Default::default()
        }
    }
}

impl From<Grammar> for GrammarPatch {
    fn from(grammar: Grammar) -> Self {
        GrammarPatch {
            uri: grammar.uri,
            content: grammar.content,
            error: grammar.error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Loading

pub async fn load_grammar_from_uri(fetcher: &impl Fetch, uri: &str) -> Grammar {
    let response = match fetcher.get(uri).await {
        Ok(response) => response,
        Err(e) => {
            log::error!("Error loading grammar: {}", e);
            let message = if e.is_empty() {
                "Unknown error".to_owned()
            } else {
                e
            };
            return Grammar::failed(uri, message);
        }
    };

    if !response.ok() {
        log::error!(
            "Failed to load grammar from {}: {}",
            uri,
            response.status_text
        );
        return Grammar::failed(
            uri,
            format!("Failed to load grammar: {}", response.status_text),
        );
    }

    if response.body.is_empty() {
        log::error!("Grammar content is empty for {}", uri);
        return Grammar::failed(uri, "Grammar content is empty".to_owned());
    }

    Grammar {
        uri: Some(uri.to_owned()),
        content: Some(response.body),
        error: None,
    }
}

/// Resolve `grammar.content` from its URI.
///
/// A grammar that already has content, or that already failed to load, is
/// returned as-is unless `force` is set.
pub async fn load_grammar(
    fetcher: &impl Fetch,
    grammar: Grammar,
    force: bool,
) -> Grammar {
    let uri = match &grammar.uri {
        Some(uri) if !uri.is_empty() => uri.clone(),
        _ => {
            log::warn!("No grammar URI provided.");
            return grammar;
        }
    };

    if !force && (grammar.has_content() || grammar.has_error()) {
        log::debug!("Grammar already loaded from {}", uri);
        return grammar;
    }

    load_grammar_from_uri(fetcher, &uri).await
}

////////////////////////////////////////////////////////////////////////////////
// Downloading

/// A grammar packaged as a file for the user to save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarDownload {
    pub file_name: String,
    pub mime_type: &'static str,
    pub content: String,
}

pub fn download_grammar(name: &str, grammar: &Grammar) -> Option<GrammarDownload> {
    match &grammar.content {
        Some(content) if !content.is_empty() => Some(GrammarDownload {
            file_name: format!("{}.lark", name),
            mime_type: "text/plain",
            content: content.clone(),
        }),
        _ => {
            log::warn!("No content to download for the grammar.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchResponse;
    use std::cell::Cell;

    struct Scripted {
        response: Result<FetchResponse, String>,
        calls: Cell<usize>,
    }

    impl Scripted {
        fn new(response: Result<FetchResponse, String>) -> Self {
            Scripted {
                response,
                calls: Cell::new(0),
            }
        }

        fn body(body: &str) -> Self {
            Self::new(Ok(FetchResponse {
                status: 200,
                status_text: "OK".to_owned(),
                body: body.to_owned(),
            }))
        }
    }

    impl Fetch for Scripted {
        async fn get(&self, _uri: &str) -> Result<FetchResponse, String> {
            self.calls.set(self.calls.get() + 1);
            self.response.clone()
        }
    }

    #[test]
    fn template_values() {
        assert_eq!(
            Grammar::template(),
            Grammar {
                uri: None,
                content: Some(String::new()),
                error: Some(String::new()),
            }
        );
    }

    #[tokio::test]
    async fn loads_content() {
        let fetcher = Scripted::body("start: \"hello\" \"world\"");
        let grammar = load_grammar_from_uri(&fetcher, "test.lark").await;
        assert_eq!(
            grammar,
            Grammar {
                uri: Some("test.lark".to_owned()),
                content: Some("start: \"hello\" \"world\"".to_owned()),
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn http_failure_is_captured() {
        let fetcher = Scripted::new(Ok(FetchResponse {
            status: 404,
            status_text: "Not Found".to_owned(),
            body: String::new(),
        }));
        let grammar = load_grammar_from_uri(&fetcher, "missing.lark").await;
        assert_eq!(grammar.content.as_deref(), Some(""));
        assert_eq!(
            grammar.error.as_deref(),
            Some("Failed to load grammar: Not Found")
        );
    }

    #[tokio::test]
    async fn empty_body_is_an_error() {
        let fetcher = Scripted::body("");
        let grammar = load_grammar_from_uri(&fetcher, "empty.lark").await;
        assert_eq!(grammar.error.as_deref(), Some("Grammar content is empty"));
    }

    #[tokio::test]
    async fn transport_failure_keeps_message() {
        let fetcher = Scripted::new(Err("Network error".to_owned()));
        let grammar = load_grammar_from_uri(&fetcher, "a.lark").await;
        assert_eq!(grammar.error.as_deref(), Some("Network error"));

        let fetcher = Scripted::new(Err(String::new()));
        let grammar = load_grammar_from_uri(&fetcher, "a.lark").await;
        assert_eq!(grammar.error.as_deref(), Some("Unknown error"));
    }

    #[tokio::test]
    async fn unloaded_grammar_fetches_once() {
        let fetcher = Scripted::body("start: WORD");
        let grammar =
            load_grammar(&fetcher, Grammar::from_uri("a.lark"), false).await;
        assert_eq!(fetcher.calls.get(), 1);
        assert!(grammar.has_content() != grammar.has_error());
    }

    #[tokio::test]
    async fn loaded_grammar_is_left_alone() {
        let fetcher = Scripted::body("start: WORD");

        let loaded = Grammar {
            uri: Some("a.lark".to_owned()),
            content: Some("start: A".to_owned()),
            error: None,
        };
        assert_eq!(load_grammar(&fetcher, loaded.clone(), false).await, loaded);

        let failed = Grammar::failed("a.lark", "boom".to_owned());
        assert_eq!(load_grammar(&fetcher, failed.clone(), false).await, failed);

        assert_eq!(fetcher.calls.get(), 0);
    }

    #[tokio::test]
    async fn force_always_fetches() {
        let fetcher = Scripted::body("start: WORD");
        let failed = Grammar::failed("a.lark", "boom".to_owned());
        let grammar = load_grammar(&fetcher, failed, true).await;
        assert_eq!(fetcher.calls.get(), 1);
        assert_eq!(grammar.content.as_deref(), Some("start: WORD"));
        assert_eq!(grammar.error, None);
    }

    #[tokio::test]
    async fn no_uri_is_a_no_op() {
        let fetcher = Scripted::body("start: WORD");
        let grammar = Grammar::from_content("start: A");
        assert_eq!(load_grammar(&fetcher, grammar.clone(), true).await, grammar);
        assert_eq!(fetcher.calls.get(), 0);
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut grammar = Grammar {
            uri: Some("a.lark".to_owned()),
            content: Some("old".to_owned()),
            error: Some(String::new()),
        };
        grammar.merge(GrammarPatch::content("x"));
        assert_eq!(grammar.uri.as_deref(), Some("a.lark"));
        assert_eq!(grammar.content.as_deref(), Some("x"));
        assert_eq!(grammar.error.as_deref(), Some(""));

        let before = grammar.clone();
        grammar.merge(GrammarPatch::default());
        assert_eq!(grammar, before);
    }

    #[test]
    fn download_needs_content() {
        assert_eq!(download_grammar("empty", &Grammar::template()), None);

        let download =
            download_grammar("hello", &Grammar::from_content("start: A"))
                .unwrap();
        assert_eq!(download.file_name, "hello.lark");
        assert_eq!(download.mime_type, "text/plain");
        assert_eq!(download.content, "start: A");
    }
}

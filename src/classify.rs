//! Window-title classification.
//!
//! Titles of well-known applications follow a `"<left> - <Application>"`
//! shape. The trailing application name selects a rule, and the rule's
//! sub-parser pulls a context and a detail out of the left part.

use url::Url;

/// Separator between title components used by the supported applications.
const DELIMITER: &str = " - ";

/// Structured fields extracted from a window title.
///
/// Every field is empty when nothing could be extracted. `context` is only
/// set together with `app`, and `detail` only together with `context`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppFields {
    pub app: String,
    pub context: String,
    pub detail: String,
}

impl AppFields {
    fn app_only(app: &str) -> Self {
        Self {
            app: app.to_string(),
            ..Self::default()
        }
    }
}

/// Sub-parser output: `(context, detail)`.
type SubParser = fn(&str) -> Option<(String, String)>;

/// A classification rule keyed on the trailing application name.
struct AppRule {
    /// Exact trailing title component this rule matches.
    title_suffix: &'static str,
    /// Tag reported as `app` when the rule matches.
    app: &'static str,
    parse: SubParser,
}

/// Ordered rule table. The first rule whose suffix matches wins.
const RULES: &[AppRule] = &[
    AppRule {
        title_suffix: "Chromium",
        app: "browser",
        parse: parse_browser_title,
    },
    AppRule {
        title_suffix: "Visual Studio Code",
        app: "editor",
        parse: parse_editor_title,
    },
    AppRule {
        title_suffix: "xterm",
        app: "terminal",
        parse: parse_terminal_title,
    },
];

/// Classify a raw window title.
///
/// A title whose application is recognised keeps its `app` tag even when
/// the application-specific parser cannot make sense of the rest.
pub fn classify(title: &str) -> AppFields {
    let Some((left, application)) = split_application(title) else {
        return AppFields::default();
    };

    let Some(rule) = RULES.iter().find(|r| r.title_suffix == application) else {
        return AppFields::default();
    };

    match (rule.parse)(left) {
        Some((context, detail)) if !context.is_empty() => AppFields {
            app: rule.app.to_string(),
            context,
            detail,
        },
        _ => AppFields::app_only(rule.app),
    }
}

/// Split a title into `(left, application)` on the last delimiter.
fn split_application(title: &str) -> Option<(&str, &str)> {
    let (left, right) = title.rsplit_once(DELIMITER)?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left, right))
}

/// Chromium titles end with the page URL, e.g. `"Docs - https://example.com/a"`.
///
/// The URL is whatever follows the last delimiter, or the whole text when
/// there is none. Scheme-less text needs a path (`example.com/page`) and a
/// dotted host, so titles such as `README.md` are not taken for hosts.
/// Hosts come back lowercased.
fn parse_browser_title(s: &str) -> Option<(String, String)> {
    let candidate = s
        .rsplit_once(DELIMITER)
        .map(|(_, url)| url)
        .unwrap_or(s)
        .trim();
    if candidate.is_empty() || candidate.contains(char::is_whitespace) {
        return None;
    }

    let url = if candidate.contains("://") {
        Url::parse(candidate).ok()?
    } else {
        if !candidate.contains('/') {
            return None;
        }
        let url = Url::parse(&format!("http://{candidate}")).ok()?;
        let host = url.host_str()?;
        if !host.contains('.') && host != "localhost" {
            return None;
        }
        url
    };

    let host = url.host_str()?.to_string();
    Some((host, url.path().to_string()))
}

/// VS Code titles look like `"main.rs - myproject"` (file, then workspace).
fn parse_editor_title(s: &str) -> Option<(String, String)> {
    let (file, workspace) = s.rsplit_once(DELIMITER)?;
    Some((workspace.trim().to_string(), file.trim().to_string()))
}

/// xterm titles look like `"~: bash"` (directory, then command).
fn parse_terminal_title(s: &str) -> Option<(String, String)> {
    let (dir, command) = s.split_once(':')?;
    Some((dir.to_string(), command.trim().to_string()))
}

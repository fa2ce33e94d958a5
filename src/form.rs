//! Login form discovery.
//!
//! Portal markup is uncontrolled third-party content, so this is a best-effort
//! heuristic: only the first form on the page is considered, and the username
//! and password fields are guessed by an ordered chain of matchers. When the
//! chain finds nothing, conventional field names are injected instead.

use crate::types::{FormFields, LoginForm};
use scraper::{ElementRef, Html};

/// An `<input>` of the discovered form, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputField {
    pub name: String,
    /// Lowercased `type` attribute, empty when absent.
    pub input_type: String,
    pub value: String,
}

/// Predicate deciding whether an input is a candidate for a credential field.
pub type Matcher = fn(&InputField) -> bool;

const USERNAME_KEYWORDS: &[&str] = &["user", "uname", "username", "account"];
const PASSWORD_KEYWORDS: &[&str] = &["pass", "pwd", "password"];

/// Tried in order; the first matcher with any hit decides.
pub const PASSWORD_MATCHERS: &[Matcher] = &[is_password_type, has_password_name];
pub const USERNAME_MATCHERS: &[Matcher] = &[has_username_name];

/// Conventional (username, password) names used when guessing fails.
pub const FALLBACK_PAIRS: &[(&str, &str)] = &[
    ("username", "password"),
    ("user", "pass"),
    ("user", "pwd"),
    ("account", "password"),
];

pub fn is_password_type(input: &InputField) -> bool {
    input.input_type == "password"
}

pub fn has_password_name(input: &InputField) -> bool {
    name_contains_any(&input.name, PASSWORD_KEYWORDS)
}

pub fn has_username_name(input: &InputField) -> bool {
    name_contains_any(&input.name, USERNAME_KEYWORDS)
}

fn name_contains_any(name: &str, keywords: &[&str]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Names of the inputs chosen for the credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldGuess {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// First input accepted by the earliest matcher that accepts any, skipping `exclude`.
fn first_match<'f>(
    inputs: &'f [InputField],
    matchers: &[Matcher],
    exclude: Option<&str>,
) -> Option<&'f InputField> {
    matchers.iter().find_map(|matcher| {
        inputs
            .iter()
            .filter(|input| Some(input.name.as_str()) != exclude)
            .find(|input| matcher(input))
    })
}

/// Guess the password field first so the username matcher can skip it.
pub fn guess_fields(inputs: &[InputField]) -> FieldGuess {
    let password = first_match(inputs, PASSWORD_MATCHERS, None).map(|i| i.name.clone());
    let username =
        first_match(inputs, USERNAME_MATCHERS, password.as_deref()).map(|i| i.name.clone());
    FieldGuess { username, password }
}

/// Inject the first fallback pair whose username key is free.
///
/// Only applies when the username appears nowhere in `fields`.
pub fn apply_fallback(fields: &mut FormFields, username: &str, password: &str) {
    if fields.values().any(|v| v == username) {
        return;
    }
    if let Some((user_key, pass_key)) = FALLBACK_PAIRS
        .iter()
        .find(|(user_key, _)| !fields.contains_key(*user_key))
    {
        fields.insert(user_key.to_string(), username.to_string());
        fields.insert(pass_key.to_string(), password.to_string());
    }
}

/// Named `<input>` as an [`InputField`].
fn input_field(input: ElementRef<'_>) -> Option<InputField> {
    let element = input.value();
    let name = element.attr("name").filter(|n| !n.is_empty())?;
    Some(InputField {
        name: name.to_string(),
        input_type: element.attr("type").unwrap_or("").to_lowercase(),
        value: element.attr("value").unwrap_or("").to_string(),
    })
}

/// The first form and the named inputs it owns, in document order.
///
/// A `<form>` written directly inside a `<table>` is left empty by the HTML5
/// tree builder while its inputs stay in the table cells. Ownership is
/// therefore taken as every input from the first form start up to the next
/// form start.
fn first_form(document: &Html) -> Option<(ElementRef<'_>, Vec<InputField>)> {
    let mut elements = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap);
    let form = elements.find(|e| e.value().name() == "form")?;
    let inputs = elements
        .take_while(|e| e.value().name() != "form")
        .filter(|e| e.value().name() == "input")
        .filter_map(input_field)
        .collect();
    Some((form, inputs))
}

/// Find the first form in `html` and build its submission payload.
///
/// A page without a form yields an empty [`LoginForm`].
pub fn discover_form(html: &str, username: &str, password: &str) -> LoginForm {
    let document = Html::parse_document(html);
    let Some((form, inputs)) = first_form(&document) else {
        return LoginForm::default();
    };

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    let mut fields: FormFields = inputs
        .iter()
        .map(|i| (i.name.clone(), i.value.clone()))
        .collect();

    let guess = guess_fields(&inputs);
    if let Some(name) = &guess.username {
        fields.insert(name.clone(), username.to_string());
    }
    if let Some(name) = &guess.password {
        fields.insert(name.clone(), password.to_string());
    }

    apply_fallback(&mut fields, username, password);

    LoginForm { action, fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(name: &str, input_type: &str) -> InputField {
        InputField {
            name: name.to_string(),
            input_type: input_type.to_string(),
            value: String::new(),
        }
    }

    #[test]
    fn test_no_form_returns_empty() {
        let form = discover_form("<html><body><p>Hello</p></body></html>", "u", "p");
        assert!(form.is_empty());
    }

    #[test]
    fn test_collects_hidden_fields_and_guesses() {
        let html = r#"
            <form action="/auth" method="post">
                <input type="hidden" name="csrf" value="abc123">
                <input type="text" name="j_username">
                <input type="password" name="j_password">
                <input type="submit" value="Go">
            </form>"#;
        let form = discover_form(html, "alice", "s3cret");
        assert_eq!(form.action.as_deref(), Some("/auth"));
        assert_eq!(form.fields.len(), 3);
        assert_eq!(form.fields["csrf"], "abc123");
        assert_eq!(form.fields["j_username"], "alice");
        assert_eq!(form.fields["j_password"], "s3cret");
    }

    #[test]
    fn test_only_first_form_is_used() {
        let html = r#"
            <form action="/search"><input name="q" value="x"></form>
            <form action="/login"><input name="username"><input type="password" name="pw"></form>"#;
        let form = discover_form(html, "alice", "s3cret");
        assert_eq!(form.action.as_deref(), Some("/search"));
        assert_eq!(form.fields["q"], "x");
        // Guessing failed on the first form, so the fallback pair was injected.
        assert_eq!(form.fields["username"], "alice");
        assert_eq!(form.fields["password"], "s3cret");
    }

    #[test]
    fn test_form_inside_table_keeps_cell_inputs() {
        let html = r#"
            <table>
              <form action="/auth" method="post">
                <tr><td><input type="hidden" name="csrf" value="abc123"></td></tr>
                <tr><td>Account</td><td><input name="account"></td></tr>
                <tr><td>Password</td><td><input type="password" name="upass"></td></tr>
              </form>
            </table>"#;
        let form = discover_form(html, "alice", "s3cret");
        assert_eq!(form.action.as_deref(), Some("/auth"));
        assert_eq!(form.fields.len(), 3);
        assert_eq!(form.fields["csrf"], "abc123");
        assert_eq!(form.fields["account"], "alice");
        assert_eq!(form.fields["upass"], "s3cret");
    }

    #[test]
    fn test_table_layout_stops_at_next_form() {
        let html = r#"
            <table>
              <form action="/auth"><tr><td><input type="password" name="pwd"></td></tr></form>
            </table>
            <form action="/search"><input name="user_query" value="x"></form>"#;
        let form = discover_form(html, "alice", "s3cret");
        assert_eq!(form.action.as_deref(), Some("/auth"));
        assert_eq!(form.fields["pwd"], "s3cret");
        assert!(!form.fields.contains_key("user_query"));
    }

    #[test]
    fn test_duplicate_names_last_value_wins() {
        let html = r#"<form><input name="token" value="first"><input name="token" value="second"></form>"#;
        let form = discover_form(html, "alice", "s3cret");
        assert_eq!(form.fields["token"], "second");
    }

    #[test]
    fn test_unnamed_inputs_ignored() {
        let html = r#"<form><input value="orphan"><input name="" value="blank"><input name="UserName"></form>"#;
        let form = discover_form(html, "alice", "s3cret");
        assert_eq!(form.fields.len(), 1);
        assert_eq!(form.fields["UserName"], "alice");
        assert!(form.action.is_none());
    }

    #[test]
    fn test_empty_action_is_absent() {
        let form = discover_form(r#"<form action="  "><input name="user"></form>"#, "a", "b");
        assert!(form.action.is_none());
    }

    #[test]
    fn test_password_type_beats_password_name() {
        let inputs = vec![input("passcode_hint", "text"), input("secret", "password")];
        let guess = guess_fields(&inputs);
        assert_eq!(guess.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_password_name_used_without_password_type() {
        let inputs = vec![input("login_id", "text"), input("login_pwd", "text")];
        let guess = guess_fields(&inputs);
        assert_eq!(guess.password.as_deref(), Some("login_pwd"));
        assert!(guess.username.is_none());
    }

    #[test]
    fn test_first_username_candidate_wins() {
        let inputs = vec![input("account", "text"), input("username", "text")];
        let guess = guess_fields(&inputs);
        assert_eq!(guess.username.as_deref(), Some("account"));
    }

    #[test]
    fn test_username_skips_password_field() {
        let inputs = vec![input("user_password", "password"), input("user_id", "text")];
        let guess = guess_fields(&inputs);
        assert_eq!(guess.password.as_deref(), Some("user_password"));
        assert_eq!(guess.username.as_deref(), Some("user_id"));
    }

    #[test]
    fn test_fallback_skips_taken_username_key() {
        let mut fields = FormFields::new();
        fields.insert("username".into(), "preset".into());
        apply_fallback(&mut fields, "alice", "s3cret");
        assert_eq!(fields["username"], "preset");
        assert_eq!(fields["user"], "alice");
        assert_eq!(fields["pass"], "s3cret");
    }

    #[test]
    fn test_fallback_not_applied_when_username_present() {
        let mut fields = FormFields::new();
        fields.insert("uid".into(), "alice".into());
        apply_fallback(&mut fields, "alice", "s3cret");
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_fallback_exhausted_leaves_fields() {
        let mut fields = FormFields::new();
        for key in ["username", "user", "account"] {
            fields.insert(key.into(), String::new());
        }
        apply_fallback(&mut fields, "alice", "s3cret");
        assert!(fields.values().all(|v| v.is_empty()));
    }
}

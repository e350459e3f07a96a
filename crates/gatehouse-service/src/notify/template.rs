//! Built-in mail templates.
//!
//! The first line of every template is `Subject: ...`; the rest is an HTML
//! body. `{{key}}` placeholders are replaced with HTML-escaped values from
//! the template data.

use serde_json::{Map, Value};

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;

const USER_INVITATION_HTML: &str = r#"Subject: You have been invited to Gatehouse
<p>Hello,</p>
<p>{{invited_by}} has invited <strong>{{email}}</strong> to create an account.</p>
<p><a href="{{invitation_url}}">Accept the invitation</a></p>
<p>This invitation expires at {{expires_at}}.</p>"#;

const PASSWORD_CHANGED_HTML: &str = r#"Subject: Your Gatehouse password was changed
<p>Hello {{first_name}},</p>
<p>The password for <strong>{{email}}</strong> was changed at {{changed_at}}.</p>
<p>If this was not you, contact an administrator immediately.</p>"#;

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub body: String,
}

/// Render a built-in template by name.
pub fn render(name: &str, data: &Map<String, Value>) -> AppResult<RenderedMail> {
    let source = match name {
        super::USER_INVITATION => USER_INVITATION_HTML,
        super::PASSWORD_CHANGED => PASSWORD_CHANGED_HTML,
        other => {
            return Err(AppError::internal(format!("Unknown mail template '{other}'")));
        }
    };

    let mut filled = source.to_string();
    for (key, value) in data {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        filled = filled.replace(&format!("{{{{{key}}}}}"), &escape_html(&text));
    }

    let (first, rest) = filled.split_once('\n').unwrap_or((filled.as_str(), ""));
    let subject = first
        .strip_prefix("Subject:")
        .map(str::trim)
        .unwrap_or("Notification")
        .to_string();

    Ok(RenderedMail {
        subject,
        body: rest.trim().to_string(),
    })
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_invitation_renders_subject_and_placeholders() {
        let mail = render(
            "user_invitation",
            &data(json!({
                "email": "bob@x.com",
                "invited_by": "Alice <admin>",
                "invitation_url": "https://app/register?token=abc",
                "expires_at": "2030-01-01T00:00:00Z",
            })),
        )
        .unwrap();

        assert_eq!(mail.subject, "You have been invited to Gatehouse");
        assert!(mail.body.contains("bob@x.com"));
        assert!(mail.body.contains("Alice &lt;admin&gt;"));
        assert!(!mail.body.contains("{{"));
    }

    #[test]
    fn test_unknown_template_is_an_error() {
        assert!(render("welcome", &Map::new()).is_err());
    }
}

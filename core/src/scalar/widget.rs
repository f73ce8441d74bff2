//! Widget UI fragments served to the integration manager iframe

use crate::error::{ApiError, Result};
use crate::token::SessionTokenCodec;

/// Screen name the client opens for the sticker picker
pub const STICKER_PICKER_SCREEN: &str = "type_m.stickerpicker";

/// Validate the scalar token, then render the requested screen
pub fn handle(
    scalar_token: &str,
    screen: &str,
    sticker_url: &str,
    codec: &SessionTokenCodec,
) -> Result<String> {
    codec.validate(scalar_token)?;
    render_screen(screen, sticker_url)
}

/// Render the HTML fragment for a screen
///
/// The sticker picker screen installs the sticker widget as a user widget
/// and closes the integration manager, retrying every second until the
/// client acts on it.
pub fn render_screen(screen: &str, sticker_url: &str) -> Result<String> {
    match screen {
        STICKER_PICKER_SCREEN => Ok(sticker_picker_script(sticker_url)),
        _ => Err(ApiError::unknown_screen(screen)),
    }
}

fn sticker_picker_script(sticker_url: &str) -> String {
    // JSON string literal, with '<' escaped so the URL cannot close the script tag
    let url = serde_json::Value::String(sticker_url.to_string())
        .to_string()
        .replace('<', "\\u003c");

    format!(
        r#"
<script>
    setInterval(() => {{
        window.parent.postMessage({{
            "action": "set_widget",
            "widget_id": "stickerpicker",
            "url": {url},
            "type": "m.stickerpicker",
            "userWidget": true
        }}, "*");

        window.parent.postMessage({{
            "action": "close_scalar"
        }}, "*");
    }}, 1000);
</script>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SigningKey;
    use crate::identity::VerifiedSubject;

    #[test]
    fn test_render_sticker_picker() {
        let html = render_screen(STICKER_PICKER_SCREEN, "https://stickers.example.com/?theme=$theme").unwrap();

        assert!(html.contains(r#""url": "https://stickers.example.com/?theme=$theme""#));
        assert!(html.contains(r#""action": "set_widget""#));
        assert!(html.contains(r#""action": "close_scalar""#));
        assert!(html.contains(r#""type": "m.stickerpicker""#));
    }

    #[test]
    fn test_render_escapes_sticker_url() {
        let html = render_screen(STICKER_PICKER_SCREEN, r#"https://x/"</script><script>alert(1)"#).unwrap();

        assert!(!html.contains("</script><script>"));
        assert!(html.contains(r#"\"\u003c/script>\u003cscript>alert(1)"#));
    }

    #[test]
    fn test_render_unknown_screen() {
        let err = render_screen("type_m.video", "https://x").unwrap_err();
        assert!(matches!(err, ApiError::UnknownScreen { .. }));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_handle_requires_valid_token() {
        let codec = SessionTokenCodec::new(&SigningKey::new("secret").unwrap());

        let err = handle("garbage", STICKER_PICKER_SCREEN, "https://x", &codec).unwrap_err();
        assert_eq!(err.status_code(), 401);

        let token = codec.issue(&VerifiedSubject::new("@alice:example.org")).unwrap();
        assert!(handle(&token, STICKER_PICKER_SCREEN, "https://x", &codec).is_ok());
    }
}

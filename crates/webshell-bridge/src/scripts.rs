//! Scripts injected into the embedded surfaces.
//!
//! Dynamic values are always embedded as JSON literals, never spliced into
//! quoted JavaScript strings.

use serde_json::Value;

use crate::message::OutboundMessage;

/// Runs before any page content in the primary surface. Legacy payment
/// pages look up `window.opener` and `getFormData` during load.
pub const PRIMARY_PRE_CONTENT_SCRIPT: &str = r#"
(() => {
  window.__paymentData = {};
  window.opener = window;
  window.opener.getFormData = function() { return window.__paymentData || {}; };
  window.getFormData = function() { return window.__paymentData || {}; };
})();
true;
"#;

/// Runs before any page content in the overlay surface.
pub const OVERLAY_PRE_CONTENT_SCRIPT: &str = r#"
(() => {
  window.opener = window.parent || window;
  window.opener.getFormData = function() { return {}; };
  window.getFormData = function() { return {}; };
})();
true;
"#;

/// Runs after load in the overlay surface: an opener proxy that forwards to
/// the host, and payment completion detection on the page text.
pub const OVERLAY_PAGE_SCRIPT: &str = r#"
(() => {
  const post = (message) => {
    if (window.ReactNativeWebView && window.ReactNativeWebView.postMessage) {
      window.ReactNativeWebView.postMessage(JSON.stringify(message));
    }
  };

  if (!window.opener || window.opener === window) {
    window.opener = {
      postMessage: function(data, origin) {
        post({ type: 'OPENER_MESSAGE', data: data, origin: origin });
      },
      close: function() {
        post({ type: 'CLOSE_WINDOW' });
      }
    };
  }

  const markers = ['결제완료', '결제 완료', '주문완료', 'payment complete'];
  let reported = false;
  const checkPaymentComplete = function() {
    if (reported || !document.body) return;
    const text = document.body.innerText || '';
    if (markers.some((marker) => text.includes(marker))) {
      reported = true;
      post({ type: 'PAYMENT_COMPLETE' });
    }
  };

  if (document.body) {
    new MutationObserver(checkPaymentComplete).observe(document.body, { childList: true, subtree: true });
    checkPaymentComplete();
  }
})();
true;
"#;

/// Post-load script for the primary surface: page-facing globals, the
/// `window.open` override and the DOM-ready signal.
pub fn primary_page_script(token: Option<&str>) -> String {
    let token = json_literal(&Value::String(token.unwrap_or_default().to_string()));

    format!(
        r#"
(() => {{
  const post = (message) => {{
    if (window.ReactNativeWebView && window.ReactNativeWebView.postMessage) {{
      window.ReactNativeWebView.postMessage(JSON.stringify(message));
    }}
  }};

  window.fcmToken = {token};

  window.requestFCMToken = function() {{
    post({{ type: 'FCM_TOKEN_REQUEST' }});
  }};

  window.changeOrientation = function(orientation) {{
    post({{ type: 'ORIENTATION_CHANGE', orientation: orientation }});
  }};

  window.goBack = function() {{
    post({{ type: 'GO_BACK' }});
  }};

  window.__paymentData = window.__paymentData || {{}};
  if (!window.opener) {{
    window.opener = window;
  }}
  window.opener.getFormData = function() {{ return window.__paymentData || {{}}; }};
  window.getFormData = function() {{ return window.__paymentData || {{}}; }};
  window.setPaymentData = function(data) {{
    window.__paymentData = data;
  }};

  const originalOpen = window.open;
  window.open = function(url, name, features) {{
    const target = String(url || '');
    if (name === '_blank' || name === 'payment' || target.includes('pay')) {{
      post({{ type: 'OPEN_WINDOW', url: target }});
      return {{
        closed: false,
        opener: window,
        location: {{ href: target }},
        document: {{}},
        getFormData: window.getFormData,
        postMessage: function(message, origin) {{
          post({{ type: 'OPENER_MESSAGE', data: message, origin: origin }});
        }},
        close: function() {{
          this.closed = true;
          post({{ type: 'CLOSE_WINDOW' }});
        }}
      }};
    }}
    return originalOpen.call(window, url, name, features);
  }};

  const loaded = () => post({{ type: 'PAGE_LOADED' }});
  if (document.readyState === 'complete' || document.readyState === 'interactive') {{
    loaded();
  }} else {{
    window.addEventListener('DOMContentLoaded', loaded);
  }}
}})();
true;
"#,
        token = token
    )
}

/// Reply to `FCM_TOKEN_REQUEST`. An empty string stands in for a missing
/// token. Same token in, same script out.
pub fn token_response_script(token: Option<&str>) -> String {
    let value = token.unwrap_or_default().to_string();
    let message = OutboundMessage::TokenResponse {
        token: value.clone(),
    };
    format!(
        "window.fcmToken = {};\n{}",
        json_literal(&Value::String(value)),
        post_to_page(&message)
    )
}

pub fn notification_script(data: &Value) -> String {
    post_to_page(&OutboundMessage::NotificationReceived { data: data.clone() })
}

pub fn deep_link_script(url: &str, data: &Value) -> String {
    post_to_page(&OutboundMessage::DeepLinkReceived {
        url: url.to_string(),
        data: data.clone(),
    })
}

fn post_to_page(message: &OutboundMessage) -> String {
    let payload = serde_json::to_string(message).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode outbound message");
        "{}".to_string()
    });
    // The page receives the JSON text, as `JSON.stringify` would produce it
    format!(
        "window.postMessage({}, '*');\ntrue;\n",
        json_literal(&Value::String(payload))
    )
}

fn json_literal(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_response_is_deterministic() {
        let first = token_response_script(Some("tok"));
        let second = token_response_script(Some("tok"));
        assert_eq!(first, second);
        assert!(first.contains(r#"window.fcmToken = "tok";"#));
        assert!(first.contains(r#"\"type\":\"FCM_TOKEN_RESPONSE\""#));
    }

    #[test]
    fn test_missing_token_uses_empty_sentinel() {
        let script = token_response_script(None);
        assert!(script.contains(r#"window.fcmToken = "";"#));
        assert!(script.contains(r#"\"token\":\"\""#));
    }

    #[test]
    fn test_values_are_escaped() {
        let script = primary_page_script(Some("a'b\"c</script>"));
        assert!(script.contains(r#"window.fcmToken = "a'b\"c</script>";"#));

        let script = deep_link_script("app://x?q='1'", &json!({"fullUrl": "app://x?q='1'"}));
        assert!(!script.contains("url: '"));
        assert!(script.contains("DEEP_LINK_RECEIVED"));
    }

    #[test]
    fn test_primary_script_installs_page_globals() {
        let script = primary_page_script(None);
        for needle in [
            "window.requestFCMToken",
            "window.changeOrientation",
            "window.goBack",
            "window.setPaymentData",
            "window.open = function",
            "OPEN_WINDOW",
            "PAGE_LOADED",
        ] {
            assert!(script.contains(needle), "missing {}", needle);
        }
    }

    #[test]
    fn test_notification_script_embeds_record() {
        let script = notification_script(&json!({"campaign": "spring", "receivedAt": "2026-01-01T00:00:00Z"}));
        assert!(script.contains("NOTIFICATION_RECEIVED"));
        assert!(script.contains("spring"));
    }
}

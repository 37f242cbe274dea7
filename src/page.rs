//! Container page served at `/`
//!
//! The page is a full-screen iframe on `/sketch/` plus a small reloader
//! script. The script polls `/id` and reloads the iframe whenever the live
//! version changes, so displays pick up new pushes without anyone touching
//! them.

use crate::version_id::VersionId;

/// Parameters for rendering the container page
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub title: String,
    pub poll_interval_ms: u64,
}

/// Render the container page for the given live version
pub fn render_container(live: Option<&VersionId>, options: &PageOptions) -> String {
    let push_id = live.map(|id| id.as_str()).unwrap_or("");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  html, body {{ margin: 0; padding: 0; height: 100%; overflow: hidden; background: #000; }}
  #sketch_iframe {{ border: 0; width: 100%; height: 100%; }}
</style>
</head>
<body>
<iframe id="sketch_iframe" src="/sketch/"></iframe>
<script>
(function () {{
  var POLL_INTERVAL_MS = {poll};
  var lastPushId = "{push_id}";

  function reload() {{
    document.getElementById("sketch_iframe").src = "/sketch/?push_id=" + encodeURIComponent(lastPushId);
  }}

  function poll() {{
    var req = new XMLHttpRequest();
    req.open("GET", "/id", true);
    req.onload = function () {{
      if (req.status === 200 && req.responseText !== lastPushId) {{
        lastPushId = req.responseText;
        reload();
      }}
    }};
    req.send();
  }}

  setInterval(poll, POLL_INTERVAL_MS);
}})();
</script>
</body>
</html>
"#,
        title = escape_html(&options.title),
        poll = options.poll_interval_ms,
        push_id = push_id,
    )
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
    use super::*;

    fn options() -> PageOptions {
        PageOptions {
            title: "wallmount".to_string(),
            poll_interval_ms: 5000,
        }
    }

    #[test]
    fn test_page_embeds_live_id_and_interval() {
        let id = VersionId::parse("v42").unwrap();
        let html = render_container(Some(&id), &options());
        assert!(html.contains(r#"var lastPushId = "v42";"#));
        assert!(html.contains("var POLL_INTERVAL_MS = 5000;"));
        assert!(html.contains(r#"src="/sketch/""#));
    }

    #[test]
    fn test_page_without_live_version() {
        let html = render_container(None, &options());
        assert!(html.contains(r#"var lastPushId = "";"#));
    }

    #[test]
    fn test_title_is_escaped() {
        let mut opts = options();
        opts.title = "<script>alert(1)</script>".to_string();
        let html = render_container(None, &opts);
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<title><script>"));
    }
}

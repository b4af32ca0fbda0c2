//! Post body and title assembly.

/// Escape text for an HTML text node or a double-quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Body HTML: optional image, the translation, then the attribution link.
pub fn compose_content(
    image_url: Option<&str>,
    translated: &str,
    permalink: Option<&str>,
    attribution_label: &str,
) -> String {
    let mut html = String::new();
    if let Some(src) = image_url.filter(|s| !s.is_empty()) {
        html.push_str(&format!("<p><img src=\"{}\" alt=\"\" /></p>\n", escape_html(src)));
    }
    html.push_str(&format!("<p>{}</p>", escape_html(translated.trim())));
    if let Some(link) = permalink.filter(|s| !s.is_empty()) {
        html.push_str(&format!(
            "\n<p><a href=\"{}\">{}</a></p>",
            escape_html(link),
            escape_html(attribution_label)
        ));
    }
    html
}

const ELLIPSIS: &str = "...";

/// First line of the translation, at most `max_chars` characters including
/// the `...` added when it is cut.
pub fn truncate_title(translated: &str, max_chars: usize) -> String {
    let line = translated.trim().lines().next().unwrap_or_default().trim();
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    if max_chars <= ELLIPSIS.len() {
        return line.chars().take(max_chars).collect();
    }
    let mut title: String = line.chars().take(max_chars - ELLIPSIS.len()).collect();
    title.truncate(title.trim_end().len());
    title.push_str(ELLIPSIS);
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_orders_image_text_attribution() {
        let html = compose_content(
            Some("https://blog.example.com/wp-content/uploads/a.jpg"),
            "Harga BTC naik hari ini (dlm BM)",
            Some("https://x.com/codeglitch/status/123"),
            "Lihat tweet asal",
        );
        let img = html.find("<img").unwrap();
        let text = html.find("Harga BTC").unwrap();
        let link = html.find("href=\"https://x.com/codeglitch/status/123\"").unwrap();
        assert!(img < text && text < link);
        assert!(html.contains(">Lihat tweet asal</a>"));
    }

    #[test]
    fn content_without_image_or_link_is_just_text() {
        assert_eq!(
            compose_content(None, "teks <b>", None, "x"),
            "<p>teks &lt;b&gt;</p>"
        );
    }

    #[test]
    fn titles_cut_on_char_boundaries() {
        assert_eq!(truncate_title("pendek", 60), "pendek");
        assert_eq!(truncate_title("Harga naik hari ini", 8), "Harga...");
        assert_eq!(truncate_title("Harga BTC naik hari ini", 10), "Harga B...");
        // multi-byte characters must not split
        assert_eq!(truncate_title("éééééé", 5), "éé...");
        assert_eq!(truncate_title("ééééé", 3), "ééé");
        assert_eq!(truncate_title("baris satu\nbaris dua", 60), "baris satu");
    }

    #[test]
    fn titles_never_exceed_the_budget() {
        let long = "Harga BTC naik hari ini dan pasaran kripto bergerak laju";
        for max in 1..long.len() {
            assert!(truncate_title(long, max).chars().count() <= max, "max={max}");
        }
    }
}

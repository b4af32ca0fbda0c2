//! Mirror-page extraction.
//!
//! Mirror front-ends render one `div.timeline-item` per post. Author and id
//! are recovered from the status link because the markup carries no stable
//! data attributes for them.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::types::{CandidateRecord, Engagement, TextSources};

struct MirrorSelectors {
    item: Selector,
    content: Selector,
    quote: Selector,
    date_link: Selector,
    tweet_link: Selector,
    photo: Selector,
    stat: Selector,
    icon_comment: Selector,
    icon_retweet: Selector,
    icon_heart: Selector,
    status_path: Regex,
}

impl MirrorSelectors {
    fn new() -> Result<Self, String> {
        let sel = |css: &str| Selector::parse(css).map_err(|e| format!("selector {css}: {e}"));
        Ok(Self {
            item: sel("div.timeline-item")?,
            content: sel(".tweet-content")?,
            quote: sel(".quote .quote-text")?,
            date_link: sel("span.tweet-date a")?,
            tweet_link: sel("a.tweet-link")?,
            photo: sel(".attachments a.still-image")?,
            stat: sel(".tweet-stats .tweet-stat")?,
            icon_comment: sel(".icon-comment")?,
            icon_retweet: sel(".icon-retweet")?,
            icon_heart: sel(".icon-heart")?,
            status_path: Regex::new(r"^/([^/?#]+)/status/(\d+)").map_err(|e| e.to_string())?,
        })
    }
}

/// Extract every well-formed timeline block. Blocks without text or without
/// a status link are dropped.
pub fn extract_document(html: &str, source: &Url) -> Vec<CandidateRecord> {
    let selectors = match MirrorSelectors::new() {
        Ok(s) => s,
        Err(e) => {
            warn!(event = "extract.document.selectors", error = %e);
            return Vec::new();
        }
    };
    let doc = Html::parse_document(html);

    let mut out = Vec::new();
    for block in doc.select(&selectors.item) {
        match block_candidate(&selectors, block, source) {
            Some(c) => out.push(c),
            None => debug!(event = "extract.entry.skipped", reason = "incomplete timeline block"),
        }
    }
    out
}

fn block_candidate(s: &MirrorSelectors, block: ElementRef<'_>, source: &Url) -> Option<CandidateRecord> {
    let text = block
        .select(&s.content)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())?;

    let link = block
        .select(&s.date_link)
        .next()
        .or_else(|| block.select(&s.tweet_link).next())?;
    let href = link.value().attr("href")?;
    let mut permalink = source.join(href).ok()?;
    permalink.set_fragment(None);

    let (author, id) = match s.status_path.captures(permalink.path()) {
        Some(caps) => (
            caps.get(1).map(|m| m.as_str().to_string()),
            caps.get(2).map(|m| m.as_str().to_string()),
        ),
        None => (None, None),
    };

    let created_at = link
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let quoted = block
        .select(&s.quote)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let media_urls = block
        .select(&s.photo)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|h| source.join(h).ok())
        .map(String::from)
        .collect();

    Some(CandidateRecord {
        id,
        author,
        created_at,
        text: TextSources {
            primary: Some(text),
            quoted,
            ..Default::default()
        },
        media_urls,
        permalink: Some(permalink.into()),
        engagement: engagement(s, block),
    })
}

fn engagement(s: &MirrorSelectors, block: ElementRef<'_>) -> Option<Engagement> {
    let mut e = Engagement::default();
    for stat in block.select(&s.stat) {
        let count = parse_count(&element_text(stat));
        if stat.select(&s.icon_comment).next().is_some() {
            e.replies = count;
        } else if stat.select(&s.icon_retweet).next().is_some() {
            e.reposts = count;
        } else if stat.select(&s.icon_heart).next().is_some() {
            e.likes = count;
        }
    }
    (!e.is_empty()).then_some(e)
}

/// Stats render with thousands separators ("1,204").
fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
<html><body><div class="timeline">
  <div class="timeline-item">
    <a class="tweet-link" href="/codeglitch/status/111#m"></a>
    <div class="tweet-body">
      <span class="tweet-date"><a href="/codeglitch/status/111#m" title="Oct 10, 2024 · 8:19 PM UTC">2h</a></span>
      <div class="tweet-content media-body">Harga BTC naik hari ini</div>
      <div class="attachments">
        <div class="attachment image"><a class="still-image" href="/pic/orig/media%2FGabc.jpg"><img src="/pic/media%2FGabc.jpg"></a></div>
      </div>
      <div class="tweet-stats">
        <span class="tweet-stat"><div class="icon-container"><span class="icon-comment"></span> 3</div></span>
        <span class="tweet-stat"><div class="icon-container"><span class="icon-retweet"></span> 1,204</div></span>
        <span class="tweet-stat"><div class="icon-container"><span class="icon-heart"></span> 87</div></span>
      </div>
    </div>
  </div>
  <div class="timeline-item">
    <span class="tweet-date"><a href="/codeglitch/status/112#m" title="Oct 9, 2024">1d</a></span>
    <div class="tweet-content">   </div>
  </div>
  <div class="timeline-item">
    <div class="tweet-content">no link at all</div>
  </div>
  <div class="timeline-item">
    <span class="tweet-date"><a href="/other/status/113#m" title="Oct 8, 2024">2d</a></span>
    <div class="tweet-content">second post</div>
  </div>
</div></body></html>
"##;

    #[test]
    fn reads_well_formed_blocks_and_drops_the_rest() {
        let base = Url::parse("https://nitter.example.net/codeglitch").unwrap();
        let out = extract_document(PAGE, &base);
        assert_eq!(out.len(), 2);

        let first = &out[0];
        assert_eq!(first.id.as_deref(), Some("111"));
        assert_eq!(first.author.as_deref(), Some("codeglitch"));
        assert_eq!(first.text.resolve(), Some("Harga BTC naik hari ini"));
        assert_eq!(first.created_at.as_deref(), Some("Oct 10, 2024 · 8:19 PM UTC"));
        assert_eq!(
            first.permalink.as_deref(),
            Some("https://nitter.example.net/codeglitch/status/111")
        );
        assert_eq!(
            first.media_urls,
            ["https://nitter.example.net/pic/orig/media%2FGabc.jpg"]
        );
        assert_eq!(
            first.engagement,
            Some(Engagement {
                likes: Some(87),
                reposts: Some(1204),
                replies: Some(3)
            })
        );

        assert_eq!(out[1].id.as_deref(), Some("113"));
        assert_eq!(out[1].author.as_deref(), Some("other"));
        assert!(out[1].media_urls.is_empty());
        assert_eq!(out[1].engagement, None);
    }

    #[test]
    fn empty_page_yields_nothing() {
        let base = Url::parse("https://nitter.example.net/").unwrap();
        assert!(extract_document("<html><body>Rate limited</body></html>", &base).is_empty());
    }
}

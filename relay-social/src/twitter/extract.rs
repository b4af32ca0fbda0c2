//! JSON payload extraction.
//!
//! Timeline APIs return nested instruction trees whose root moves around
//! between API versions, so the tree is located by trying [`TIMELINE_SHAPES`]
//! in order. Actor and v2 style responses are flat item lists. Each entry is
//! read on its own; a malformed entry is skipped without affecting siblings.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::html;
use super::types::{CandidateRecord, Engagement, RawPayload, TextSources};

/// A JSON-pointer location for a timeline instruction list.
#[derive(Debug, Clone, Copy)]
pub struct TimelineShape {
    pub name: &'static str,
    pub instructions: &'static str,
}

/// Instruction roots, most specific first.
pub const TIMELINE_SHAPES: &[TimelineShape] = &[
    TimelineShape {
        name: "result.timeline",
        instructions: "/result/timeline/instructions",
    },
    TimelineShape {
        name: "user.timeline_v2",
        instructions: "/data/user/result/timeline_v2/timeline/instructions",
    },
    TimelineShape {
        name: "user.timeline",
        instructions: "/data/user/result/timeline/timeline/instructions",
    },
    TimelineShape {
        name: "timeline",
        instructions: "/timeline/instructions",
    },
    TimelineShape {
        name: "instructions",
        instructions: "/instructions",
    },
];

const ADD_ENTRIES: &str = "TimelineAddEntries";

const ID: &[&str] = &["/rest_id", "/legacy/id_str", "/id_str", "/id"];
const AUTHOR: &[&str] = &[
    "/core/user_results/result/legacy/screen_name",
    "/core/user_results/result/core/screen_name",
    "/author/userName",
    "/author/screen_name",
    "/user/screen_name",
];
const CREATED_AT: &[&str] = &["/legacy/created_at", "/created_at", "/createdAt"];
const NOTE: &[&str] = &[
    "/note_tweet/note_tweet_results/result/text",
    "/note_tweet/text",
    "/noteTweet/text",
];
const PRIMARY: &[&str] = &["/legacy/full_text", "/full_text", "/fullText"];
const REPOSTED: &[&str] = &[
    "/legacy/retweeted_status_result/result",
    "/retweeted_status_result/result",
    "/retweeted_status",
    "/retweet",
];
const QUOTED: &[&str] = &[
    "/quoted_status_result/result",
    "/legacy/quoted_status_result/result",
    "/quoted_status",
    "/quote",
];
const PLAIN: &[&str] = &["/legacy/text", "/text"];
const MEDIA: &[&str] = &[
    "/legacy/extended_entities/media",
    "/extended_entities/media",
    "/extendedEntities/media",
    "/legacy/entities/media",
    "/entities/media",
    "/media",
];
const PERMALINK: &[&str] = &["/url", "/twitterUrl"];
const LIKES: &[&str] = &[
    "/legacy/favorite_count",
    "/favorite_count",
    "/likeCount",
    "/public_metrics/like_count",
];
const REPOSTS: &[&str] = &[
    "/legacy/retweet_count",
    "/retweet_count",
    "/retweetCount",
    "/public_metrics/retweet_count",
];
const REPLIES: &[&str] = &[
    "/legacy/reply_count",
    "/reply_count",
    "/replyCount",
    "/public_metrics/reply_count",
];

/// Why a single entry was passed over.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry is not an object")]
    NotAnObject,
    #[error("post is withheld or deleted")]
    Tombstone,
    #[error("entry carries neither id nor text")]
    Empty,
}

/// Pull every candidate out of a payload, in document order.
pub fn extract(payload: &RawPayload) -> Vec<CandidateRecord> {
    match payload {
        RawPayload::Document { source, html: page } => html::extract_document(page, source),
        RawPayload::Json { body, .. } => extract_json(body),
    }
}

pub fn extract_json(body: &Value) -> Vec<CandidateRecord> {
    if let Some((shape, instructions)) = locate_instructions(body) {
        debug!(event = "extract.shape", shape = shape.name);
        return instructions
            .iter()
            .filter(|i| i.get("type").and_then(Value::as_str) == Some(ADD_ENTRIES))
            .filter_map(|i| i.get("entries").and_then(Value::as_array))
            .flatten()
            .flat_map(tweets_in_entry)
            .filter_map(|t| keep(post_candidate(t)))
            .collect();
    }

    if let Some(items) = flat_items(body) {
        debug!(event = "extract.shape", shape = "items", count = items.len());
        return items.iter().filter_map(|t| keep(post_candidate(t))).collect();
    }

    debug!(event = "extract.shape", shape = "unknown");
    Vec::new()
}

/// First shape whose pointer resolves to a non-empty array.
pub fn locate_instructions(body: &Value) -> Option<(&'static TimelineShape, &[Value])> {
    TIMELINE_SHAPES.iter().find_map(|shape| {
        body.pointer(shape.instructions)
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
            .map(|a| (shape, a.as_slice()))
    })
}

fn flat_items(body: &Value) -> Option<&[Value]> {
    body.as_array()
        .or_else(|| body.get("items").and_then(Value::as_array))
        .or_else(|| body.get("data").and_then(Value::as_array))
        .map(Vec::as_slice)
}

fn keep(result: Result<CandidateRecord, EntryError>) -> Option<CandidateRecord> {
    match result {
        Ok(c) => Some(c),
        Err(e) => {
            debug!(event = "extract.entry.skipped", reason = %e);
            None
        }
    }
}

/// Post objects carried by one timeline entry. Conversation modules hold
/// several.
fn tweets_in_entry(entry: &Value) -> Vec<&Value> {
    let Some(content) = entry.get("content") else {
        return Vec::new();
    };
    if let Some(t) = content.pointer("/itemContent/tweet_results/result") {
        return vec![t];
    }
    if let Some(t) = content.pointer("/content/tweetResult/result") {
        return vec![t];
    }
    content
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.pointer("/item/itemContent/tweet_results/result"))
                .collect()
        })
        .unwrap_or_default()
}

/// Visibility wrappers nest the real post one level down.
fn unwrap_visibility(t: &Value) -> &Value {
    match t.get("__typename").and_then(Value::as_str) {
        Some("TweetWithVisibilityResults") => t.get("tweet").unwrap_or(t),
        _ => t,
    }
}

pub fn post_candidate(raw: &Value) -> Result<CandidateRecord, EntryError> {
    let t = unwrap_visibility(raw);
    if !t.is_object() {
        return Err(EntryError::NotAnObject);
    }
    if t.get("__typename").and_then(Value::as_str) == Some("TweetTombstone") {
        return Err(EntryError::Tombstone);
    }

    let id = string_at(t, ID);
    let text = text_sources(t, true);
    if id.is_none() && text.resolve().is_none() {
        return Err(EntryError::Empty);
    }

    let engagement = Engagement {
        likes: u64_at(t, LIKES),
        reposts: u64_at(t, REPOSTS),
        replies: u64_at(t, REPLIES),
    };

    Ok(CandidateRecord {
        id,
        author: string_at(t, AUTHOR).map(|a| a.trim_start_matches('@').to_string()),
        created_at: string_at(t, CREATED_AT),
        text,
        media_urls: photo_urls(t),
        permalink: string_at(t, PERMALINK).filter(|u| u.starts_with("http")),
        engagement: (!engagement.is_empty()).then_some(engagement),
    })
}

fn text_sources(t: &Value, follow_nested: bool) -> TextSources {
    let nested = |pointers: &[&str]| {
        if !follow_nested {
            return None;
        }
        pointers
            .iter()
            .filter_map(|p| t.pointer(p))
            .map(unwrap_visibility)
            .filter(|v| v.is_object())
            .find_map(|v| text_sources(v, false).resolve().map(str::to_string))
    };
    TextSources {
        note: string_at(t, NOTE),
        primary: string_at(t, PRIMARY),
        reposted: nested(REPOSTED),
        quoted: nested(QUOTED),
        plain: string_at(t, PLAIN),
    }
}

/// Photos only; the first non-empty media list wins.
fn photo_urls(t: &Value) -> Vec<String> {
    let Some(media) = MEDIA
        .iter()
        .filter_map(|p| t.pointer(p).and_then(Value::as_array))
        .find(|a| !a.is_empty())
    else {
        return Vec::new();
    };
    media
        .iter()
        .filter(|m| m.get("type").and_then(Value::as_str) == Some("photo"))
        .filter_map(|m| media_url(m, "media_url_https").or_else(|| media_url(m, "media_url")))
        .map(str::to_string)
        .collect()
}

fn media_url<'a>(m: &'a Value, key: &str) -> Option<&'a str> {
    m.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|u| !u.is_empty())
}

fn string_at(v: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| match v.pointer(p)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn u64_at(v: &Value, pointers: &[&str]) -> Option<u64> {
    pointers.iter().find_map(|p| match v.pointer(p)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graphql_tweet(id: &str, full_text: &str) -> Value {
        json!({
            "__typename": "Tweet",
            "rest_id": id,
            "core": { "user_results": { "result": { "legacy": { "screen_name": "codeglitch" } } } },
            "legacy": {
                "full_text": full_text,
                "created_at": "Wed Oct 10 20:19:24 +0000 2018",
                "favorite_count": 5,
                "retweet_count": 2,
                "reply_count": 1
            }
        })
    }

    fn entry(tweet: Value) -> Value {
        json!({ "entryId": "tweet-x", "content": { "itemContent": { "tweet_results": { "result": tweet } } } })
    }

    #[test]
    fn reads_result_timeline_shape() {
        let body = json!({
            "result": { "timeline": { "instructions": [
                { "type": "TimelinePinEntry", "entry": entry(graphql_tweet("9", "pinned")) },
                { "type": "TimelineAddEntries", "entries": [
                    entry(graphql_tweet("1", "first")),
                    entry(graphql_tweet("2", "second")),
                ]}
            ]}}
        });
        let out = extract_json(&body);
        let ids: Vec<_> = out.iter().filter_map(|c| c.id.as_deref()).collect();
        assert_eq!(ids, ["1", "2"]);
        assert_eq!(out[0].author.as_deref(), Some("codeglitch"));
        assert_eq!(out[0].text.resolve(), Some("first"));
        assert_eq!(
            out[0].engagement,
            Some(Engagement {
                likes: Some(5),
                reposts: Some(2),
                replies: Some(1)
            })
        );
    }

    #[test]
    fn earlier_shape_wins_over_later() {
        let body = json!({
            "result": { "timeline": { "instructions": [
                { "type": "TimelineAddEntries", "entries": [entry(graphql_tweet("1", "a"))] }
            ]}},
            "instructions": [
                { "type": "TimelineAddEntries", "entries": [entry(graphql_tweet("2", "b"))] }
            ]
        });
        let (shape, _) = locate_instructions(&body).unwrap();
        assert_eq!(shape.name, "result.timeline");
        assert_eq!(extract_json(&body).len(), 1);
    }

    #[test]
    fn empty_shape_falls_through_to_next() {
        let body = json!({
            "result": { "timeline": { "instructions": [] } },
            "data": { "user": { "result": { "timeline_v2": { "timeline": { "instructions": [
                { "type": "TimelineAddEntries", "entries": [entry(graphql_tweet("7", "v2"))] }
            ]}}}}}
        });
        let (shape, _) = locate_instructions(&body).unwrap();
        assert_eq!(shape.name, "user.timeline_v2");
        assert_eq!(extract_json(&body)[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn visibility_wrapper_and_conversation_modules_are_unwrapped() {
        let wrapped = json!({
            "__typename": "TweetWithVisibilityResults",
            "tweet": graphql_tweet("3", "limited")
        });
        let body = json!({ "timeline": { "instructions": [
            { "type": "TimelineAddEntries", "entries": [
                entry(wrapped),
                { "content": { "items": [
                    { "item": { "itemContent": { "tweet_results": { "result": graphql_tweet("4", "thread a") } } } },
                    { "item": { "itemContent": { "tweet_results": { "result": graphql_tweet("5", "thread b") } } } }
                ]}},
                { "content": { "content": { "tweetResult": { "result": graphql_tweet("6", "alt") } } } }
            ]}
        ]}});
        let ids: Vec<_> = extract_json(&body)
            .into_iter()
            .filter_map(|c| c.id)
            .collect();
        assert_eq!(ids, ["3", "4", "5", "6"]);
    }

    #[test]
    fn malformed_entries_are_skipped_individually() {
        let body = json!({ "instructions": [
            { "type": "TimelineAddEntries", "entries": [
                entry(json!("not an object")),
                entry(json!({ "__typename": "TweetTombstone" })),
                { "entryId": "cursor-bottom", "content": { "value": "abc" } },
                entry(graphql_tweet("8", "survivor"))
            ]}
        ]});
        let out = extract_json(&body);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id.as_deref(), Some("8"));
    }

    #[test]
    fn repost_text_beats_truncated_text() {
        let t = json!({
            "rest_id": "10",
            "legacy": {
                "text": "RT @someone: trunc…",
                "retweeted_status_result": { "result": {
                    "rest_id": "11",
                    "legacy": { "full_text": "the complete original" }
                }}
            }
        });
        let c = post_candidate(&t).unwrap();
        assert_eq!(c.text.resolve(), Some("the complete original"));
    }

    #[test]
    fn note_text_beats_everything() {
        let mut t = graphql_tweet("12", "short");
        t["note_tweet"] = json!({ "note_tweet_results": { "result": { "text": "long form body" } } });
        assert_eq!(post_candidate(&t).unwrap().text.resolve(), Some("long form body"));
    }

    #[test]
    fn only_photos_are_kept_and_first_media_list_wins() {
        let mut t = graphql_tweet("13", "pics");
        t["legacy"]["extended_entities"] = json!({ "media": [
            { "type": "photo", "media_url_https": "https://pbs.twimg.com/media/a.jpg" },
            { "type": "video", "media_url_https": "https://pbs.twimg.com/media/v.jpg" },
            { "type": "photo", "media_url": "http://pbs.twimg.com/media/b.jpg" }
        ]});
        t["legacy"]["entities"] = json!({ "media": [
            { "type": "photo", "media_url_https": "https://pbs.twimg.com/media/ignored.jpg" }
        ]});
        assert_eq!(
            post_candidate(&t).unwrap().media_urls,
            [
                "https://pbs.twimg.com/media/a.jpg",
                "http://pbs.twimg.com/media/b.jpg"
            ]
        );
    }

    #[test]
    fn blank_secure_url_falls_back_to_plain() {
        let mut t = graphql_tweet("14", "pics");
        t["legacy"]["extended_entities"] = json!({ "media": [
            { "type": "photo", "media_url_https": null, "media_url": "http://pbs.twimg.com/media/a.jpg" },
            { "type": "photo", "media_url_https": "", "media_url": "http://pbs.twimg.com/media/b.jpg" },
            { "type": "photo", "media_url_https": "", "media_url": null }
        ]});
        assert_eq!(
            post_candidate(&t).unwrap().media_urls,
            [
                "http://pbs.twimg.com/media/a.jpg",
                "http://pbs.twimg.com/media/b.jpg"
            ]
        );
    }

    #[test]
    fn flat_actor_items() {
        let body = json!([
            {
                "id": "1850000000000000001",
                "text": "Harga BTC naik hari ini",
                "url": "https://x.com/codeglitch/status/1850000000000000001",
                "author": { "userName": "codeglitch" },
                "likeCount": 10
            },
            { "noResults": true },
            { "id": 42, "fullText": "numeric id" }
        ]);
        let out = extract_json(&body);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].permalink.as_deref(),
            Some("https://x.com/codeglitch/status/1850000000000000001")
        );
        assert_eq!(out[0].engagement.and_then(|e| e.likes), Some(10));
        assert_eq!(out[1].id.as_deref(), Some("42"));
        assert_eq!(out[1].author, None);
    }

    #[test]
    fn unknown_shapes_yield_nothing() {
        assert!(extract_json(&json!({ "error": "rate limited" })).is_empty());
        assert!(extract_json(&json!("plain string")).is_empty());
    }
}

// src/platforms/twitter/options.rs
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;

use super::PLATFORM_TYPE;
use crate::error::ValidationError;
use crate::platforms::schema::ArgReader;
use crate::platforms::{RawPlatformArgs, SearchOptions};

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Validated Twitter search options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TwitterQueryOptions {
    pub query: Option<String>,
    pub page_size: Option<u32>,
    pub language: Option<String>,
    pub since_date: Option<NaiveDate>,
    pub until_date: Option<NaiveDate>,
    pub min_likes: Option<u32>,
    pub min_retweets: Option<u32>,
    pub min_replies: Option<u32>,
    pub from_accounts: Vec<String>,
    pub to_accounts: Vec<String>,
    pub mentioning_accounts: Vec<String>,
    pub hashtags: Vec<String>,
    pub exclude_replies: bool,
    pub only_replies: bool,
    pub exclude_retweets: bool,
    pub has_media: bool,
    pub has_images: bool,
    pub has_videos: bool,
    pub has_links: bool,
    pub is_verified: bool,
    pub since_id: Option<String>,
    pub max_id: Option<String>,
}

impl TwitterQueryOptions {
    pub fn page_size_or_default(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Argument mapper: `platformArgs`, overridden by top-level `query`/`pageSize`.
pub fn prepare_args(options: &SearchOptions) -> RawPlatformArgs {
    let mut raw = options.platform_args.clone().unwrap_or_default();
    if let Some(q) = &options.query {
        raw.insert("query".into(), Value::String(q.clone()));
    }
    if let Some(n) = options.page_size {
        raw.insert("pageSize".into(), Value::from(n));
    }
    raw
}

fn handle_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{1,15}$").unwrap())
}

fn hashtag_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^\w+$").unwrap())
}

fn language_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}$").unwrap())
}

fn read_handles(r: &mut ArgReader<'_>, key: &str) -> Vec<String> {
    let raw = r.string_list(key);
    let mut out = Vec::with_capacity(raw.len());
    for (i, h) in raw.into_iter().enumerate() {
        let h = h.trim_start_matches('@').to_string();
        if handle_re().is_match(&h) {
            out.push(h);
        } else {
            r.issue(
                format!("{key}.{i}"),
                "must be a handle of 1-15 letters, digits or underscores",
            );
        }
    }
    out
}

fn read_hashtags(r: &mut ArgReader<'_>) -> Vec<String> {
    let raw = r.string_list("hashtags");
    let mut out = Vec::with_capacity(raw.len());
    for (i, t) in raw.into_iter().enumerate() {
        let t = t.trim_start_matches('#').to_string();
        if hashtag_re().is_match(&t) {
            out.push(t);
        } else {
            r.issue(format!("hashtags.{i}"), "must contain only word characters");
        }
    }
    out
}

fn read_id(r: &mut ArgReader<'_>, key: &str) -> Option<String> {
    match r.string(key) {
        Some(s) if s.chars().all(|c| c.is_ascii_digit()) => Some(s),
        Some(_) => {
            r.issue(key, "must be a numeric tweet id");
            None
        }
        None => None,
    }
}

/// Option schema: narrow raw arguments into [`TwitterQueryOptions`].
pub fn validate(raw: &RawPlatformArgs) -> Result<TwitterQueryOptions, ValidationError> {
    let mut r = ArgReader::new(raw);

    let query = r.string("query");
    let page_size = r.count_in("pageSize", 1, MAX_PAGE_SIZE);

    let language = r.string("language").map(|l| l.to_ascii_lowercase());
    if let Some(l) = &language {
        if !language_re().is_match(l) {
            r.issue("language", "must be a 2-letter ISO 639-1 code");
        }
    }

    let since_date = r.date("sinceDate");
    let until_date = r.date("untilDate");
    if let (Some(s), Some(u)) = (since_date, until_date) {
        if s > u {
            r.issue("untilDate", "must not be earlier than sinceDate");
        }
    }

    let min_likes = r.count("minLikes");
    let min_retweets = r.count("minRetweets");
    let min_replies = r.count("minReplies");

    let from_accounts = read_handles(&mut r, "fromAccounts");
    let to_accounts = read_handles(&mut r, "toAccounts");
    let mentioning_accounts = read_handles(&mut r, "mentioningAccounts");
    let hashtags = read_hashtags(&mut r);

    let exclude_replies = r.flag("excludeReplies");
    let only_replies = r.flag("onlyReplies");
    if exclude_replies && only_replies {
        r.issue("onlyReplies", "cannot be combined with excludeReplies");
    }

    let opts = TwitterQueryOptions {
        query,
        page_size,
        language,
        since_date,
        until_date,
        min_likes,
        min_retweets,
        min_replies,
        from_accounts,
        to_accounts,
        mentioning_accounts,
        hashtags,
        exclude_replies,
        only_replies,
        exclude_retweets: r.flag("excludeRetweets"),
        has_media: r.flag("hasMedia"),
        has_images: r.flag("hasImages"),
        has_videos: r.flag("hasVideos"),
        has_links: r.flag("hasLinks"),
        is_verified: r.flag("isVerified"),
        since_id: read_id(&mut r, "sinceId"),
        max_id: read_id(&mut r, "maxId"),
    };

    let has_subject = opts.query.is_some()
        || !opts.from_accounts.is_empty()
        || !opts.to_accounts.is_empty()
        || !opts.mentioning_accounts.is_empty()
        || !opts.hashtags.is_empty();
    if !has_subject && !r.has_issues_for("query") {
        r.issue("query", "a query, an account list or hashtags is required");
    }

    r.finish(PLATFORM_TYPE)?;
    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(v: Value) -> RawPlatformArgs {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn mapper_lets_top_level_fields_win() {
        let opts = SearchOptions::new(PLATFORM_TYPE)
            .with_query("top")
            .with_page_size(10)
            .with_platform_args(json!({"query": "inner", "pageSize": 50, "minLikes": 3}));
        let args = prepare_args(&opts);
        assert_eq!(args["query"], "top");
        assert_eq!(args["pageSize"], 10);
        assert_eq!(args["minLikes"], 3);
    }

    #[test]
    fn mapper_without_platform_args() {
        let args = prepare_args(&SearchOptions::new(PLATFORM_TYPE).with_query("q"));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn full_option_set_validates() {
        let o = validate(&raw(json!({
            "query": "rust lang",
            "pageSize": 40,
            "language": "EN",
            "sinceDate": "2024-01-01",
            "untilDate": "2024-02-01",
            "minLikes": 50,
            "fromAccounts": ["@rustlang", "ferris_01"],
            "hashtags": ["#rustlang"],
            "excludeRetweets": true,
            "sinceId": "1790000000000000000",
            "somethingElse": {"ignored": true}
        })))
        .unwrap();
        assert_eq!(o.page_size, Some(40));
        assert_eq!(o.language.as_deref(), Some("en"));
        assert_eq!(o.from_accounts, vec!["rustlang", "ferris_01"]);
        assert_eq!(o.hashtags, vec!["rustlang"]);
        assert!(o.exclude_retweets);
        assert_eq!(o.since_id.as_deref(), Some("1790000000000000000"));
    }

    #[test]
    fn page_size_defaults() {
        let o = validate(&raw(json!({"query": "x"}))).unwrap();
        assert_eq!(o.page_size_or_default(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn min_likes_must_be_a_number() {
        let err = validate(&raw(json!({"query": "x", "minLikes": "not-a-number"}))).unwrap_err();
        assert!(err.mentions("minLikes"));
        assert_eq!(err.platform, PLATFORM_TYPE);
    }

    #[test]
    fn reports_all_offending_fields() {
        let err = validate(&raw(json!({
            "pageSize": 0,
            "language": "english",
            "sinceDate": "2024-03-01",
            "untilDate": "2024-01-01",
            "fromAccounts": ["this handle is way too long"],
            "hashtags": ["#no spaces"],
            "excludeReplies": true,
            "onlyReplies": true,
            "maxId": "abc"
        })))
        .unwrap_err();
        for path in [
            "pageSize",
            "language",
            "untilDate",
            "fromAccounts.0",
            "hashtags.0",
            "onlyReplies",
            "maxId",
            "query",
        ] {
            assert!(err.mentions(path), "missing issue for {path}: {err}");
        }
    }

    #[test]
    fn accounts_alone_are_enough() {
        let o = validate(&raw(json!({"fromAccounts": ["a"]}))).unwrap();
        assert!(o.query.is_none());
    }
}

// src/platforms/twitter/query.rs
use super::options::TwitterQueryOptions;

/// `a` for one term, `(a OR b)` for several, nothing for none.
fn or_group(terms: impl IntoIterator<Item = String>) -> Option<String> {
    let terms: Vec<String> = terms.into_iter().collect();
    match terms.len() {
        0 => None,
        1 => terms.into_iter().next(),
        _ => Some(format!("({})", terms.join(" OR "))),
    }
}

/// Build a Twitter advanced-search query string.
///
/// Deterministic for identical inputs. A `cursor` replaces any `since_id`
/// option, so the query only matches items strictly newer than the cursor.
pub fn build_twitter_query(options: &TwitterQueryOptions, cursor: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(q) = options.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        parts.push(q.to_string());
    }

    let groups = [
        or_group(options.from_accounts.iter().map(|a| format!("from:{a}"))),
        or_group(options.to_accounts.iter().map(|a| format!("to:{a}"))),
        or_group(options.mentioning_accounts.iter().map(|a| format!("@{a}"))),
        or_group(options.hashtags.iter().map(|t| format!("#{t}"))),
    ];
    parts.extend(groups.into_iter().flatten());

    if let Some(lang) = &options.language {
        parts.push(format!("lang:{lang}"));
    }
    if let Some(d) = options.since_date {
        parts.push(format!("since:{}", d.format("%Y-%m-%d")));
    }
    if let Some(d) = options.until_date {
        parts.push(format!("until:{}", d.format("%Y-%m-%d")));
    }
    if let Some(n) = options.min_likes {
        parts.push(format!("min_faves:{n}"));
    }
    if let Some(n) = options.min_retweets {
        parts.push(format!("min_retweets:{n}"));
    }
    if let Some(n) = options.min_replies {
        parts.push(format!("min_replies:{n}"));
    }

    if options.exclude_replies {
        parts.push("-filter:replies".into());
    } else if options.only_replies {
        parts.push("filter:replies".into());
    }
    let filters = [
        (options.exclude_retweets, "-filter:retweets"),
        (options.has_media, "filter:media"),
        (options.has_images, "filter:images"),
        (options.has_videos, "filter:native_video"),
        (options.has_links, "filter:links"),
        (options.is_verified, "filter:verified"),
    ];
    parts.extend(filters.iter().filter(|(on, _)| *on).map(|(_, f)| f.to_string()));

    let since_id = cursor
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or(options.since_id.as_deref());
    if let Some(id) = since_id {
        parts.push(format!("since_id:{id}"));
    }
    if let Some(id) = &options.max_id {
        parts.push(format!("max_id:{id}"));
    }

    parts.join(" ")
}

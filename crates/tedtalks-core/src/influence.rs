//! Speaker influence ranking.
//!
//! Influence is measured as average engagement: `(views + likes)` summed over
//! a speaker's talks, divided by the number of talks. Averaging keeps a
//! speaker with two blockbuster talks ahead of one with ten mediocre ones.

use std::collections::HashMap;

use serde::Serialize;

use crate::Talk;

/// Aggregated engagement metrics for one speaker. Recomputed fully on every
/// ranking request, never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluentialSpeaker {
    pub author: String,
    pub talk_count: u64,
    pub total_views: i64,
    pub total_likes: i64,
    pub average_engagement: f64,
}

#[derive(Default)]
struct SpeakerAccumulator {
    talk_count: u64,
    total_views: i64,
    total_likes: i64,
}

/// Rank speakers by average engagement, descending, truncated to `limit`.
///
/// Authors are grouped by exact string equality; differing whitespace or case
/// means a different speaker. Ties on average engagement break by author name
/// ascending, so the ordering is fully deterministic.
///
/// A non-positive `limit` short-circuits to an empty list; callers are
/// expected to have validated the limit and skipped the store read entirely.
#[must_use]
pub fn rank_speakers(talks: &[Talk], limit: i64) -> Vec<InfluentialSpeaker> {
    if limit <= 0 {
        return Vec::new();
    }

    let mut groups: HashMap<&str, SpeakerAccumulator> = HashMap::new();
    for talk in talks {
        let entry = groups.entry(talk.author.as_str()).or_default();
        entry.talk_count += 1;
        entry.total_views += talk.views;
        entry.total_likes += talk.likes;
    }

    let mut speakers: Vec<InfluentialSpeaker> = groups
        .into_iter()
        .map(|(author, acc)| InfluentialSpeaker {
            author: author.to_string(),
            talk_count: acc.talk_count,
            total_views: acc.total_views,
            total_likes: acc.total_likes,
            average_engagement: average_engagement(acc.total_views, acc.total_likes, acc.talk_count),
        })
        .collect();

    speakers.sort_by(|a, b| {
        b.average_engagement
            .total_cmp(&a.average_engagement)
            .then_with(|| a.author.cmp(&b.author))
    });
    speakers.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    speakers
}

/// `(total_views + total_likes) / talk_count`.
///
/// A group can never be empty by construction; the zero guard returns 0.0
/// instead of faulting anyway.
fn average_engagement(total_views: i64, total_likes: i64, talk_count: u64) -> f64 {
    if talk_count == 0 {
        return 0.0;
    }
    (total_views + total_likes) as f64 / talk_count as f64
}

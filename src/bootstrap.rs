//! Seed common destinations
//!
//! Only done when there is no default fallback yet, which means the storage is new or was never
//! bootstrapped successfully.

use crate::config::DefaultFallback;
use crate::destinations;
use crate::destinations::LookupError;
use crate::destinations::NewDestination;
use crate::destinations::create_with_aliases;
use crate::storage::Storage;

/// A destination to seed
struct Seed {
    url: &'static str,
    description: &'static str,
    aliases: &'static [&'static str],

    /// Search engine that can become the default fallback
    search_engine: Option<DefaultFallback>,
}

impl Seed {
    const fn new(
        url: &'static str,
        description: &'static str,
        aliases: &'static [&'static str],
    ) -> Self {
        Self {
            url,
            description,
            aliases,
            search_engine: None,
        }
    }

    const fn search_engine(mut self, search_engine: DefaultFallback) -> Self {
        self.search_engine = Some(search_engine);
        self
    }
}

const SEEDS: &[Seed] = &[
    Seed::new("https://duckduckgo.com/?q={}", "Search DuckDuckGo", &["d", "ddg", "duckduckgo"])
        .search_engine(DefaultFallback::DuckDuckGo),
    Seed::new("https://www.google.com/search?q={}", "Search Google", &["g", "google"])
        .search_engine(DefaultFallback::Google),
    Seed::new(
        "https://en.wikipedia.org/w/index.php?search={}",
        "Search Wikipedia",
        &["w", "wp", "wikipedia"],
    ),
    Seed::new(
        "https://www.reddit.com/r/{}",
        "Reddit - browse to specific subreddit",
        &["r", "reddit"],
    ),
    Seed::new(
        "https://www.reddit.com/search/?q={}",
        "Search Reddit",
        &["rs", "reddits", "redditsearch"],
    ),
    Seed::new("https://twitter.com/search?q={}", "Search Twitter", &["tw", "twitter"]),
    Seed::new(
        "https://twitter.com/{}",
        "Twitter - browse to specific user",
        &["twu", "twitteruser"],
    ),
    Seed::new(
        "https://facebook.com/{}",
        "Facebook - browse to specific user",
        &["fbu", "facebookuser"],
    ),
    Seed::new(
        "https://www.youtube.com/results?search_query={}",
        "Search YouTube",
        &["yt", "youtube"],
    ),
    Seed::new(
        "https://www.youtube.com/c/{}",
        "YouTube - browse to specific channel",
        &["ytc", "youtubechannel"],
    ),
    Seed::new(
        "https://time.gov/?t=24",
        "National Institute of Standards and Technology (NIST) Official Time",
        &["time"],
    ),
    Seed::new(
        "https://www.worldtimebuddy.com/{}-to-{}-converter",
        "Convert between two timezones",
        &["tzc", "converttz"],
    ),
    Seed::new(
        "https://www.nytimes.com",
        "New York Times - main page",
        &["nyt", "newyorktimes"],
    ),
    Seed::new(
        "https://www.nytimes.com/search?query={}",
        "Search New York Times",
        &["nyts", "newyorktimessearch"],
    ),
    Seed::new("https://cnn.com/", "CNN - main page", &["cnn"]),
    Seed::new("https://www.cnn.com/search?q={}", "Search CNN", &["cnns", "cnnsearch"]),
    Seed::new("https://www.foxnews.com/", "Fox News - main page", &["fox", "foxnews"]),
    Seed::new(
        "https://www.foxnews.com/search-results/search?q={}",
        "Search Fox News",
        &["foxs", "foxnewssearch"],
    ),
    Seed::new(
        "https://apnews.com/",
        "Associated Press News - main page",
        &["apn", "apnews"],
    ),
    Seed::new(
        "https://apnews.com/{}",
        "Associated Press - browse to specific topic",
        &["apnt", "apnewstopic"],
    ),
    Seed::new("https://www.npr.org/", "NPR News - main page", &["npr"]),
    Seed::new("https://www.npr.org/search?query={}", "Search NPR News", &["nprs"]),
];

/// Seed common destinations when there is no default fallback
///
/// Never fails: destinations that can not be created are logged and skipped. Returns the number
/// of destinations created.
pub async fn ensure_default_destinations<S>(storage: &S, default_fallback: DefaultFallback) -> usize
where
    S: Storage,
{
    match destinations::default_fallback(storage).await {
        Ok(destination) => {
            tracing::debug!(
                "Default fallback {} ({}) found, not bootstrapping",
                destination.id,
                destination.url
            );

            return 0;
        }
        Err(LookupError::NotFound) => {}
        Err(LookupError::Storage(err)) => {
            tracing::warn!("Could not check for a default fallback, not bootstrapping: {err}");

            return 0;
        }
    }

    tracing::info!("No default fallback found, bootstrapping destinations");

    let mut created = 0;

    for seed in SEEDS {
        let aliases = seed
            .aliases
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        let new = NewDestination {
            url: seed.url,
            description: seed.description,
            aliases: &aliases,
            is_fallback: seed.search_engine.is_some(),
            is_default_fallback: seed.search_engine == Some(default_fallback),
        };

        match create_with_aliases(storage, &new).await {
            Ok(_) => created += 1,
            Err(err) => tracing::warn!("Could not bootstrap {}: {err}", seed.url),
        }
    }

    tracing::info!("Bootstrapped {created} of {} destinations", SEEDS.len());

    created
}
